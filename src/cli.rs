use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "stagezip")]
#[command(version)]
#[command(about = "Stage the payload of a ZIP archive as a plain file", long_about = None)]
#[command(after_help = "Examples:\n  \
  stagezip -l games.zip                list entries of games.zip\n  \
  stagezip games.zip -e d64 -e crt     stage the first .d64 or .crt entry\n  \
  stagezip -p games.zip readme.txt     send readme.txt to stdout")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entry to extract (default: first payload entry)
    #[arg(value_name = "ENTRY")]
    pub entry: Option<String>,

    /// List entries (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List entries verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract to pipe instead of staging
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Payload extension to accept (repeatable; default: built-in list)
    #[arg(short = 'e', value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Allowlist for payload selection, `None` for the built-in one.
    pub fn allowed_extensions(&self) -> Option<Vec<&str>> {
        if self.extensions.is_empty() {
            None
        } else {
            Some(self.extensions.iter().map(String::as_str).collect())
        }
    }

    /// Default tracing filter for the selected quiet level.
    pub fn log_filter(&self) -> &'static str {
        match self.quiet {
            0 => "warn",
            1 => "error",
            _ => "off",
        }
    }
}
