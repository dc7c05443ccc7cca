//! Name helpers shared by the session, extractor and payload resolver.
//!
//! Entry names use `/` as separator. Extensions include their leading dot
//! and are compared ASCII case-insensitively.

use std::path::Path;

/// Extensions accepted as payloads when the caller does not supply a list.
pub const DEFAULT_PAYLOAD_EXTENSIONS: &[&str] = &[
    ".prg", ".p00", ".t64", ".tap", ".d64", ".d71", ".d81", ".x64", ".g64", ".crt", ".bin", ".rom",
];

const ARCHIVE_EXTENSION: &str = ".zip";

/// Extension of the last path segment, including the dot.
///
/// ```ignore
/// assert_eq!(extension("roms/game.D64"), Some(".D64"));
/// assert_eq!(extension("v1.2/readme"), None);
/// ```
pub fn extension(name: &str) -> Option<&str> {
    let segment = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    segment.rfind('.').map(|dot| &segment[dot..])
}

/// Whether `name` ends in `ext`. `ext` may be given with or without its dot.
pub fn has_extension(name: &str, ext: &str) -> bool {
    let Some(actual) = extension(name) else {
        return false;
    };
    let wanted = ext.strip_prefix('.').unwrap_or(ext);
    !wanted.is_empty() && actual[1..].eq_ignore_ascii_case(wanted)
}

/// Whether `name` ends in any of `extensions`.
pub fn has_any_extension<S: AsRef<str>>(name: &str, extensions: &[S]) -> bool {
    extensions.iter().any(|ext| has_extension(name, ext.as_ref()))
}

/// True iff the path names a `.zip` file. Never touches the filesystem.
pub fn is_archive(path: impl AsRef<Path>) -> bool {
    has_extension(&path.as_ref().to_string_lossy(), ARCHIVE_EXTENSION)
}

/// True iff `name` carries one of [`DEFAULT_PAYLOAD_EXTENSIONS`].
pub fn is_supported_extension(name: &str) -> bool {
    has_any_extension(name, DEFAULT_PAYLOAD_EXTENSIONS)
}

/// Rewrite `\` separators to `/` and drop leading slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Portion of an entry name after its final `/`.
pub fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Make an entry's base name safe to use as a host file name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = base_name(name)
        .chars()
        .map(|c| match c {
            '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "entry".to_string(),
        _ => cleaned,
    }
}
