//! # stagezip
//!
//! Read-only access to ZIP archives for consumers that need a plain file.
//!
//! The typical caller has a `.zip` containing a disk or cartridge image and
//! an emulator that only accepts a path. This crate opens the archive, picks
//! the payload entry by extension, and writes it to a staged temporary file.
//!
//! ## Features
//!
//! - Entry index built once per archive, in archive order
//! - Extraction into memory or into a staged file
//! - Payload selection by extension allowlist
//! - Tracked sessions with a bulk cleanup sweep for shutdown paths
//! - STORED and DEFLATE entries, ZIP64 archives
//!
//! ## Example
//!
//! ```no_run
//! use stagezip::ZipContext;
//!
//! fn main() -> stagezip::Result<()> {
//!     let ctx = ZipContext::new();
//!
//!     let session = ctx.open("games/Last Ninja.zip")?;
//!     for entry in session.list_entries()? {
//!         println!("{}", entry.name);
//!     }
//!     session.close();
//!
//!     // Or in one step, closing the archive on every path
//!     let staged = ctx.extract_payload_to_temp("games/Last Ninja.zip", Some(&[".d64"]))?;
//!     println!("{}", staged.display());
//!
//!     ctx.cleanup_all_open_sessions();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod zip;

mod context;
mod error;
mod extract;
mod paths;
mod payload;
mod registry;
mod session;

#[cfg(test)]
mod test_support;

pub use cli::Cli;
pub use context::{STAGING_DIR_NAME, ZipContext};
pub use error::{Error, Result};
pub use extract::StagingArea;
pub use paths::{
    DEFAULT_PAYLOAD_EXTENSIONS, base_name, extension, has_extension, is_archive,
    is_supported_extension, normalize_path,
};
pub use registry::SessionId;
pub use session::{ArchiveEntry, ArchiveSession};
