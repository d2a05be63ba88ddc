#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Static JavaScript deobfuscation transforms.
//!
//! Two independent, single-pass rewrites over one source file:
//!
//! - [`rename`]: frequency-ranked identifier renaming over the syntax tree.
//! - [`strings`]: detection and inlining of string-lookup-table obfuscation.
//!
//! Both are best-effort readability aids. Neither verifies that the output
//! behaves like the input.

pub mod config;
pub mod error;
pub mod rename;
pub mod strings;
pub mod syntax;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use rename::{rename_file, rename_source, RenameOptions, RenameOutcome, RenameReport};
pub use strings::{
    inline_file, inline_source, DetectionMode, InlineOptions, InlineOutcome, InlineReport,
    StripPolicy,
};
pub use syntax::{SourceTree, SyntaxError};
pub use version::VERSION;

use std::path::Path;

fn read_input(src: &Path) -> Result<String, Error> {
    unravel_util::fs::read_to_string_lossy(src).map_err(|e| Error::Read {
        path: src.to_path_buf(),
        source: e,
    })
}

/// File name used in parser diagnostics.
fn display_name(src: &Path) -> String {
    src.file_name()
        .map_or_else(|| "input.js".to_string(), |n| n.to_string_lossy().into_owned())
}

/// Write a transform's output, creating `outdir` first.
fn write_output(outdir: &Path, output: &Path, bytes: &[u8]) -> Result<(), Error> {
    unravel_util::fs::ensure_dir(outdir).map_err(|e| Error::Write {
        path: outdir.to_path_buf(),
        source: e,
    })?;
    unravel_util::fs::atomic_write(output, bytes).map_err(|e| Error::Write {
        path: output.to_path_buf(),
        source: e,
    })
}
