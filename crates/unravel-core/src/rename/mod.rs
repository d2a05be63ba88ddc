//! Frequency-ranked identifier renaming.
//!
//! Pipeline over one parsed tree:
//!
//! 1. [`CandidateTable`]: tally name-like strings the program carries.
//! 2. [`ObfuscatedSet`]: collect minified/generated identifier names.
//! 3. [`RenameMapping`]: pair them positionally with the ranked candidates.
//! 4. [`substitute`]: rewrite every matching identifier, then re-emit.
//!
//! The result is a readability aid, not a recovery of original names.

pub mod candidates;
pub mod detect;
pub mod mapping;
pub mod names;
pub mod substitute;

pub use candidates::{CandidateTable, FrequencyRanker, NameRanker};
pub use detect::ObfuscatedSet;
pub use mapping::RenameMapping;
pub use substitute::substitute;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::syntax::SourceTree;

/// Default cap on ranked candidates.
pub const DEFAULT_MAX_CANDIDATES: usize = 500;

/// Suffix appended to the input file name for the renamed output.
pub const OUTPUT_SUFFIX: &str = ".ast_renamed.js";

/// Options for the identifier-renaming transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOptions {
    /// Maximum number of ranked candidates.
    pub max_candidates: usize,
    /// Names never treated as obfuscated (e.g. well-known globals).
    pub reserved: HashSet<String>,
    /// Drop candidates that are not valid binding names before pairing.
    pub valid_names_only: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            reserved: HashSet::new(),
            valid_names_only: false,
        }
    }
}

impl RenameOptions {
    /// Set the candidate cap.
    #[must_use]
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Add names that are never renamed.
    #[must_use]
    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    /// Keep only candidates that are valid binding names.
    #[must_use]
    pub fn with_valid_names_only(mut self, on: bool) -> Self {
        self.valid_names_only = on;
        self
    }

    fn ranker(&self) -> FrequencyRanker {
        FrequencyRanker {
            limit: self.max_candidates,
            valid_names_only: self.valid_names_only,
        }
    }
}

/// Result of renaming one source text.
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    /// Re-serialized program.
    pub code: String,
    /// Ranked candidates, best first.
    pub ranking: Vec<String>,
    /// Applied mapping.
    pub mapping: RenameMapping,
    /// Number of identifier nodes rewritten.
    pub renamed: usize,
}

/// Run the renaming transform over `source`.
///
/// Fails only when `source` does not parse.
pub fn rename_source(
    file_name: &str,
    source: &str,
    options: &RenameOptions,
) -> Result<RenameOutcome, Error> {
    rename_with(file_name, source, &options.ranker(), &options.reserved)
}

/// Run the renaming transform with a caller-supplied ranking strategy.
pub fn rename_with<R: NameRanker + ?Sized>(
    file_name: &str,
    source: &str,
    ranker: &R,
    reserved: &HashSet<String>,
) -> Result<RenameOutcome, Error> {
    let mut tree = SourceTree::parse(file_name, source)?;

    let ranking = ranker.rank(tree.program());
    let obfuscated = ObfuscatedSet::collect(tree.program(), reserved);
    let mapping = RenameMapping::build(&ranking, &obfuscated);
    let renamed = substitute(tree.program_mut(), &mapping);
    let code = tree.emit()?;

    Ok(RenameOutcome {
        code,
        ranking,
        mapping,
        renamed,
    })
}

/// Summary of a renaming run over a file.
#[derive(Debug, Clone)]
pub struct RenameReport {
    /// Input file.
    pub input: PathBuf,
    /// Written output file.
    pub output: PathBuf,
    /// Transform result.
    pub outcome: RenameOutcome,
    /// Input size in bytes.
    pub source_len: usize,
    /// BLAKE3 of the input text.
    pub input_hash: String,
}

/// Rename `src` and write `<outdir>/<basename(src)>.ast_renamed.js`.
///
/// A parse failure aborts before anything is written; the output file is
/// replaced atomically.
pub fn rename_file(src: &Path, outdir: &Path, options: &RenameOptions) -> Result<RenameReport, Error> {
    let source = crate::read_input(src)?;
    let outcome = rename_source(&crate::display_name(src), &source, options)?;

    let output = unravel_util::fs::output_path(src, outdir, OUTPUT_SUFFIX);
    crate::write_output(outdir, &output, outcome.code.as_bytes())?;

    Ok(RenameReport {
        input: src.to_path_buf(),
        output,
        source_len: source.len(),
        input_hash: unravel_util::hash::content_hash(source.as_bytes()),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_class_and_repeated_key_scenario() {
        // bar (3 key occurrences) outranks Foo (class weight 2)
        let source = "var a = 10;\n\
                      class Foo {}\n\
                      var values = [{ bar: 1 }, { bar: 2 }, { bar: 3 }];\n\
                      console.log(a + a);\n";
        let out = rename_source("s.js", source, &RenameOptions::default()).unwrap();
        assert_eq!(out.ranking, vec!["bar", "Foo"]);
        assert_eq!(out.mapping.get("a"), Some("bar"));
        assert!(out.code.contains("var bar = 10"));
        assert!(out.code.contains("console.log(bar + bar)"));
    }

    #[test]
    fn test_class_wins_over_single_key() {
        let source = "class Widget {}\nvar o = { label: 1 };\nvar a = 1;";
        let out = rename_source("s.js", source, &RenameOptions::default()).unwrap();
        assert_eq!(out.ranking, vec!["Widget", "label"]);
        // discovery order: o then a
        assert_eq!(out.mapping.get("o"), Some("Widget"));
        assert_eq!(out.mapping.get("a"), Some("label"));
    }

    #[test]
    fn test_no_candidates_leaves_names() {
        let out = rename_source("s.js", "var a = 1; a++;", &RenameOptions::default()).unwrap();
        assert!(out.mapping.is_empty());
        assert_eq!(out.renamed, 0);
        assert!(out.code.contains("var a = 1"));
    }

    #[test]
    fn test_reserved_names_are_kept() {
        let source = r#"var a = Math.floor(1); f("handler", "counter");"#;
        let options = RenameOptions::default().with_reserved(["Math"]);
        let out = rename_source("s.js", source, &options).unwrap();
        assert!(out.code.contains("Math.floor"));
        assert_eq!(out.mapping.get("a"), Some("handler"));
        assert_eq!(out.mapping.get("f"), Some("counter"));
    }

    #[test]
    fn test_max_candidates_bounds_mapping() {
        let source = r#"f("alpha", "bravo", "charlie"); var a, b, c;"#;
        let options = RenameOptions::default().with_max_candidates(1);
        let out = rename_source("s.js", source, &options).unwrap();
        assert_eq!(out.ranking, vec!["alpha"]);
        assert_eq!(out.mapping.len(), 1);
        assert_eq!(out.mapping.get("f"), Some("alpha"));
    }

    #[test]
    fn test_parse_failure_is_fatal() {
        let err = rename_source("bad.js", "function (", &RenameOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
        assert_eq!(err.code(), "PARSE_ERROR");
    }

    #[test]
    fn test_custom_ranker() {
        struct Fixed;
        impl NameRanker for Fixed {
            fn rank(&self, _program: &swc_ecma_ast::Program) -> Vec<String> {
                vec!["fixedName".to_string()]
            }
        }
        let out = rename_with("s.js", "var a = 1;", &Fixed, &HashSet::new()).unwrap();
        assert!(out.code.contains("var fixedName = 1"));
    }

    #[test]
    fn test_rename_file_writes_output() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.js");
        std::fs::write(&src, r#"var a = "message"; log(a);"#).unwrap();
        let outdir = dir.path().join("out");

        let report = rename_file(&src, &outdir, &RenameOptions::default()).unwrap();
        assert_eq!(report.output, outdir.join("app.js.ast_renamed.js"));
        let written = std::fs::read_to_string(&report.output).unwrap();
        assert_eq!(written, report.outcome.code);
        assert!(written.contains("var message = \"message\""));
    }

    #[test]
    fn test_rename_file_parse_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("bad.js");
        std::fs::write(&src, "var = ;").unwrap();
        let outdir = dir.path().join("out");

        assert!(rename_file(&src, &outdir, &RenameOptions::default()).is_err());
        assert!(!outdir.join("bad.js.ast_renamed.js").exists());
    }

    #[test]
    fn test_rename_file_missing_input() {
        let dir = tempdir().unwrap();
        let err = rename_file(
            &dir.path().join("missing.js"),
            dir.path(),
            &RenameOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "READ_FAILED");
    }
}
