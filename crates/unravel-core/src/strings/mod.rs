//! String-lookup-table inlining.
//!
//! Obfuscators hoist string constants into one array and replace each use
//! with a call to a small decoder, `dec(0x1)` standing for `table[1 - OFF]`.
//! This module finds every such table/decoder pair, replaces each resolvable
//! call with the string literal it denotes, and removes the declarations
//! once nothing refers to them any more.
//!
//! Detection runs on the syntax tree. When the source does not parse, a
//! text-pattern fallback handles the first pair. Edits are spliced into the
//! original text, so untouched code keeps its exact formatting.

mod inline;
pub mod model;
mod text;
mod tree;

pub use inline::PairSummary;
pub use model::{Binding, CallSite, Decoder, Detection, Reference, StringTable};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::syntax::{SourceTree, SyntaxError};

/// Suffix appended to the input file name for the inlined output.
pub const OUTPUT_SUFFIX: &str = ".dearr.js";

const BOM: char = '\u{feff}';

/// When to remove a table and its decoder after inlining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripPolicy {
    /// Only once at least one call was inlined and no reference remains.
    #[default]
    Unreferenced,
    /// As soon as the decoder was located, even with nothing inlined.
    OnDecoderMatch,
}

impl StripPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unreferenced => "unreferenced",
            Self::OnDecoderMatch => "on_decoder_match",
        }
    }
}

/// Options for the string-table transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineOptions {
    pub strip: StripPolicy,
}

impl InlineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strip(mut self, strip: StripPolicy) -> Self {
        self.strip = strip;
        self
    }
}

/// How the pairs were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Matched on the parsed syntax tree.
    Tree,
    /// Matched on raw text after a parse failure.
    Text,
    /// No table/decoder pair found.
    None,
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tree => "tree",
            Self::Text => "text",
            Self::None => "none",
        })
    }
}

/// Result of the string-table transform over one source text.
#[derive(Debug, Clone)]
pub struct InlineOutcome {
    /// Rewritten source; equal to the input when nothing was found.
    pub code: String,
    /// Call sites replaced by a literal, over all pairs.
    pub replaced: usize,
    /// Call sites left as-is because the index was out of range.
    pub skipped: usize,
    pub pairs: Vec<PairSummary>,
    pub mode: DetectionMode,
    /// Why the tree path was not used, if it was not.
    pub parse_error: Option<SyntaxError>,
}

impl InlineOutcome {
    /// Whether any declaration was removed.
    #[must_use]
    pub fn stripped(&self) -> bool {
        self.pairs
            .iter()
            .any(|p| p.decoder_stripped || p.table_stripped)
    }
}

/// Run the string-table transform over `source`.
///
/// Never fails: a source that matches nothing, or does not parse and
/// matches nothing textually, comes back unchanged.
#[must_use]
pub fn inline_source(file_name: &str, source: &str, options: &InlineOptions) -> InlineOutcome {
    let (bom, body) = match source.strip_prefix(BOM) {
        Some(body) => (&source[..BOM.len_utf8()], body),
        None => ("", source),
    };

    let (detection, parse_error) = match SourceTree::parse(file_name, body) {
        Ok(mut tree) => {
            tree.resolve_bindings();
            (tree::detect(&tree), None)
        }
        Err(e) => (text::detect(body), Some(e)),
    };

    let mode = match (&parse_error, detection.is_empty()) {
        (_, true) => DetectionMode::None,
        (None, false) => DetectionMode::Tree,
        (Some(_), false) => DetectionMode::Text,
    };

    let plan = inline::plan(body, &detection, options.strip);
    let replaced = plan.replaced();
    let skipped = plan.skipped();
    let code = if plan.edits.is_empty() {
        source.to_string()
    } else {
        let mut code = String::from(bom);
        code.push_str(&inline::apply(body, plan.edits));
        code
    };

    InlineOutcome {
        code,
        replaced,
        skipped,
        pairs: plan.pairs,
        mode,
        parse_error,
    }
}

/// Summary of a string-table run over a file.
#[derive(Debug, Clone)]
pub struct InlineReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: InlineOutcome,
    /// BLAKE3 of the input text.
    pub input_hash: String,
    /// Whether the written output is byte-identical to the input.
    pub unchanged: bool,
}

/// Inline `src` and write `<outdir>/<basename(src)>.dearr.js`.
pub fn inline_file(src: &Path, outdir: &Path, options: &InlineOptions) -> Result<InlineReport, Error> {
    let source = crate::read_input(src)?;
    let outcome = inline_source(&crate::display_name(src), &source, options);

    let output = unravel_util::fs::output_path(src, outdir, OUTPUT_SUFFIX);
    crate::write_output(outdir, &output, outcome.code.as_bytes())?;

    Ok(InlineReport {
        input: src.to_path_buf(),
        output,
        input_hash: unravel_util::hash::content_hash(source.as_bytes()),
        unchanged: unravel_util::hash::same_content(source.as_bytes(), outcome.code.as_bytes()),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SCENARIO: &str = "var _0x1a2b=['foo','bar','baz']; function _0x3c4d(a){return _0x1a2b[a-0x0];} console.log(_0x3c4d(0x1));";

    fn run(source: &str) -> InlineOutcome {
        inline_source("t.js", source, &InlineOptions::default())
    }

    #[test]
    fn test_single_call_is_inlined_and_declarations_removed() {
        let out = run(SCENARIO);
        assert_eq!(out.code, "console.log(\"bar\");");
        assert_eq!(out.replaced, 1);
        assert_eq!(out.mode, DetectionMode::Tree);
        assert!(out.stripped());
    }

    #[test]
    fn test_two_calls() {
        let out = run("var _0x1a2b=['foo','bar','baz']; function _0x3c4d(a){return _0x1a2b[a-0x0];} f(_0x3c4d(0x0), _0x3c4d(0x2));");
        assert_eq!(out.code, "f(\"foo\", \"baz\");");
        assert_eq!(out.replaced, 2);
    }

    #[test]
    fn test_out_of_range_call_is_left_alone() {
        let source = "var _0x1a2b=['foo','bar','baz']; function _0x3c4d(a){return _0x1a2b[a-0x0];} f(_0x3c4d(0x1), _0x3c4d(0x9));";
        let out = run(source);
        assert_eq!(out.replaced, 1);
        assert_eq!(out.skipped, 1);
        assert!(out.code.contains("f(\"bar\", _0x3c4d(0x9));"));
        // the decoder is still used, so both declarations stay
        assert!(out.code.starts_with("var _0x1a2b=['foo','bar','baz']; function _0x3c4d"));
        assert!(!out.stripped());
    }

    #[test]
    fn test_out_of_range_stripped_under_decoder_match() {
        let source = "var t=['foo']; function d(a){return t[a-0x0];} f(d(0x9));";
        let options = InlineOptions::new().with_strip(StripPolicy::OnDecoderMatch);
        let out = inline_source("t.js", source, &options);
        assert_eq!(out.replaced, 0);
        assert_eq!(out.code, "f(d(0x9));");
    }

    #[test]
    fn test_nothing_found_is_exact_passthrough() {
        let source = "// header\r\nvar list = [1, 2];\n\n  console.log( list );\n";
        let out = run(source);
        assert_eq!(out.code, source);
        assert_eq!(out.replaced, 0);
        assert_eq!(out.mode, DetectionMode::None);
    }

    #[test]
    fn test_table_without_decoder_is_untouched() {
        let source = "var t = ['a', 'b'];\nuse(t[0]);\n";
        let out = run(source);
        assert_eq!(out.code, source);
        assert_eq!(out.mode, DetectionMode::None);
    }

    #[test]
    fn test_second_run_replaces_nothing() {
        let first = run(SCENARIO);
        let second = run(&first.code);
        assert_eq!(second.replaced, 0);
        assert_eq!(second.code, first.code);
    }

    #[test]
    fn test_inserted_literal_matches_table_entry() {
        let source = "var t = ['it\\'s', 'tab\\there', '\\u00e9'];\n\
                      var d = function (i) { return t[i - 0x10]; };\n\
                      x = [d(0x10), d(17), d(0x12)];\n";
        let out = run(source);
        assert_eq!(out.replaced, 3);
        assert_eq!(out.code, "x = [\"it's\", \"tab\\there\", \"é\"];\n");
    }

    #[test]
    fn test_every_pair_is_handled() {
        let source = "const a = ['x'];\n\
                      const b = ['y'];\n\
                      const da = (n) => a[n - 1];\n\
                      function db(n) { return b[n - 2]; }\n\
                      out(da(1) + db(2));\n";
        let out = run(source);
        assert_eq!(out.pairs.len(), 2);
        assert_eq!(out.replaced, 2);
        assert_eq!(out.code, "out(\"x\" + \"y\");\n");
    }

    #[test]
    fn test_same_decoder_name_in_two_functions() {
        let source = "function w1(){ var t1=['a']; function d(i){return t1[i-0];} return d(0); }\n\
                      function w2(){ var t2=['b']; function d(i){return t2[i-0];} return d(0); }\n";
        let out = run(source);
        assert_eq!(out.pairs.len(), 2);
        assert_eq!(out.replaced, 2);
        assert!(out.pairs.iter().all(|p| p.replaced == 1));
        assert_eq!(
            out.code,
            "function w1(){ return \"a\"; }\nfunction w2(){ return \"b\"; }\n"
        );
    }

    #[test]
    fn test_same_table_name_in_two_scopes() {
        let source = "(function(){ var t=['a','b']; function d(i){return t[i-0];} log(d(1)); })();\n\
                      (function(){ var t=['x','y']; function e(i){return t[i-0];} log(e(1)); })();\n";
        let out = run(source);
        assert_eq!(out.replaced, 2);
        assert_eq!(
            out.code,
            "(function(){ log(\"b\"); })();\n(function(){ log(\"y\"); })();\n"
        );
    }

    #[test]
    fn test_shadowing_parameter_is_left_alone() {
        let source = "var t = ['v'];\nfunction d(i) { return t[i - 0]; }\nfunction run(d) { return d(0); }\nsay(d(0));\n";
        let out = run(source);
        assert_eq!(out.replaced, 1);
        assert_eq!(
            out.code,
            "function run(d) { return d(0); }\nsay(\"v\");\n"
        );
    }

    #[test]
    fn test_formatting_and_comments_are_kept() {
        let source = "/* keep */\nvar t = ['v'];\nfunction d(i) {\n  return t[i - 0];\n}\n\nif (ok)  {\n    say( d(0) ); // note\n}\n";
        let out = run(source);
        assert_eq!(
            out.code,
            "/* keep */\n\nif (ok)  {\n    say( \"v\" ); // note\n}\n"
        );
    }

    #[test]
    fn test_other_table_reference_keeps_table() {
        let source = "var t = ['v'];\nfunction d(i) { return t[i - 0]; }\nsay(d(0), t.length);\n";
        let out = run(source);
        assert_eq!(out.code, "var t = ['v'];\nsay(\"v\", t.length);\n");
        assert!(out.pairs[0].decoder_stripped);
        assert!(!out.pairs[0].table_stripped);
    }

    #[test]
    fn test_byte_order_mark_is_kept() {
        let source = format!("{BOM}{SCENARIO}");
        let out = run(&source);
        assert_eq!(out.code, format!("{BOM}console.log(\"bar\");"));
    }

    #[test]
    fn test_text_fallback_on_parse_failure() {
        let source = "var t=['foo','bar'];\nfunction d(a){return t[a-1];}\nsay(d(2)) <<<< broken\n";
        let out = run(source);
        assert_eq!(out.mode, DetectionMode::Text);
        assert!(out.parse_error.is_some());
        assert_eq!(out.replaced, 1);
        assert_eq!(out.code, "say(\"bar\") <<<< broken\n");
    }

    #[test]
    fn test_unparsable_without_pattern_is_passthrough() {
        let source = "function ( {";
        let out = run(source);
        assert_eq!(out.code, source);
        assert_eq!(out.mode, DetectionMode::None);
        assert!(out.parse_error.is_some());
    }

    #[test]
    fn test_inline_file_writes_output() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("bundle.min.js");
        std::fs::write(&src, SCENARIO).unwrap();
        let outdir = dir.path().join("out");

        let report = inline_file(&src, &outdir, &InlineOptions::default()).unwrap();

        assert_eq!(report.output, outdir.join("bundle.min.js.dearr.js"));
        assert_eq!(
            std::fs::read_to_string(&report.output).unwrap(),
            "console.log(\"bar\");"
        );
        assert_eq!(report.outcome.replaced, 1);
        assert!(!report.unchanged);
    }

    #[test]
    fn test_inline_file_reports_unchanged_passthrough() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("plain.js");
        std::fs::write(&src, "let x = 1;\n").unwrap();

        let report = inline_file(&src, dir.path(), &InlineOptions::default()).unwrap();
        assert!(report.unchanged);
        assert_eq!(report.outcome.replaced, 0);
    }

    #[test]
    fn test_inline_file_missing_input() {
        let dir = tempdir().unwrap();
        let err = inline_file(&dir.path().join("nope.js"), dir.path(), &InlineOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "READ_FAILED");
    }

    #[test]
    fn test_strip_policy_names() {
        assert_eq!(StripPolicy::default(), StripPolicy::Unreferenced);
        assert_eq!(StripPolicy::OnDecoderMatch.as_str(), "on_decoder_match");
        assert_eq!(
            serde_json::to_string(&StripPolicy::Unreferenced).unwrap(),
            "\"unreferenced\""
        );
    }
}
