use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};
use unravel_core::strings::PairSummary;
use unravel_core::version::SUMMARY_SCHEMA_VERSION;
use unravel_core::{inline_file, Config, InlineOptions, InlineReport};
use unravel_util::hash::content_hash;

/// JSON summary for `unravel strings --json`.
#[derive(Serialize)]
struct StringsSummaryJson<'a> {
    ok: bool,
    schema_version: u32,
    command: &'static str,
    input: String,
    output: String,
    mode: String,
    replacements: usize,
    skipped: usize,
    unchanged: bool,
    strip: &'static str,
    pairs: &'a [PairSummary],
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_error: Option<String>,
    input_hash: String,
    output_hash: String,
}

impl<'a> StringsSummaryJson<'a> {
    fn from_report(report: &'a InlineReport, options: &InlineOptions) -> Self {
        let outcome = &report.outcome;
        Self {
            ok: true,
            schema_version: SUMMARY_SCHEMA_VERSION,
            command: "strings",
            input: report.input.display().to_string(),
            output: report.output.display().to_string(),
            mode: outcome.mode.to_string(),
            replacements: outcome.replaced,
            skipped: outcome.skipped,
            unchanged: report.unchanged,
            strip: options.strip.as_str(),
            pairs: &outcome.pairs,
            parse_error: outcome.parse_error.as_ref().map(ToString::to_string),
            input_hash: report.input_hash.clone(),
            output_hash: content_hash(outcome.code.as_bytes()),
        }
    }
}

pub fn run(config: &Config, src: &Path, outdir: &Path, options: &InlineOptions) -> Result<()> {
    let src = config.resolve(src);
    let outdir = config.resolve(outdir);

    let report = match inline_file(&src, &outdir, options) {
        Ok(report) => report,
        Err(e) if config.json => super::fail_json("strings", &e),
        Err(e) => return Err(e).into_diagnostic(),
    };
    log_outcome(&report);

    if config.json {
        let summary = StringsSummaryJson::from_report(&report, options);
        println!("{}", serde_json::to_string(&summary).into_diagnostic()?);
    } else {
        println!(
            "De-arr output: {} replacements: {}",
            report.output.display(),
            report.outcome.replaced
        );
    }
    Ok(())
}

fn log_outcome(report: &InlineReport) {
    let outcome = &report.outcome;
    if let Some(e) = &outcome.parse_error {
        warn!(error = %e, "source did not parse, matched text patterns instead");
    }
    for pair in &outcome.pairs {
        debug!(
            table = %pair.table,
            decoder = %pair.decoder,
            offset = pair.offset,
            entries = pair.entries,
            replaced = pair.replaced,
            skipped = pair.skipped,
            decoder_stripped = pair.decoder_stripped,
            table_stripped = pair.table_stripped,
            "string table"
        );
    }
    if outcome.pairs.is_empty() {
        info!(input = %report.input.display(), "no string table found");
    } else {
        info!(
            input = %report.input.display(),
            mode = %outcome.mode,
            pairs = outcome.pairs.len(),
            replaced = outcome.replaced,
            skipped = outcome.skipped,
            "string tables inlined"
        );
    }
}
