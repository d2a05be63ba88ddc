use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};
use unravel_core::version::SUMMARY_SCHEMA_VERSION;
use unravel_core::{rename_file, Config, RenameOptions, RenameReport};
use unravel_util::hash::content_hash;

/// How many ranked candidates and mapping pairs to log at debug level.
const LOG_PREVIEW: usize = 40;

/// JSON summary for `unravel rename --json`.
#[derive(Serialize)]
struct RenameSummaryJson {
    ok: bool,
    schema_version: u32,
    command: &'static str,
    input: String,
    output: String,
    candidates: usize,
    mapped: usize,
    renamed: usize,
    input_hash: String,
    output_hash: String,
}

impl RenameSummaryJson {
    fn from_report(report: &RenameReport) -> Self {
        Self {
            ok: true,
            schema_version: SUMMARY_SCHEMA_VERSION,
            command: "rename",
            input: report.input.display().to_string(),
            output: report.output.display().to_string(),
            candidates: report.outcome.ranking.len(),
            mapped: report.outcome.mapping.len(),
            renamed: report.outcome.renamed,
            input_hash: report.input_hash.clone(),
            output_hash: content_hash(report.outcome.code.as_bytes()),
        }
    }
}

pub fn run(config: &Config, src: &Path, outdir: &Path, options: &RenameOptions) -> Result<()> {
    let src = config.resolve(src);
    let outdir = config.resolve(outdir);

    let report = match rename_file(&src, &outdir, options) {
        Ok(report) => report,
        Err(e) if config.json => super::fail_json("rename", &e),
        Err(e) => return Err(e).into_diagnostic(),
    };
    log_outcome(&report);

    if config.json {
        let summary = RenameSummaryJson::from_report(&report);
        println!("{}", serde_json::to_string(&summary).into_diagnostic()?);
    } else {
        println!("AST rename written: {}", report.output.display());
    }
    Ok(())
}

fn log_outcome(report: &RenameReport) {
    let outcome = &report.outcome;
    for (rank, name) in outcome.ranking.iter().take(LOG_PREVIEW).enumerate() {
        debug!(rank, name = %name, "candidate");
    }
    for (from, to) in outcome.mapping.iter().take(LOG_PREVIEW) {
        debug!(from = %from, to = %to, "mapping");
    }
    info!(
        input = %report.input.display(),
        bytes = report.source_len,
        candidates = outcome.ranking.len(),
        mapped = outcome.mapping.len(),
        renamed = outcome.renamed,
        "identifiers renamed"
    );
}
