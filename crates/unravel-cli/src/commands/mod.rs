pub mod rename;
pub mod strings;
pub mod version;

use serde::Serialize;
use unravel_core::version::SUMMARY_SCHEMA_VERSION;

#[derive(Serialize)]
struct ErrorJson<'a> {
    code: &'a str,
    message: String,
}

#[derive(Serialize)]
struct FailureJson<'a> {
    ok: bool,
    schema_version: u32,
    command: &'a str,
    error: ErrorJson<'a>,
}

/// Print the `--json` failure object for `command` and exit with status 1.
pub(crate) fn fail_json(command: &str, err: &unravel_core::Error) -> ! {
    let result = FailureJson {
        ok: false,
        schema_version: SUMMARY_SCHEMA_VERSION,
        command,
        error: ErrorJson {
            code: err.code(),
            message: err.to_string(),
        },
    };
    match serde_json::to_string(&result) {
        Ok(json) => println!("{json}"),
        Err(_) => eprintln!("error: {err}"),
    }
    std::process::exit(1);
}
