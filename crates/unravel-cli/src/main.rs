#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use unravel_core::rename::DEFAULT_MAX_CANDIDATES;
use unravel_core::{Config, InlineOptions, RenameOptions, StripPolicy};

#[derive(Parser, Debug)]
#[command(name = "unravel")]
#[command(author, version, about = "Static deobfuscation transforms for JavaScript", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit a single JSON summary object on stdout and JSON log lines on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Resolve relative paths against this directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Rename minified identifiers after name-like strings found in the file
    #[command(alias = "identifier-rename")]
    Rename {
        /// JavaScript source file
        src: PathBuf,

        /// Output directory (created if missing)
        outdir: PathBuf,

        /// Maximum number of ranked candidate names
        #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_CANDIDATES)]
        max_candidates: usize,

        /// Never rename this identifier (repeatable)
        #[arg(long = "reserve", value_name = "NAME")]
        reserve: Vec<String>,

        /// Drop candidates that are not valid, non-reserved identifiers
        #[arg(long)]
        valid_names_only: bool,
    },

    /// Inline string-lookup-table calls and remove the table and decoder
    #[command(alias = "string-table-inline")]
    Strings {
        /// JavaScript source file
        src: PathBuf,

        /// Output directory (created if missing)
        outdir: PathBuf,

        /// When to remove the table and decoder declarations
        #[arg(long, value_enum, default_value_t = StripArg::Unreferenced)]
        strip: StripArg,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StripArg {
    /// Once something was inlined and nothing else refers to them
    Unreferenced,
    /// Whenever the decoder is found
    Always,
}

impl From<StripArg> for StripPolicy {
    fn from(arg: StripArg) -> Self {
        match arg {
            StripArg::Unreferenced => StripPolicy::Unreferenced,
            StripArg::Always => StripPolicy::OnDecoderMatch,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json(cli.json);

    logging::init(config.verbosity, config.json);

    match cli.command {
        Commands::Version => commands::version::run(config.json),
        Commands::Rename {
            src,
            outdir,
            max_candidates,
            reserve,
            valid_names_only,
        } => {
            let span = tracing::info_span!("rename", cmd = "rename", cwd = %cwd.display());
            let _guard = span.enter();
            let options = RenameOptions::default()
                .with_max_candidates(max_candidates)
                .with_reserved(reserve)
                .with_valid_names_only(valid_names_only);
            commands::rename::run(&config, &src, &outdir, &options)
        }
        Commands::Strings { src, outdir, strip } => {
            let span = tracing::info_span!("strings", cmd = "strings", cwd = %cwd.display());
            let _guard = span.enter();
            let options = InlineOptions::new().with_strip(strip.into());
            commands::strings::run(&config, &src, &outdir, &options)
        }
    }
}
