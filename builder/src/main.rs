//! Add-on repository builder CLI entrypoint.
//!
//! Parses arguments, installs the logger, runs the library pipeline and maps
//! the outcome onto the process exit code.

use addonrepo_builder::cli::{BuildArgs, Cli, Command, VerifyArgs};
use addonrepo_builder::digest::verify_files;
use addonrepo_builder::error::{BuildError, Result};
use addonrepo_builder::output::{
    error_line, report_summary, verification_message, write_stderr_line,
};
use addonrepo_builder::pipeline::{self, BuildSummary};
use clap::Parser;
use log::LevelFilter;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let command = match cli.command {
        Some(command) => command,
        None => Command::Build(cli.build),
    };
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let exit_code = match &command {
        Command::Build(args) => {
            init_logging(args.log_level());
            run_build(args, &mut stdout, &mut stderr)
        }
        Command::Verify(args) => {
            init_logging(args.log_level());
            run_verify(args, &mut stderr)
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Log to stderr at `level` unless `RUST_LOG` says otherwise.
fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run_build(args: &BuildArgs, stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    let result = args
        .to_config()
        .map_err(BuildError::from)
        .and_then(|config| pipeline::run(&config));
    exit_code_for_build(result, args.json, stdout, stderr)
}

fn exit_code_for_build(
    result: Result<BuildSummary>,
    json: bool,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match result {
        Ok(summary) => {
            report_summary(&summary, stderr);
            if json {
                let written = serde_json::to_string_pretty(&summary)
                    .map_err(|err| err.to_string())
                    .and_then(|text| writeln!(stdout, "{text}").map_err(|err| err.to_string()));
                if let Err(err) = written {
                    write_stderr_line(stderr, format!("error: failed to write summary: {err}"));
                    return 1;
                }
            }
            0
        }
        Err(err) => {
            write_stderr_line(stderr, error_line(&err));
            1
        }
    }
}

fn run_verify(args: &VerifyArgs, stderr: &mut dyn Write) -> i32 {
    let config = match args.source.load_config() {
        Ok(config) => config,
        Err(err) => {
            write_stderr_line(stderr, error_line(&BuildError::from(err)));
            return 1;
        }
    };
    let index_path = config.index_path();
    match verify_files(&index_path, &config.digest_path(), config.digest) {
        Ok(verification) if verification.matches() => {
            if !args.quiet {
                write_stderr_line(stderr, verification_message(&verification, &index_path));
            }
            0
        }
        Ok(verification) => {
            write_stderr_line(stderr, verification_message(&verification, &index_path));
            1
        }
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
