// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use dexview_api::Client;
use dexview_app::{CatalogSession, SessionOptions};
use logging::LogTarget;
use runtime::DumpRequest;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `dexview --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let client = Client::new(
        config.listing_url(),
        config.listing_limit(),
        config.timeout()?,
    )
    .with_context(|| {
        format!(
            "invalid [api] config in {}; fix listing_url/listing_limit/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    let headless = options.dump.is_some();
    if headless {
        logging::init(config.log_level(), LogTarget::Stderr)?;
    } else {
        let log_path = config.log_path()?;
        logging::init(config.log_level(), LogTarget::File(&log_path))?;
    }
    info!(
        listing_url = config.listing_url(),
        workers = config.hydration_workers(),
        "starting dexview"
    );

    let mut session = CatalogSession::new(
        Arc::new(client),
        SessionOptions {
            hydration_workers: config.hydration_workers(),
            ..SessionOptions::default()
        },
    );

    match options.dump {
        Some(request) => {
            let stall_limit = config.timeout()? + runtime::STALL_GRACE;
            let text = runtime::dump(&mut session, &request, stall_limit)?;
            session.dispose();
            print!("{text}");
            Ok(())
        }
        None => dexview_tui::run_app(&mut session),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    /// Set when the catalog should be printed instead of browsed.
    dump: Option<DumpRequest>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        dump: None,
    };
    let mut dump_requested = false;
    let mut request = DumpRequest::default();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--dump" => {
                dump_requested = true;
            }
            "--query" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--query requires search text"))?;
                request.query = Some(value.as_ref().to_owned());
            }
            "--category" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--category requires a category name"))?;
                request.category = Some(value.as_ref().to_owned());
            }
            "--page" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--page requires a page number"))?;
                let page = value
                    .as_ref()
                    .parse::<usize>()
                    .ok()
                    .filter(|page| *page > 0)
                    .ok_or_else(|| {
                        anyhow!(
                            "--page expects a positive number, got {:?}",
                            value.as_ref()
                        )
                    })?;
                request.page = Some(page);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if dump_requested {
        options.dump = Some(request);
    } else if request != DumpRequest::default() {
        return Err(anyhow!(
            "--query, --category, and --page only apply with --dump"
        ));
    }

    Ok(options)
}

fn print_help() {
    println!("dexview");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and client setup");
    println!("  --dump                   Load everything and print one page as text");
    println!("  --query <text>           Search filter for --dump");
    println!("  --category <name>        Category filter for --dump");
    println!("  --page <n>               Page to print with --dump (starts at 1)");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use crate::runtime::DumpRequest;
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/dexview-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                dump: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--dump", "--query"], default_options_path())
            .expect_err("missing query value should fail");
        assert!(error.to_string().contains("--query requires"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        assert!(options.dump.is_none());
        Ok(())
    }

    #[test]
    fn parse_cli_args_collects_dump_filters() -> Result<()> {
        let options = parse_cli_args(
            vec!["--dump", "--query", "saur", "--category", "grass", "--page", "2"],
            default_options_path(),
        )?;
        assert_eq!(
            options.dump,
            Some(DumpRequest {
                query: Some("saur".to_owned()),
                category: Some("grass".to_owned()),
                page: Some(2),
            })
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_bad_page_and_filters_without_dump() {
        let error = parse_cli_args(vec!["--dump", "--page", "0"], default_options_path())
            .expect_err("page zero should fail");
        assert!(error.to_string().contains("positive number"));

        let error = parse_cli_args(vec!["--query", "saur"], default_options_path())
            .expect_err("filters need --dump");
        assert!(error.to_string().contains("only apply with --dump"));
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
