use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use contactmerge::cli::{Cli, Commands};
use contactmerge::config::{AppConfig, ConfigError, Credentials};
use contactmerge::driver::{MergeDriver, ScreenshotSink};
use contactmerge::logger::{RunLogger, VerbosityLevel};
use contactmerge::page::ChromeTab;
use contactmerge::resolver::{self, DedupeOptions};
use contactmerge::{browser, sheet};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run contactmerge again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    init_tracing(cli.verbose);

    // Load configuration
    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(ConfigError::FileNotFound(path)) => {
            // Config not found - prompt to create if interactive
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!(
                        "✅ Created default configuration file at: {}",
                        created_path.display()
                    );
                    println!(
                        "   Edit this file to customize settings, then run contactmerge again."
                    );
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);

    match cli.command {
        Some(Commands::Merge {
            input,
            column,
            screenshot_dir,
            log_file,
        }) => {
            // Credentials may live in a .env file next to the binary
            dotenvy::dotenv().ok();
            let credentials = Credentials::from_env(&config.credentials)?;

            let column = column.unwrap_or_else(|| config.input.company_column.clone());
            let table = sheet::load_table(&input)
                .with_context(|| format!("could not load {}", input.display()))?;
            let companies = sheet::company_names(&table, &column)?;
            if companies.is_empty() {
                bail!("no company names found in column '{}'", column);
            }

            let logger = match log_file {
                Some(path) => RunLogger::with_log_file(
                    verbosity,
                    path.to_string_lossy().to_string(),
                ),
                None => RunLogger::new(verbosity),
            };

            let screenshot_dir = screenshot_dir
                .unwrap_or_else(|| config.input.screenshot_dir.clone().into());
            let sink = ScreenshotSink::new(screenshot_dir);

            let chrome = browser::create_browser()?;
            let tab = chrome
                .new_tab()
                .map_err(|e| anyhow::anyhow!("Failed to open browser tab: {}", e))?;
            let page = ChromeTab::new(tab);

            let mut driver = MergeDriver::new(page, &config, logger.clone(), Box::new(sink));
            let report = driver.run(&credentials, &companies)?;

            logger.print_final_summary();
            if let Err(e) = logger.export_logs() {
                eprintln!("⚠️  Failed to export logs: {}", e);
            }

            tracing::info!(
                attempted = report.attempted(),
                merged = report.merged(),
                failed = report.failed(),
                "run complete"
            );
            Ok(())
        }

        Some(Commands::Dedupe {
            input,
            output,
            column1,
            column2,
            column_name,
            frequency_limit,
        }) => {
            let options = DedupeOptions {
                column1: column1.unwrap_or(config.dedupe.column1_index),
                column2: column2.unwrap_or(config.dedupe.column2_index),
                column_name: column_name.unwrap_or_else(|| config.dedupe.column_name.clone()),
                frequency_limit: frequency_limit.unwrap_or(config.dedupe.frequency_limit),
                output_suffix: config.dedupe.output_suffix.clone(),
            };

            match resolver::resolve(&input, output.as_deref(), &options) {
                Ok((output_path, stats)) => {
                    resolver::print_stats(&output_path, &stats, options.frequency_limit);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ Error processing {}: {}", input.display(), e);
                    std::process::exit(1);
                }
            }
        }

        None => {
            eprintln!("No subcommand given. Try 'contactmerge merge --help' or 'contactmerge dedupe --help'.");
            std::process::exit(2);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("contactmerge={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
