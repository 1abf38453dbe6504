mod classifier;
mod commands;
mod config;
mod copyright;
mod dates;
mod decoder;
mod error;
mod exiv2;
mod metadata;
mod mutation;
mod processor;
mod prompt;
mod settings;
mod walker;

use crate::classifier::AzureTagger;
use crate::commands::{CheckHandler, ClassifyHandler, FixHandler};
use crate::config::AppConfig;
use crate::copyright::CopyrightRuleEngine;
use crate::decoder::ExifDecoder;
use crate::exiv2::Exiv2;
use crate::processor::{BatchProcessor, BatchStats, FileHandler, ProgressEvent};
use crate::prompt::TerminalPrompter;
use crate::settings::Settings;
use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "photometa", version, about = "Audit and repair photo metadata")]
struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the metadata of every photo under a path
    Check {
        /// Location to look for photos under
        path: PathBuf,
    },
    /// Fix dates, copyright and document name of every photo under a path
    Fix {
        /// Location to look for photos under
        path: PathBuf,

        /// Use the date stored in the filename in case of conflict
        #[arg(short, long)]
        filename: bool,

        /// Load copyright rules from this YAML file
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Add keywords to photos that have none, using an image tagging service
    Classify {
        /// Location to look for photos under
        path: PathBuf,

        /// Load service credentials from this YAML file
        #[arg(short, long, default_value = "settings.yaml")]
        settings: PathBuf,
    },
}

fn init_logging(config: &AppConfig, verbose: u8) {
    let configured = config.log_level.parse().unwrap_or(LevelFilter::Info);
    let level = match verbose {
        0 => configured,
        1 => configured.max(LevelFilter::Debug),
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn report(event: &ProgressEvent<'_>) {
    match event {
        ProgressEvent::Scanned { root, total } => {
            info!("Processing {} files from {}", total, root.display())
        }
        ProgressEvent::Directory(dir) => info!("Working on directory {}", dir.display()),
        ProgressEvent::FileDone { path, outcome } => {
            log::debug!("{} {}", outcome.status, path.display())
        }
        ProgressEvent::Finished(stats) => info!("{}", stats),
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load_from_file(path).with_context(|| format!("Could not load {}", path.display()))
}

fn process(
    config: &AppConfig,
    decoder: &ExifDecoder,
    root: &Path,
    handler: &mut dyn FileHandler,
) -> Result<BatchStats> {
    let root = std::fs::canonicalize(root).with_context(|| format!("Cannot open {}", root.display()))?;
    let mut processor = BatchProcessor::new(decoder, config.allowed_extensions.clone());
    processor
        .run(&root, handler, &report)
        .with_context(|| format!("Batch aborted while {:?}", processor.state()))
}

fn run(command: Command, config: &AppConfig) -> Result<BatchStats> {
    match command {
        Command::Check { path } => {
            let decoder = ExifDecoder::new(config.decoder.clone());
            process(config, &decoder, &path, &mut CheckHandler)
        }
        Command::Fix { path, filename, settings } => {
            let settings = match settings {
                Some(file) => load_settings(&file)?,
                None => Settings::default(),
            };
            let decoder = ExifDecoder::new(config.decoder.clone());
            let writer = Exiv2::new(&config.exiv2_binary, config.writer_timeout());
            let mut prompter = TerminalPrompter::stdio();
            let mut handler = FixHandler::new(
                filename,
                CopyrightRuleEngine::new(settings.copyright_rules()),
                &writer,
                &mut prompter,
            );
            process(config, &decoder, &path, &mut handler)
        }
        Command::Classify { path, settings } => {
            let loaded = load_settings(&settings)?;
            let azure = loaded
                .azure
                .as_ref()
                .ok_or_else(|| anyhow!("{} has no 'azure' section", settings.display()))?;
            let tagger = AzureTagger::new(azure)?;
            let decoder = ExifDecoder::new(config.decoder.clone()).with_keywords(Box::new(Exiv2::new(
                &config.exiv2_binary,
                config.writer_timeout(),
            )));
            let writer = Exiv2::new(&config.exiv2_binary, config.writer_timeout());
            let mut handler = ClassifyHandler::new(&tagger, config.classifier.clone(), &writer);
            process(config, &decoder, &path, &mut handler)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    init_logging(&config, cli.verbose);

    log::debug!("Starting photometa");
    match run(cli.command, &config) {
        Ok(stats) if stats.failed > 0 => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
