#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod feed;
mod logging;
mod pick;

use std::path::Path;

use clap::Parser;
use clawpick_config::Config;
use clawpick_core::StopSignal;
use clawpick_core::error::PickError;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, JSON_MODE};

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eyre::Report::new(PickError::Config(format!(
            "reading {}: {e}",
            path.display()
        )))
    })?;
    let cfg = toml::from_str::<Config>(&text).map_err(|e| {
        eyre::Report::new(PickError::Config(format!(
            "parsing {}: {e}",
            path.display()
        )))
    })?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(PickError::Config(e.to_string())))?;
    Ok(cfg)
}

fn install_stop_handler() -> StopSignal {
    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("interrupt received; stopping robot");
        handler_stop.raise();
    }) {
        tracing::warn!(error = %e, "could not install ctrl-c handler");
    }
    stop
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run { queue, detections } => {
            let stop = install_stop_handler();
            let summary = pick::run_pick(&cfg, &queue, detections.as_deref(), stop)
                .wrap_err("pick run failed")?;
            pick::print_summary(&summary, cli.json);
        }
        Commands::SelfCheck => {
            let reading = pick::self_check(&cfg, install_stop_handler())?;
            pick::print_self_check(reading, cli.json);
        }
        Commands::Schedule { class, gap_cm } => {
            pick::print_schedule(&cfg, &class, gap_cm, cli.json)?;
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        let code = error_fmt::exit_code_for_error(&e);
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(code);
    }
}
