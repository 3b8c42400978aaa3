//! Tracing setup: console output (pretty or JSON lines) plus an optional
//! rolling JSON log file from `[logging]`.

use std::path::Path;

use clawpick_config::Logging;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::FILE_GUARD;

fn rotation_from(s: Option<&str>) -> Rotation {
    match s.map(str::to_ascii_lowercase).as_deref() {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::NEVER,
    }
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. `RUST_LOG` overrides `console_level`.
/// Logs go to stderr so stdout stays clean for summaries.
pub fn init_tracing(json: bool, console_level: &str, file_cfg: &Logging) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(console_level));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };
    let console = console.with_filter(console_filter);

    let file = file_cfg.file.as_deref().and_then(|path| {
        let path = Path::new(path);
        let name = path.file_name()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let appender =
            RollingFileAppender::new(rotation_from(file_cfg.rotation.as_deref()), dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = file_cfg.level.as_deref().unwrap_or("info");
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(level_filter(level)),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_names_map_to_policies() {
        assert_eq!(rotation_from(Some("daily")), Rotation::DAILY);
        assert_eq!(rotation_from(Some("HOURLY")), Rotation::HOURLY);
        assert_eq!(rotation_from(Some("never")), Rotation::NEVER);
        assert_eq!(rotation_from(None), Rotation::NEVER);
    }
}
