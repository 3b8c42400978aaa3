//! Human-readable error descriptions, stable exit codes and structured JSON
//! error formatting.

use clawpick_config::QueueError;
use clawpick_core::error::{BuildError, PickError};

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_LINK_OPEN: i32 = 3;
pub const EXIT_RANGING: i32 = 4;
pub const EXIT_CAMERA: i32 = 5;
pub const EXIT_QUEUE: i32 = 6;
pub const EXIT_CONFIG: i32 = 7;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingLink => {
                "What happened: No serial link was provided to the controller.\nLikely causes: The serial device failed to open or was not wired into the builder.\nHow to fix: Check [serial] port in the config and pass the link via with_link(...).".to_string()
            }
            BuildError::MissingFrames => {
                "What happened: No video source was provided to the controller.\nLikely causes: Neither the camera nor a detection feed was configured.\nHow to fix: Pass --detections <FILE|-> or build without the hardware feature to use the simulator.".to_string()
            }
            BuildError::MissingDetector => {
                "What happened: No object detector was provided to the controller.\nLikely causes: The detection feed or model failed to initialize.\nHow to fix: Make sure the detector process is running and passed via with_detector(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/clawpick.toml for a sample."
            ),
        };
    }

    if let Some(qe) = err.downcast_ref::<QueueError>() {
        return match qe {
            QueueError::Missing(path) => format!(
                "What happened: The pick queue file {} was not found.\nLikely causes: The selection front-end has not written it yet, or --queue points elsewhere.\nHow to fix: Select objects first or pass --queue <FILE>.",
                path.display()
            ),
            QueueError::Malformed { path, source } => format!(
                "What happened: The pick queue file {} is not valid JSON ({source}).\nLikely causes: The file was truncated or edited by hand.\nHow to fix: Write a JSON array of class names, e.g. [\"cup\", \"box\"].",
                path.display()
            ),
            QueueError::Io { path, source } => format!(
                "What happened: The pick queue file {} could not be read ({source}).\nLikely causes: Missing permissions.\nHow to fix: Check the file permissions and rerun.",
                path.display()
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PickError>() {
        return match pe {
            PickError::LinkOpen(detail) => format!(
                "What happened: The serial link to the microcontroller could not be opened ({detail}).\nLikely causes: Wrong device path, board unplugged, or missing permissions on the device node.\nHow to fix: Check [serial] port, replug the board, and make sure your user is in the dialout group."
            ),
            PickError::LinkClosed => {
                "What happened: The serial link is not open.\nLikely causes: The board was disconnected or reset.\nHow to fix: Replug the board and start a new run.".to_string()
            }
            PickError::RangingFailed { attempts } => format!(
                "What happened: The distance sensor gave no usable reading after {attempts} attempt(s).\nLikely causes: VL53L0X not initialized, loose I2C wiring, or the board is not answering.\nHow to fix: Check the sensor wiring, reset the board, or raise ranging.attempts / ranging.response_timeout_ms."
            ),
            PickError::CameraUnavailable { attempts } => format!(
                "What happened: The camera could not be opened after {attempts} attempt(s).\nLikely causes: Camera unplugged or held by another process.\nHow to fix: Reconnect the camera, close other users, or raise camera.open_attempts."
            ),
            PickError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/clawpick.toml for a sample."
            ),
            PickError::Cancelled => {
                "Run cancelled. The robot was stopped and the link closed.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit code for an error; cancellation counts as success.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<QueueError>().is_some() {
        return EXIT_QUEUE;
    }
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<PickError>() {
        Some(PickError::Cancelled) => 0,
        Some(PickError::LinkOpen(_) | PickError::LinkClosed) => EXIT_LINK_OPEN,
        Some(PickError::RangingFailed { .. }) => EXIT_RANGING,
        Some(PickError::CameraUnavailable { .. }) => EXIT_CAMERA,
        Some(PickError::Config(_)) => EXIT_CONFIG,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(qe) = err.downcast_ref::<QueueError>() {
        return match qe {
            QueueError::Missing(_) => "QueueMissing",
            QueueError::Malformed { .. } => "QueueMalformed",
            QueueError::Io { .. } => "QueueIo",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<PickError>() {
        Some(PickError::Hardware(_)) => "Hardware",
        Some(PickError::LinkOpen(_)) => "LinkOpen",
        Some(PickError::LinkClosed) => "LinkClosed",
        Some(PickError::RangingFailed { .. }) => "RangingFailed",
        Some(PickError::CameraUnavailable { .. }) => "CameraUnavailable",
        Some(PickError::Config(_)) => "Config",
        Some(PickError::Cancelled) => "Cancelled",
        Some(PickError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let code = exit_code_for_error(err);
    let details = match err.downcast_ref::<PickError>() {
        Some(PickError::RangingFailed { attempts } | PickError::CameraUnavailable { attempts }) => {
            Some(json!({ "attempts": attempts }))
        }
        _ => None,
    };
    let obj = match details {
        Some(d) => json!({ "reason": reason_name(err), "exit_code": code, "details": d, "message": humanize(err) }),
        None => json!({ "reason": reason_name(err), "exit_code": code, "message": humanize(err) }),
    };
    obj.to_string()
}
