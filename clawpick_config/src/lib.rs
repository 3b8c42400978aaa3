#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, pick-queue loading and schedule parsing for the pick
//! controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; absent values fall back to the tuned
//!   constants of the controller.
//! - The pick queue is a JSON array of class names written by the selection
//!   front-end.
//! - The movement schedule may come from a CSV with a strict header.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::Deserializer;

mod queue;

pub use queue::{PickQueue, QueueError, load_pick_queue};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialCfg {
    pub port: String,
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
    /// Delay after opening the device; the board resets when the port opens.
    pub open_settle_ms: u64,
    /// Pause after each command before the link is used again.
    pub command_settle_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            write_timeout_ms: 1000,
            open_settle_ms: 2000,
            command_settle_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RangingCfg {
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub response_timeout_ms: u64,
    /// Request token, sent followed by a newline.
    pub request: String,
}

impl Default for RangingCfg {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay_ms: 500,
            response_timeout_ms: 2000,
            request: "distance".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CameraCfg {
    pub frame_width: u32,
    pub frame_height: u32,
    pub open_attempts: u32,
    pub retry_delay_ms: u64,
    /// Pause between frames while aligning.
    pub frame_wait_ms: u64,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            frame_width: 1920,
            frame_height: 1080,
            open_attempts: 5,
            retry_delay_ms: 1000,
            frame_wait_ms: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectionCfg {
    pub confidence_threshold: f32,
    /// Horizontal shift of the reference line from the frame center (px).
    pub center_offset_px: f32,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            center_offset_px: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AlignmentCfg {
    pub min_pixel_distance: f32,
    pub movement_interval_ms: u64,
    pub movement_duration_ms: u64,
    pub required_ratio: f32,
}

impl Default for AlignmentCfg {
    fn default() -> Self {
        Self {
            min_pixel_distance: 8.0,
            movement_interval_ms: 100,
            movement_duration_ms: 55,
            required_ratio: 0.8,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApproachCfg {
    pub far_multiplier: f64,
    pub near_cutoff_cm: f64,
    pub mid_duration_ms: u64,
    pub near_duration_ms: u64,
    pub initial_previous_distance_cm: f64,
    pub default_distance_threshold_mm: f64,
    /// Optional step table. Accepts either:
    /// - array of tables: [{ max_cm = 2.5, duration_ms = 100 }, ...]
    /// - array of tuples: [[2.5, 100], [3.0, 150], ...]
    ///
    /// Empty means the built-in table.
    #[serde(default, deserialize_with = "de_schedule")]
    pub schedule: Vec<(f64, u64)>,
    /// CSV alternative to `schedule` (header `max_cm,duration_ms`).
    pub schedule_csv: Option<PathBuf>,
}

impl Default for ApproachCfg {
    fn default() -> Self {
        Self {
            far_multiplier: 1.3,
            near_cutoff_cm: 5.0,
            mid_duration_ms: 250,
            near_duration_ms: 150,
            initial_previous_distance_cm: 1000.0,
            default_distance_threshold_mm: 80.0,
            schedule: Vec::new(),
            schedule_csv: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepToml {
    Tuple((f64, u64)),
    Table { max_cm: f64, duration_ms: u64 },
}

fn de_schedule<'de, D>(deserializer: D) -> Result<Vec<(f64, u64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<StepToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for s in items {
            match s {
                StepToml::Tuple((cm, ms)) => out.push((cm, ms)),
                StepToml::Table {
                    max_cm,
                    duration_ms,
                } => out.push((max_cm, duration_ms)),
            }
        }
    }
    Ok(out)
}

/// One scripted actuation command. `post_wait_ms` defaults to the command
/// duration.
#[derive(Debug, Deserialize, Clone)]
pub struct ActuationStepCfg {
    pub verb: String,
    pub duration_ms: u64,
    pub post_wait_ms: Option<u64>,
}

/// Per-class overrides under `[classes.<name>]`.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClassOverride {
    pub distance_threshold_mm: Option<f64>,
    pub steps_per_alignment: Option<u32>,
    pub tier_threshold_cm: Option<f64>,
    pub adjustment_factor: Option<f64>,
    pub actuation: Option<Vec<ActuationStepCfg>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimObjectCfg {
    pub class: String,
    pub offset_px: f32,
    pub distance_mm: f32,
    #[serde(default = "default_sim_width")]
    pub width_px: f32,
}

fn default_sim_width() -> f32 {
    150.0
}

/// Simulated world used when no hardware backend is compiled in.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub objects: Vec<SimObjectCfg>,
    pub px_per_ms: f32,
    pub mm_per_ms: f32,
    pub max_range_mm: f32,
    pub camera_open_failures: u32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            px_per_ms: 0.2,
            mm_per_ms: 0.1,
            max_range_mm: 2000.0,
            camera_open_failures: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialCfg,
    pub ranging: RangingCfg,
    pub camera: CameraCfg,
    pub detection: DetectionCfg,
    pub alignment: AlignmentCfg,
    pub approach: ApproachCfg,
    /// Per-class policy overrides keyed by class name.
    pub classes: BTreeMap<String, ClassOverride>,
    pub logging: Logging,
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct ScheduleRow {
    max_cm: f64,
    duration_ms: u64,
}

/// Load a movement step table from CSV.
///
/// Expected headers:
/// max_cm,duration_ms
pub fn load_schedule_csv(path: &Path) -> eyre::Result<Vec<(f64, u64)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open schedule CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["max_cm", "duration_ms"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "schedule CSV must have headers 'max_cm,duration_ms', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ScheduleRow>().enumerate() {
        match rec {
            Ok(row) => rows.push((row.max_cm, row.duration_ms)),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    validate_schedule(&rows)?;
    Ok(rows)
}

/// Bounds must be finite, positive and strictly increasing; durations
/// non-decreasing so that the mapping stays monotonic.
pub fn validate_schedule(rows: &[(f64, u64)]) -> eyre::Result<()> {
    if rows.is_empty() {
        eyre::bail!("approach.schedule must not be empty");
    }
    for (i, (cm, ms)) in rows.iter().enumerate() {
        if !cm.is_finite() || *cm <= 0.0 {
            eyre::bail!("approach.schedule[{i}]: max_cm must be finite and > 0");
        }
        if *ms == 0 {
            eyre::bail!("approach.schedule[{i}]: duration_ms must be >= 1");
        }
    }
    for (i, pair) in rows.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        if b.0 <= a.0 {
            eyre::bail!(
                "approach.schedule bounds must be strictly increasing (entry {})",
                i + 1
            );
        }
        if b.1 < a.1 {
            eyre::bail!(
                "approach.schedule durations must be non-decreasing (entry {})",
                i + 1
            );
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            eyre::bail!("serial.baud_rate must be > 0");
        }
        if self.serial.write_timeout_ms == 0 {
            eyre::bail!("serial.write_timeout_ms must be >= 1");
        }

        // Ranging
        if self.ranging.attempts == 0 {
            eyre::bail!("ranging.attempts must be >= 1");
        }
        if self.ranging.response_timeout_ms == 0 {
            eyre::bail!("ranging.response_timeout_ms must be >= 1");
        }
        if self.ranging.request.trim().is_empty() || self.ranging.request.contains('\n') {
            eyre::bail!("ranging.request must be a single non-empty token");
        }

        // Camera
        if self.camera.open_attempts == 0 {
            eyre::bail!("camera.open_attempts must be >= 1");
        }
        if self.camera.frame_width == 0 || self.camera.frame_height == 0 {
            eyre::bail!("camera.frame_width and camera.frame_height must be > 0");
        }

        // Detection
        let conf = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&conf) {
            eyre::bail!("detection.confidence_threshold must be in [0.0, 1.0]");
        }
        if !self.detection.center_offset_px.is_finite() {
            eyre::bail!("detection.center_offset_px must be finite");
        }

        // Alignment
        if !(self.alignment.min_pixel_distance > 0.0) {
            eyre::bail!("alignment.min_pixel_distance must be > 0");
        }
        if self.alignment.movement_duration_ms == 0 {
            eyre::bail!("alignment.movement_duration_ms must be >= 1");
        }
        if !(self.alignment.required_ratio > 0.0 && self.alignment.required_ratio <= 1.0) {
            eyre::bail!("alignment.required_ratio must be in (0.0, 1.0]");
        }

        // Approach
        if !(self.approach.far_multiplier >= 1.0) {
            eyre::bail!("approach.far_multiplier must be >= 1.0");
        }
        if !(self.approach.near_cutoff_cm >= 0.0) {
            eyre::bail!("approach.near_cutoff_cm must be >= 0");
        }
        if self.approach.mid_duration_ms == 0 || self.approach.near_duration_ms == 0 {
            eyre::bail!("approach.mid_duration_ms and approach.near_duration_ms must be >= 1");
        }
        if !(self.approach.default_distance_threshold_mm > 0.0) {
            eyre::bail!("approach.default_distance_threshold_mm must be > 0");
        }
        if !self.approach.schedule.is_empty() {
            if self.approach.schedule_csv.is_some() {
                eyre::bail!("approach.schedule and approach.schedule_csv are mutually exclusive");
            }
            validate_schedule(&self.approach.schedule)?;
        }

        // Classes
        for (name, c) in &self.classes {
            if let Some(mm) = c.distance_threshold_mm
                && !(mm > 0.0)
            {
                eyre::bail!("classes.{name}.distance_threshold_mm must be > 0");
            }
            if c.steps_per_alignment == Some(0) {
                eyre::bail!("classes.{name}.steps_per_alignment must be >= 1");
            }
            if let Some(cm) = c.tier_threshold_cm
                && !(cm > 0.0)
            {
                eyre::bail!("classes.{name}.tier_threshold_cm must be > 0");
            }
            if let Some(f) = c.adjustment_factor
                && !(f > 0.0 && f.is_finite())
            {
                eyre::bail!("classes.{name}.adjustment_factor must be > 0");
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sim
        if !(self.sim.px_per_ms >= 0.0) || !(self.sim.mm_per_ms >= 0.0) {
            eyre::bail!("sim.px_per_ms and sim.mm_per_ms must be >= 0");
        }

        Ok(())
    }
}
