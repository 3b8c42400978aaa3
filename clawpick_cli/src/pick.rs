//! Backend assembly and the `run`, `self-check` and `schedule` commands.

use std::path::Path;
use std::sync::Arc;
#[cfg(feature = "hardware")]
use std::time::Duration;

use clawpick_config::{Config, load_pick_queue};
use clawpick_core::error::{PickError, Report, Result};
use clawpick_core::util::duration_ms;
use clawpick_core::{
    ApproachController, Backend, DistanceQuery, DistanceReading, Pacer, RunParams, RunSummary,
    SerialCommandLink, StopSignal,
};
use clawpick_traits::clock::{Clock, MonotonicClock};
use clawpick_traits::{Detector, FrameSource, SerialLink};
#[cfg(not(feature = "hardware"))]
use clawpick_core::ObjectClass;
#[cfg(not(feature = "hardware"))]
use clawpick_hardware::{RangingMode, SimObject, SimParams, SimWorld, VirtualClock};
use serde_json::json;

use crate::feed::DetectionFeed;

/// Load the queue, assemble the backend and pick everything in it.
pub fn run_pick(
    cfg: &Config,
    queue_path: &Path,
    detections: Option<&Path>,
    stop: StopSignal,
) -> Result<RunSummary> {
    let queue = load_pick_queue(queue_path)?;
    let params = RunParams::from_config(cfg)?;
    if queue.is_empty() {
        tracing::error!(path = %queue_path.display(), "no objects to pick");
        return Ok(RunSummary::default());
    }
    let backend = build_backend(cfg, detections, &stop)?;
    clawpick_core::run(backend, params, stop, &queue)
}

/// Open the link, take one distance reading and close it again.
pub fn self_check(cfg: &Config, stop: StopSignal) -> Result<DistanceReading> {
    let params = RunParams::from_config(cfg)?;
    let pacer = Pacer::new(backend_clock(), stop);
    let mut link = SerialCommandLink::new(open_link(cfg)?).with_policy(params.link, pacer.clone());
    let reading = DistanceQuery::new(&mut link, &params.ranging, &pacer).query_distance();
    if let Err(e) = link.close() {
        tracing::warn!(error = %e, "error closing serial link");
    }
    match reading? {
        DistanceReading::Error => Err(Report::new(PickError::RangingFailed {
            attempts: params.ranging.attempts,
        })),
        other => Ok(other),
    }
}

pub fn print_self_check(reading: DistanceReading, json: bool) {
    let (status, mm) = match reading {
        DistanceReading::Millimeters(mm) => ("ok", Some(mm)),
        DistanceReading::OutOfRange => ("out_of_range", None),
        DistanceReading::Error => ("error", None),
    };
    if json {
        println!("{}", json!({ "status": status, "distance_mm": mm }));
    } else {
        match mm {
            Some(mm) => println!("Self-check OK: link open, distance {mm:.0} mm"),
            None => println!("Self-check OK: link open, nothing within sensor range"),
        }
    }
}

/// Print the forward duration for `gap_cm`, or the class tiers and the
/// whole schedule when no gap is given.
pub fn print_schedule(cfg: &Config, class: &str, gap_cm: Option<f64>, json: bool) -> Result<()> {
    let params = RunParams::from_config(cfg)?;
    let profile = params.classes.profile_for(class);
    let approach = ApproachController::new(params.approach, params.ranging);
    match gap_cm {
        Some(gap) => {
            let ms = approach.movement_duration_ms(gap, &profile);
            if json {
                println!(
                    "{}",
                    json!({ "class": class, "gap_cm": gap, "duration_ms": ms })
                );
            } else {
                println!("{class}: gap {gap} cm -> forward {ms} ms");
            }
        }
        None => {
            let steps = approach.cfg().schedule.steps();
            if json {
                let rows: Vec<_> = steps
                    .iter()
                    .map(|(cm, ms)| json!({ "max_cm": cm, "duration_ms": ms }))
                    .collect();
                println!(
                    "{}",
                    json!({
                        "class": class,
                        "distance_threshold_mm": profile.distance_threshold_mm,
                        "tier_threshold_cm": profile.tier_threshold_cm,
                        "adjustment_factor": profile.adjustment_factor,
                        "steps_per_alignment": profile.steps_per_alignment,
                        "schedule": rows,
                    })
                );
            } else {
                println!(
                    "{class}: grab at {} mm, far tier above {} cm (x{}), {} step(s) per alignment",
                    profile.distance_threshold_mm,
                    profile.tier_threshold_cm * approach.cfg().far_multiplier,
                    profile.adjustment_factor,
                    profile.steps_per_alignment
                );
                for (cm, ms) in steps {
                    println!("  <= {cm:>5.1} cm  {ms:>5} ms");
                }
            }
        }
    }
    Ok(())
}

pub fn print_summary(summary: &RunSummary, json: bool) {
    if json {
        let objects: Vec<_> = summary
            .objects
            .iter()
            .map(|o| {
                json!({
                    "target": o.target,
                    "corrections": o.corrections,
                    "forward_steps": o.forward_steps,
                    "realignments": o.realignments,
                    "actuation_sent": o.actuation_sent,
                    "actuation_failed": o.actuation_failed,
                    "elapsed_ms": duration_ms(o.elapsed),
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "picked": summary.picked(),
                "elapsed_ms": duration_ms(summary.elapsed),
                "objects": objects,
            })
        );
        return;
    }
    if summary.objects.is_empty() {
        println!("Nothing picked.");
        return;
    }
    println!(
        "Picked {} object(s) in {:.1} s",
        summary.picked(),
        summary.elapsed.as_secs_f64()
    );
    for o in &summary.objects {
        println!(
            "  {}: {} correction(s), {} forward step(s), {} realignment(s), {} actuation command(s) ({} failed), {:.1} s",
            o.target,
            o.corrections,
            o.forward_steps,
            o.realignments,
            o.actuation_sent,
            o.actuation_failed,
            o.elapsed.as_secs_f64()
        );
    }
}

fn feed_pair(
    path: &Path,
    stop: &StopSignal,
) -> Result<(Box<dyn FrameSource>, Box<dyn Detector>)> {
    let feed = DetectionFeed::open_path(path, stop.clone())?;
    tracing::info!(path = %path.display(), "reading detections from feed");
    Ok((Box::new(feed.frames()), Box::new(feed.detector())))
}

#[cfg(not(feature = "hardware"))]
fn backend_clock() -> Arc<dyn Clock + Send + Sync> {
    if std::env::var("CLAWPICK_SIM_FAST").is_ok_and(|v| v == "1") {
        Arc::new(VirtualClock::new())
    } else {
        Arc::new(MonotonicClock::new())
    }
}

#[cfg(feature = "hardware")]
fn backend_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(MonotonicClock::new())
}

/// Objects placed when `[sim] objects` is empty: one of each class, spread
/// across the frame so the aligned target is always the most centered.
#[cfg(not(feature = "hardware"))]
fn default_sim_objects() -> Vec<SimObject> {
    [
        (ObjectClass::Bottle, 240.0, 420.0),
        (ObjectClass::Box, -200.0, 480.0),
        (ObjectClass::Cup, 80.0, 450.0),
        (ObjectClass::Horn, -360.0, 560.0),
        (ObjectClass::SmallBottle, 400.0, 400.0),
    ]
    .into_iter()
    .map(|(class, offset_px, distance_mm)| SimObject {
        class_id: class.id(),
        offset_px,
        distance_mm,
        width_px: 150.0,
    })
    .collect()
}

#[cfg(not(feature = "hardware"))]
fn sim_world(cfg: &Config) -> Result<SimWorld> {
    let objects = if cfg.sim.objects.is_empty() {
        default_sim_objects()
    } else {
        cfg.sim
            .objects
            .iter()
            .map(|o| {
                let class = o.class.parse::<ObjectClass>().map_err(|e| {
                    Report::new(PickError::Config(format!("sim.objects: {e}")))
                })?;
                Ok(SimObject {
                    class_id: class.id(),
                    offset_px: o.offset_px,
                    distance_mm: o.distance_mm,
                    width_px: o.width_px,
                })
            })
            .collect::<Result<Vec<_>>>()?
    };
    let ranging = match std::env::var("CLAWPICK_SIM_RANGING") {
        Ok(mode) => mode
            .parse::<RangingMode>()
            .map_err(|e| Report::new(PickError::Config(format!("CLAWPICK_SIM_RANGING: {e}"))))?,
        Err(_) => RangingMode::Normal,
    };
    let params = SimParams {
        px_per_ms: cfg.sim.px_per_ms,
        mm_per_ms: cfg.sim.mm_per_ms,
        max_range_mm: cfg.sim.max_range_mm,
        frame_width: cfg.camera.frame_width,
        frame_height: cfg.camera.frame_height,
        ranging,
        camera_open_failures: cfg.sim.camera_open_failures,
    };
    tracing::info!(objects = objects.len(), ?ranging, "using simulated robot");
    Ok(SimWorld::new(objects, params))
}

#[cfg(not(feature = "hardware"))]
fn open_link(cfg: &Config) -> Result<Box<dyn SerialLink>> {
    Ok(Box::new(sim_world(cfg)?.serial()))
}

#[cfg(not(feature = "hardware"))]
fn build_backend(cfg: &Config, detections: Option<&Path>, stop: &StopSignal) -> Result<Backend> {
    let world = sim_world(cfg)?;
    let (frames, detector) = match detections {
        Some(path) => feed_pair(path, stop)?,
        None => (
            Box::new(world.camera()) as Box<dyn FrameSource>,
            Box::new(world.detector()) as Box<dyn Detector>,
        ),
    };
    Ok(Backend {
        link: Box::new(world.serial()),
        frames,
        detector,
        clock: backend_clock(),
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_link(cfg: &Config) -> Result<Box<dyn SerialLink>> {
    let s = &cfg.serial;
    let link = clawpick_hardware::UartLink::open(
        &s.port,
        s.baud_rate,
        Duration::from_millis(s.write_timeout_ms),
        Duration::from_millis(s.open_settle_ms),
    )
    .map_err(|e| Report::new(PickError::LinkOpen(e.to_string())))?;
    Ok(Box::new(link))
}

#[cfg(all(feature = "hardware", not(target_os = "linux")))]
fn open_link(cfg: &Config) -> Result<Box<dyn SerialLink>> {
    Err(Report::new(PickError::LinkOpen(format!(
        "{}: the UART backend is only available on Linux",
        cfg.serial.port
    ))))
}

#[cfg(feature = "hardware")]
fn build_backend(cfg: &Config, detections: Option<&Path>, stop: &StopSignal) -> Result<Backend> {
    let Some(path) = detections else {
        return Err(Report::new(PickError::Config(
            "--detections is required when running on hardware".into(),
        )));
    };
    let (frames, detector) = feed_pair(path, stop)?;
    let link = open_link(cfg)?;
    Ok(Backend {
        link,
        frames,
        detector,
        clock: backend_clock(),
    })
}
