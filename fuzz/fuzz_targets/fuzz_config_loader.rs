#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert into runtime settings without panicking.
    if let Ok(cfg) = clawpick_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = clawpick_core::RunParams::from_config(&cfg);
        }
    }
});
