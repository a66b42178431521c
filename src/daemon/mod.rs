use anyhow::Result;
use log::info;
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::pipeline::Pipeline;

// Granularity at which a sleeping daemon notices Ctrl-C.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

pub struct DaemonConfig {
    pub interval: Duration,
}

/// Run one tick now and then one per interval until Ctrl-C. The first
/// Ctrl-C stops the running tick at its next boundary; a second one exits
/// without waiting for in-flight requests.
pub fn run_daemon(pipeline: Pipeline<'_>, cfg: DaemonConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        if !r2.swap(false, Ordering::SeqCst) {
            std::process::exit(130);
        }
        info!("Stop requested; press Ctrl-C again to exit immediately");
    })?;
    let pipeline = pipeline.with_running_flag(running.clone());

    info!("Scheduled email processing every {:?}", cfg.interval);
    run_schedule(&running, cfg.interval, SLEEP_SLICE, || {
        pipeline.run_once();
    });

    info!("Shutting down...");
    Ok(())
}

/// Call `tick` immediately, then every `interval`, while `running` holds.
fn run_schedule(running: &AtomicBool, interval: Duration, slice: Duration, mut tick: impl FnMut()) {
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        tick();

        let next = started + interval;
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= next {
                break;
            }
            thread::sleep(slice.min(next - now));
        }
    }
}
