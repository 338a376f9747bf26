//! The producer side of the relay: a thread that runs a [`GestureSource`] as
//! fast as it delivers and publishes every capture.
//!
//! The loop checks its stop flag once per iteration, so stopping is
//! cooperative.  A source error ends the loop for good; the relay keeps
//! whatever was published last.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{error, info, warn};

use frame_relay::Relay;

use crate::gesture::{Capture, GestureSource, SourceError};

// ════════════════════════════════════════════════════════════════════════════
// FpsMeter
// ════════════════════════════════════════════════════════════════════════════

/// Capture rate from consecutive capture timestamps.
#[derive(Debug, Default)]
pub struct FpsMeter {
    last: Option<Instant>,
}

impl FpsMeter {
    /// Rate implied by the gap since the previous call; 0.0 on the first.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let fps = match self.last {
            Some(prev) => {
                let dt = now.saturating_duration_since(prev).as_secs_f32();
                if dt > 0.0 { 1.0 / dt } else { 0.0 }
            }
            None => 0.0,
        };
        self.last = Some(now);
        fps
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ProducerHandle
// ════════════════════════════════════════════════════════════════════════════

/// Owner's handle to the producer thread.  Dropping it stops the thread.
pub struct ProducerHandle {
    running: Arc<AtomicBool>,
    thread:  Option<JoinHandle<()>>,
}

impl ProducerHandle {
    /// Ask the loop to exit and wait for it.  Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("gesture producer thread panicked");
            }
        }
    }

    /// True once the loop has exited, whether stopped or failed.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn `source` on its own thread, publishing each capture to `relay`.
pub fn spawn_producer<G: GestureSource>(
    mut source: G,
    relay:      Relay<Capture>,
) -> io::Result<ProducerHandle> {
    let running = Arc::new(AtomicBool::new(true));
    let flag    = Arc::clone(&running);

    let thread = thread::Builder::new()
        .name("gesture-producer".into())
        .spawn(move || {
            info!("gesture producer started");
            let mut meter = FpsMeter::default();
            while flag.load(Ordering::Acquire) {
                match source.capture() {
                    Ok(mut capture) => {
                        capture.fps = meter.tick(Instant::now());
                        relay.publish(capture);
                    }
                    Err(SourceError::Exhausted) => {
                        info!("gesture script finished; producer stopping");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "gesture source failed; producer stopping");
                        break;
                    }
                }
            }
            flag.store(false, Ordering::Release);
            info!(published = relay.published(), "gesture producer stopped");
        })?;

    Ok(ProducerHandle { running, thread: Some(thread) })
}
