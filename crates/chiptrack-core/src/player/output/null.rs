//! Headless output: renders and discards frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{lock_ignoring_poison, start_or_restore, AudioOutput, Mixer, OutputConfig, OutputError};
use crate::player::streamer::{Frame, SILENCE};

struct Clock {
    config: OutputConfig,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Clock {
    fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

/// Output device without hardware.
///
/// [`NullOutput::paced`] pulls one buffer per buffer period on a background
/// thread, so playback advances in real time (`--no-audio`). [`NullOutput::manual`]
/// renders only when [`NullOutput::render_once`] is called.
pub struct NullOutput {
    mixer: Arc<Mutex<Mixer>>,
    paced: bool,
    config: Mutex<Option<OutputConfig>>,
    clock: Mutex<Option<Clock>>,
}

impl NullOutput {
    pub fn paced() -> Self {
        Self::with_pacing(true)
    }

    pub fn manual() -> Self {
        Self::with_pacing(false)
    }

    fn with_pacing(paced: bool) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::default())),
            paced,
            config: Mutex::new(None),
            clock: Mutex::new(None),
        }
    }

    /// Config from the most recent successful `init`.
    pub fn config(&self) -> Option<OutputConfig> {
        *lock_ignoring_poison(&self.config)
    }

    /// Renders `frames` frames under the device lock and returns them.
    pub fn render_once(&self, frames: usize) -> Vec<Frame> {
        let mut buf = vec![SILENCE; frames];
        self.lock().render(&mut buf);
        buf
    }

    fn restart_clock(&self, config: OutputConfig) -> Result<(), OutputError> {
        let mut clock = lock_ignoring_poison(&self.clock);
        if clock.as_ref().is_some_and(|c| c.config == config) {
            return Ok(());
        }
        let previous = clock.take().map(|old| {
            let config = old.config;
            old.stop();
            config
        });

        match start_or_restore(config, previous, |c| self.start_clock(c)) {
            Ok(started) => {
                *clock = Some(started);
                Ok(())
            }
            Err((err, restored)) => {
                *clock = restored;
                Err(err)
            }
        }
    }

    fn start_clock(&self, config: OutputConfig) -> Result<Clock, OutputError> {
        let frames = config.buffer_frames.max(1) as usize;
        let period = config.sample_rate.duration(frames as u64).max(Duration::from_millis(1));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let mixer = Arc::clone(&self.mixer);
        let handle = thread::Builder::new()
            .name("chiptrack-null-audio".to_string())
            .spawn(move || {
                let mut buf = vec![SILENCE; frames];
                while !stop_flag.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    lock_ignoring_poison(&mixer).render(&mut buf);
                }
            })?;
        Ok(Clock {
            config,
            stop,
            handle,
        })
    }
}

impl AudioOutput for NullOutput {
    fn init(&self, config: OutputConfig) -> Result<(), OutputError> {
        if self.paced {
            self.restart_clock(config)?;
        }
        *lock_ignoring_poison(&self.config) = Some(config);
        Ok(())
    }

    fn mixer(&self) -> &Arc<Mutex<Mixer>> {
        &self.mixer
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        if let Some(clock) = lock_ignoring_poison(&self.clock).take() {
            clock.stop();
        }
    }
}
