//! Audio output devices.
//!
//! A device owns a [`Mixer`] behind one coarse lock. The device's render
//! path takes only that lock; the controller takes it for every mutation of
//! the active playback, so a render never observes a half-applied change.

mod cpal_output;
mod null;

pub use cpal_output::{output_device_names, CpalOutput};
pub use null::NullOutput;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::ctrl::Ctrl;
use super::streamer::{Frame, SampleRate, SILENCE};

/// Requested device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub sample_rate: SampleRate,
    /// Preferred device buffer length in frames.
    pub buffer_frames: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("no output device matched {0:?}")]
    NoMatchingDevice(String),
    #[error("no default output device")]
    NoDefaultDevice,
    #[error("device reports no supported output configs")]
    NoSupportedConfig,
    #[error("unsupported device sample format: {0}")]
    UnsupportedSampleFormat(String),
    #[error("failed to query output devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("failed to query device configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("audio thread: {0}")]
    Thread(#[from] std::io::Error),
    #[error("audio thread exited before the stream was ready")]
    ThreadExited,
}

/// Holds the active playback and renders it into device buffers.
#[derive(Default)]
pub struct Mixer {
    ctrl: Option<Ctrl>,
}

impl Mixer {
    /// Fills `out` entirely; silence when nothing is playing.
    pub fn render(&mut self, out: &mut [Frame]) {
        match self.ctrl.as_mut() {
            Some(ctrl) => ctrl.render(out),
            None => out.fill(SILENCE),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.ctrl.is_none()
    }

    #[cfg(test)]
    pub(crate) fn ctrl(&self) -> Option<&Ctrl> {
        self.ctrl.as_ref()
    }

    pub(crate) fn ctrl_mut(&mut self) -> Option<&mut Ctrl> {
        self.ctrl.as_mut()
    }

    /// Drops the current playback, if any, then installs `ctrl`.
    pub(crate) fn replace(&mut self, ctrl: Ctrl) {
        drop(self.ctrl.take());
        self.ctrl = Some(ctrl);
    }

    pub(crate) fn take(&mut self) -> Option<Ctrl> {
        self.ctrl.take()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A sink for rendered frames.
pub trait AudioOutput: Send + Sync {
    /// Prepares the device for `config`. Re-initialising with an unchanged
    /// config is cheap. On failure the installed playback is untouched and the
    /// previous config is reopened if possible.
    fn init(&self, config: OutputConfig) -> Result<(), OutputError>;

    fn mixer(&self) -> &Arc<Mutex<Mixer>>;

    /// The device's coarse lock.
    fn lock(&self) -> MutexGuard<'_, Mixer> {
        lock_ignoring_poison(self.mixer())
    }
}

/// Starts `config`, falling back to `previous` when that fails so an installed
/// playback keeps a render path. The error for `config` is returned together
/// with whatever was restored.
pub(crate) fn start_or_restore<T>(
    config: OutputConfig,
    previous: Option<OutputConfig>,
    mut start: impl FnMut(OutputConfig) -> Result<T, OutputError>,
) -> Result<T, (OutputError, Option<T>)> {
    let err = match start(config) {
        Ok(started) => return Ok(started),
        Err(err) => err,
    };
    let restored = previous.and_then(|prev| match start(prev) {
        Ok(started) => {
            tracing::warn!(error = %err, rate_hz = prev.sample_rate.hz(), "kept previous output config");
            Some(started)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to reopen previous output config");
            None
        }
    });
    Err((err, restored))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hz: u32) -> OutputConfig {
        OutputConfig {
            sample_rate: SampleRate(hz),
            buffer_frames: 64,
        }
    }

    #[test]
    fn failed_start_reopens_previous_config() {
        let mut attempts = Vec::new();
        let res = start_or_restore(config(96_000), Some(config(44_100)), |c| {
            attempts.push(c.sample_rate.hz());
            if c.sample_rate.hz() == 96_000 {
                Err(OutputError::NoSupportedConfig)
            } else {
                Ok(c)
            }
        });
        match res {
            Err((OutputError::NoSupportedConfig, Some(restored))) => {
                assert_eq!(restored, config(44_100))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(attempts, vec![96_000, 44_100]);
    }

    #[test]
    fn failed_start_without_previous_restores_nothing() {
        let res = start_or_restore(config(48_000), None, |_| -> Result<(), _> {
            Err(OutputError::NoDefaultDevice)
        });
        assert!(matches!(res, Err((OutputError::NoDefaultDevice, None))));
    }

    #[test]
    fn successful_start_skips_fallback() {
        let mut calls = 0;
        let res = start_or_restore(config(48_000), Some(config(44_100)), |c| {
            calls += 1;
            Ok(c)
        });
        assert_eq!(res.unwrap(), config(48_000));
        assert_eq!(calls, 1);
    }
}
