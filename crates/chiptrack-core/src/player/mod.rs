//! Playback controller.
//!
//! Holds at most one active decoded stream and exposes transport controls
//! over it. Two paths touch the stream: control calls from the caller and
//! the device's render path. The render path takes only the device lock
//! ([`AudioOutput::lock`]); control calls take the controller's bookkeeping
//! lock first and the device lock second, never the other way round.

mod completion;
mod ctrl;
mod decode;
pub mod output;
mod streamer;


pub use completion::{Completion, Done};
pub use decode::{DecodeError, Decoder, DecoderRegistry, Format, Mp3Decoder};
pub use output::{AudioOutput, CpalOutput, Mixer, NullOutput, OutputConfig, OutputError};
pub use streamer::{BufferedStream, Frame, SampleRate, SeekError, StreamSeeker, Streamer, SILENCE};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::track::{AudioFileType, Track};

use ctrl::Ctrl;
use output::lock_ignoring_poison;

/// Default device buffer: a tenth of a second.
pub const DEFAULT_BUFFER: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("no track to play")]
    NilTrack,
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(AudioFileType),
    #[error("failed to decode {title:?}: {source}")]
    Decode {
        title: String,
        #[source]
        source: DecodeError,
    },
    #[error("output device: {0}")]
    Output(#[from] OutputError),
    #[error("seek failed: {0}")]
    Seek(#[from] SeekError),
    #[error("buffer duration must be positive")]
    InvalidBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    /// Exhausted; silent until stopped, replaced or closed.
    Finished,
}

/// Point-in-time view of the controller for UIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    pub state: PlayerState,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub position: Option<Duration>,
    pub length: Option<Duration>,
    pub looping: bool,
}

struct Session {
    id: u64,
    title: String,
    artist: String,
    format: Format,
    done: Done,
}

#[derive(Default)]
struct Bookkeeping {
    session: Option<Session>,
    /// Armed by `done()` while idle; consumed by the next `play`.
    pending: Option<(completion::Notifier, Done)>,
}

pub struct PlaybackController {
    output: Arc<dyn AudioOutput>,
    decoders: DecoderRegistry,
    buffer: Duration,
    state: Mutex<Bookkeeping>,
    next_session: AtomicU64,
}

impl PlaybackController {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            decoders: DecoderRegistry::default(),
            buffer: DEFAULT_BUFFER,
            state: Mutex::new(Bookkeeping::default()),
            next_session: AtomicU64::new(1),
        }
    }

    /// Device buffer length requested on every `play`.
    pub fn with_buffer(mut self, buffer: Duration) -> Result<Self, PlayerError> {
        if buffer.is_zero() {
            return Err(PlayerError::InvalidBuffer);
        }
        self.buffer = buffer;
        Ok(self)
    }

    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, Bookkeeping> {
        lock_ignoring_poison(&self.state)
    }

    /// Decodes `track` and makes it the only active stream, playing from the start.
    ///
    /// Returns the completion handle of the new playback. Every error leaves
    /// the previous stream, if any, exactly as it was. On success the previous
    /// stream is released before the new one can render.
    pub fn play(&self, track: Option<Track>) -> Result<Done, PlayerError> {
        let track = track.ok_or(PlayerError::NilTrack)?;
        let decoder = self
            .decoders
            .get(&track.file_type)
            .ok_or_else(|| PlayerError::UnsupportedFormat(track.file_type.clone()))?;
        let Track {
            title,
            artist,
            content,
            ..
        } = track;
        let (stream, format) = decoder
            .decode(content)
            .map_err(|source| PlayerError::Decode {
                title: title.clone(),
                source,
            })?;
        let length = stream.len();

        let mut state = self.lock_state();
        let buffer_frames = format.sample_rate.frames(self.buffer).clamp(1, u32::MAX as u64) as u32;
        self.output.init(OutputConfig {
            sample_rate: format.sample_rate,
            buffer_frames,
        })?;

        let (notifier, done) = state.pending.take().unwrap_or_else(completion::channel);
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.output.lock().replace(Ctrl::new(stream, notifier));
        state.session = Some(Session {
            id,
            title: title.clone(),
            artist: artist.clone(),
            format,
            done: done.clone(),
        });

        tracing::info!(
            session = id,
            title = %title,
            artist = %artist,
            rate_hz = format.sample_rate.hz(),
            length = ?format.sample_rate.duration(length),
            "playing"
        );
        Ok(done)
    }

    /// Runs `f` on the active playback under both locks; `None` when idle.
    fn with_ctrl<R>(&self, f: impl FnOnce(&mut Ctrl, &Session) -> R) -> Option<R> {
        let state = self.lock_state();
        let session = state.session.as_ref()?;
        let mut mixer = self.output.lock();
        mixer.ctrl_mut().map(|ctrl| f(ctrl, session))
    }

    /// Toggles between playing and paused. No-op when idle.
    pub fn pause(&self) {
        self.with_ctrl(|ctrl, session| {
            ctrl.toggle_pause();
            tracing::debug!(session = session.id, paused = ctrl.is_paused(), "pause toggled");
        });
    }

    /// Pauses and rewinds to the start. No-op when idle.
    pub fn stop(&self) -> Result<(), PlayerError> {
        self.with_ctrl(|ctrl, session| {
            tracing::debug!(session = session.id, "stop");
            ctrl.stop()
        })
        .unwrap_or(Ok(()))
        .map_err(PlayerError::from)
    }

    /// Toggles looping of the active stream. No-op when idle.
    pub fn toggle_loop(&self) {
        self.with_ctrl(|ctrl, session| {
            ctrl.toggle_loop();
            tracing::debug!(session = session.id, looping = ctrl.is_looping(), "loop toggled");
        });
    }

    /// Jumps to the last frame so the stream finishes on the next render.
    /// No-op when idle.
    pub fn skip(&self) -> Result<(), PlayerError> {
        self.with_ctrl(|ctrl, session| {
            tracing::debug!(session = session.id, "skip");
            ctrl.skip()
        })
        .unwrap_or(Ok(()))
        .map_err(PlayerError::from)
    }

    /// Completion of the current playback. Called while idle, the handle
    /// belongs to the next `play`. While a track is active it belongs to that
    /// track; to wait on a replacement use the handle returned by `play`.
    pub fn done(&self) -> Done {
        let mut state = self.lock_state();
        if let Some(session) = state.session.as_ref() {
            return session.done.clone();
        }
        state
            .pending
            .get_or_insert_with(completion::channel)
            .1
            .clone()
    }

    pub fn current_position(&self) -> Option<Duration> {
        self.with_ctrl(|ctrl, session| session.format.sample_rate.duration(ctrl.position()))
    }

    pub fn total_length(&self) -> Option<Duration> {
        self.with_ctrl(|ctrl, session| session.format.sample_rate.duration(ctrl.len()))
    }

    pub fn status(&self) -> PlayerStatus {
        self.with_ctrl(|ctrl, session| {
            let rate = session.format.sample_rate;
            let state = if ctrl.is_finished() {
                PlayerState::Finished
            } else if ctrl.is_paused() {
                PlayerState::Paused
            } else {
                PlayerState::Playing
            };
            PlayerStatus {
                state,
                title: Some(session.title.clone()),
                artist: Some(session.artist.clone()),
                position: Some(rate.duration(ctrl.position())),
                length: Some(rate.duration(ctrl.len())),
                looping: ctrl.is_looping(),
            }
        })
        .unwrap_or(PlayerStatus {
            state: PlayerState::Idle,
            title: None,
            artist: None,
            position: None,
            length: None,
            looping: false,
        })
    }

    /// Releases the active stream. Waiters on an unfinished playback see
    /// [`Completion::Released`]. No-op when idle.
    pub fn close(&self) {
        let mut state = self.lock_state();
        let Some(session) = state.session.take() else {
            return;
        };
        let ctrl = self.output.lock().take();
        drop(ctrl);
        tracing::debug!(session = session.id, "closed");
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.close();
    }
}
