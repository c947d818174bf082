//! Per-track playback state rendered by the output device.

use super::completion::Notifier;
use super::streamer::{EmptyStream, Frame, SeekError, StreamSeeker, SILENCE};

/// The active stream, either played once or looped forever.
pub(crate) enum Playback {
    Plain(Box<dyn StreamSeeker>),
    Looping(Box<dyn StreamSeeker>),
}

impl Playback {
    fn stream(&self) -> &dyn StreamSeeker {
        match self {
            Playback::Plain(s) | Playback::Looping(s) => s.as_ref(),
        }
    }

    fn stream_mut(&mut self) -> &mut dyn StreamSeeker {
        match self {
            Playback::Plain(s) | Playback::Looping(s) => s.as_mut(),
        }
    }

    fn toggled(self) -> Self {
        match self {
            Playback::Plain(s) => Playback::Looping(s),
            Playback::Looping(s) => Playback::Plain(s),
        }
    }
}

/// Control wrapper around the active stream.
pub(crate) struct Ctrl {
    playback: Playback,
    paused: bool,
    finished: bool,
    notifier: Notifier,
}

impl Ctrl {
    pub(crate) fn new(stream: Box<dyn StreamSeeker>, notifier: Notifier) -> Self {
        Self {
            playback: Playback::Plain(stream),
            paused: false,
            finished: false,
            notifier,
        }
    }

    /// Fills `out` completely: stream frames first, silence after exhaustion
    /// or while paused. Exhausting a plain stream fires the completion once.
    pub(crate) fn render(&mut self, out: &mut [Frame]) {
        if self.paused || self.finished {
            out.fill(SILENCE);
            return;
        }
        let written = match &mut self.playback {
            Playback::Plain(s) => s.stream(out),
            Playback::Looping(s) => fill_looping(s.as_mut(), out),
        };
        if written < out.len() {
            out[written..].fill(SILENCE);
            if !self.is_looping() {
                self.finished = true;
                self.notifier.finish();
            }
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn is_looping(&self) -> bool {
        matches!(self.playback, Playback::Looping(_))
    }

    pub(crate) fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub(crate) fn toggle_loop(&mut self) {
        let playback = std::mem::replace(&mut self.playback, Playback::Plain(Box::new(EmptyStream)));
        self.playback = playback.toggled();
    }

    /// Pauses and rewinds to the first frame. A stopped track can be played
    /// again; its completion does not fire a second time.
    pub(crate) fn stop(&mut self) -> Result<(), SeekError> {
        self.paused = true;
        self.finished = false;
        ignore_end_of_stream(self.playback.stream_mut().seek(0))
    }

    /// Moves to the last frame so the next render exhausts the stream.
    pub(crate) fn skip(&mut self) -> Result<(), SeekError> {
        let stream = self.playback.stream_mut();
        let last = stream.len().saturating_sub(1);
        ignore_end_of_stream(stream.seek(last))
    }

    pub(crate) fn position(&self) -> u64 {
        self.playback.stream().position()
    }

    pub(crate) fn len(&self) -> u64 {
        self.playback.stream().len()
    }

    #[cfg(test)]
    pub(crate) fn stream_addr(&self) -> *const () {
        self.playback.stream() as *const dyn StreamSeeker as *const ()
    }
}

fn ignore_end_of_stream(res: Result<(), SeekError>) -> Result<(), SeekError> {
    match res {
        Err(SeekError::EndOfStream { .. }) => Ok(()),
        other => other,
    }
}

/// Streams into `out`, rewinding to frame 0 whenever the stream runs out.
/// Returns fewer than `out.len()` frames only when there is nothing to loop.
fn fill_looping(stream: &mut dyn StreamSeeker, out: &mut [Frame]) -> usize {
    let mut filled = 0;
    while filled < out.len() {
        let n = stream.stream(&mut out[filled..]);
        filled += n;
        if filled == out.len() {
            break;
        }
        if n == 0 && stream.position() == 0 {
            break;
        }
        if stream.seek(0).is_err() {
            break;
        }
    }
    filled
}
