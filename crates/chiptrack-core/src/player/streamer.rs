//! Pull-based stereo sample streams.

use std::time::Duration;

/// One stereo frame, `[left, right]`, samples in `-1.0..=1.0`.
pub type Frame = [f32; 2];

pub const SILENCE: Frame = [0.0, 0.0];

/// A source of frames pulled by the output device.
pub trait Streamer: Send {
    /// Fills `buf` from the front and returns the number of frames written.
    /// Writing fewer than `buf.len()` frames means the stream is exhausted.
    fn stream(&mut self, buf: &mut [Frame]) -> usize;
}

/// A streamer with a finite length and a movable read position, in frames.
pub trait StreamSeeker: Streamer {
    fn len(&self) -> u64;

    fn position(&self) -> u64;

    /// Moves the read position. Seeking exactly to `len()` moves there but
    /// reports [`SeekError::EndOfStream`]; seeking past it fails and leaves the
    /// position unchanged.
    fn seek(&mut self, position: u64) -> Result<(), SeekError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SeekError {
    #[error("seek to frame {position} reached end of stream")]
    EndOfStream { position: u64 },
    #[error("seek to frame {position} is beyond stream length {len}")]
    OutOfRange { position: u64, len: u64 },
}

/// Frames per second of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRate(pub u32);

impl SampleRate {
    pub fn hz(self) -> u32 {
        self.0
    }

    /// Playback time of `frames` frames.
    pub fn duration(self, frames: u64) -> Duration {
        if self.0 == 0 {
            return Duration::ZERO;
        }
        let nanos = frames as u128 * 1_000_000_000 / self.0 as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Number of whole frames in `duration`.
    pub fn frames(self, duration: Duration) -> u64 {
        let frames = duration.as_nanos() * self.0 as u128 / 1_000_000_000;
        frames.min(u64::MAX as u128) as u64
    }
}

/// Fully decoded audio held in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedStream {
    frames: Vec<Frame>,
    position: usize,
}

impl BufferedStream {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            position: 0,
        }
    }
}

impl Streamer for BufferedStream {
    fn stream(&mut self, buf: &mut [Frame]) -> usize {
        let remaining = &self.frames[self.position.min(self.frames.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        n
    }
}

impl StreamSeeker for BufferedStream {
    fn len(&self) -> u64 {
        self.frames.len() as u64
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        let len = self.len();
        if position > len {
            return Err(SeekError::OutOfRange { position, len });
        }
        self.position = position as usize;
        if position == len {
            return Err(SeekError::EndOfStream { position });
        }
        Ok(())
    }
}

/// Zero-length stream, used as a placeholder while a playback is re-wrapped.
pub(crate) struct EmptyStream;

impl Streamer for EmptyStream {
    fn stream(&mut self, _buf: &mut [Frame]) -> usize {
        0
    }
}

impl StreamSeeker for EmptyStream {
    fn len(&self) -> u64 {
        0
    }

    fn position(&self) -> u64 {
        0
    }

    fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        if position == 0 {
            Err(SeekError::EndOfStream { position })
        } else {
            Err(SeekError::OutOfRange { position, len: 0 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> BufferedStream {
        BufferedStream::new((0..n).map(|i| [i as f32, -(i as f32)]).collect())
    }

    #[test]
    fn stream_reads_in_order_and_reports_exhaustion() {
        let mut s = ramp(5);
        let mut buf = [SILENCE; 3];
        assert_eq!(s.stream(&mut buf), 3);
        assert_eq!(buf[2], [2.0, -2.0]);
        assert_eq!(s.stream(&mut buf), 2);
        assert_eq!(buf[0], [3.0, -3.0]);
        assert_eq!(s.stream(&mut buf), 0);
        assert_eq!(s.position(), 5);
    }

    #[test]
    fn seek_to_end_reports_end_of_stream() {
        let mut s = ramp(4);
        assert_eq!(s.seek(3), Ok(()));
        assert_eq!(s.position(), 3);
        assert_eq!(s.seek(4), Err(SeekError::EndOfStream { position: 4 }));
        assert_eq!(s.position(), 4);
        assert_eq!(
            s.seek(9),
            Err(SeekError::OutOfRange { position: 9, len: 4 })
        );
        assert_eq!(s.position(), 4);
    }

    #[test]
    fn sample_rate_conversions() {
        let rate = SampleRate(44_100);
        assert_eq!(rate.duration(44_100), Duration::from_secs(1));
        assert_eq!(rate.frames(Duration::from_millis(100)), 4_410);
        assert_eq!(SampleRate(0).duration(10), Duration::ZERO);
    }
}
