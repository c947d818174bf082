//! Decoding track content into in-memory stereo streams.
//!
//! Uses Symphonia to probe the container, decode every packet into
//! interleaved `f32` samples and fold them down to stereo frames.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::track::{AudioFileType, ReadSeek};

use super::streamer::{BufferedStream, Frame, SampleRate, StreamSeeker};

/// Consecutive undecodable packets tolerated before giving up.
const MAX_CONSECUTIVE_DECODE_ERRORS: usize = 16;

/// Properties of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub sample_rate: SampleRate,
    /// Channel count of the source before stereo fold-down.
    pub channels: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognised audio container: {0}")]
    Probe(#[source] SymphoniaError),
    #[error("no audio track in container")]
    NoAudioTrack,
    #[error("audio track has no sample rate")]
    UnknownSampleRate,
    #[error("unsupported codec: {0}")]
    Codec(#[source] SymphoniaError),
    #[error("failed to read packet: {0}")]
    Read(#[source] SymphoniaError),
    #[error("malformed audio data: {0}")]
    Malformed(#[source] SymphoniaError),
    #[error("audio track decoded to zero frames")]
    Empty,
}

/// Turns encoded content into a seekable stream.
pub trait Decoder: Send + Sync {
    fn decode(&self, content: Box<dyn ReadSeek>) -> Result<(Box<dyn StreamSeeker>, Format), DecodeError>;
}

/// Decoders keyed by file type.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<AudioFileType, Arc<dyn Decoder>>,
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register(&mut self, file_type: AudioFileType, decoder: Arc<dyn Decoder>) {
        self.decoders.insert(file_type, decoder);
    }

    pub fn get(&self, file_type: &AudioFileType) -> Option<Arc<dyn Decoder>> {
        self.decoders.get(file_type).cloned()
    }

    pub fn supports(&self, file_type: &AudioFileType) -> bool {
        self.decoders.contains_key(file_type)
    }
}

impl Default for DecoderRegistry {
    /// MP3 only.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(AudioFileType::Mp3, Arc::new(Mp3Decoder));
        registry
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

/// Symphonia-backed MP3 decoder producing a [`BufferedStream`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp3Decoder;

impl Decoder for Mp3Decoder {
    fn decode(&self, content: Box<dyn ReadSeek>) -> Result<(Box<dyn StreamSeeker>, Format), DecodeError> {
        let (frames, format) = decode_all(content, "mp3")?;
        tracing::debug!(
            frames = frames.len(),
            rate_hz = format.sample_rate.hz(),
            channels = format.channels,
            "decoded mp3"
        );
        Ok((Box::new(BufferedStream::new(frames)), format))
    }
}

struct ContentSource(Box<dyn ReadSeek>);

impl Read for ContentSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for ContentSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl MediaSource for ContentSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}

fn decode_all(content: Box<dyn ReadSeek>, extension: &str) -> Result<(Vec<Frame>, Format), DecodeError> {
    let mss = MediaSourceStream::new(Box::new(ContentSource(content)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(DecodeError::Probe)?;

    let mut format = probed.format;
    let track = format.default_track().ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let mut frames: Vec<Frame> = Vec::new();
    let mut consecutive_errors = 0usize;
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(DecodeError::Read(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e @ SymphoniaError::DecodeError(_)) => {
                consecutive_errors += 1;
                if consecutive_errors > MAX_CONSECUTIVE_DECODE_ERRORS {
                    return Err(DecodeError::Malformed(e));
                }
                tracing::debug!(error = %e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Malformed(e)),
        };
        consecutive_errors = 0;

        let spec = *decoded.spec();
        channels = spec.channels.count();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        push_stereo(&mut frames, sample_buf.samples(), channels);
    }

    if frames.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok((
        frames,
        Format {
            sample_rate: SampleRate(rate),
            channels,
        },
    ))
}

/// Folds interleaved samples into stereo frames: mono is duplicated, channels
/// beyond the first two are dropped.
fn push_stereo(out: &mut Vec<Frame>, samples: &[f32], channels: usize) {
    match channels {
        0 => {}
        1 => out.extend(samples.iter().map(|&s| [s, s])),
        n => out.extend(samples.chunks_exact(n).map(|f| [f[0], f[1]])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn push_stereo_maps_channels() {
        let mut out = Vec::new();
        push_stereo(&mut out, &[0.1, 0.2], 1);
        assert_eq!(out, vec![[0.1, 0.1], [0.2, 0.2]]);

        out.clear();
        push_stereo(&mut out, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3);
        assert_eq!(out, vec![[0.1, 0.2], [0.4, 0.5]]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let content = Box::new(Cursor::new(b"definitely not an mp3 file".to_vec()));
        assert!(Mp3Decoder.decode(content).is_err());
    }

    #[test]
    fn default_registry_knows_mp3_only() {
        let registry = DecoderRegistry::default();
        assert!(registry.supports(&AudioFileType::Mp3));
        assert!(!registry.supports(&AudioFileType::Other("ogg".to_string())));
    }
}
