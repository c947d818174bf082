//! Downloaded tracks and their classification.

mod fetcher;

pub use fetcher::{TrackError, TrackFetcher};

use std::fmt;
use std::io::{Cursor, Read, Seek};

/// Seekable byte source a decoder can consume from another thread.
pub trait ReadSeek: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> ReadSeek for T {}

/// Container format of a track, derived from the URL extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AudioFileType {
    Mp3,
    /// Anything else, keyed by lowercase extension (empty when unknown).
    Other(String),
}

impl AudioFileType {
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => AudioFileType::Mp3,
            _ => AudioFileType::Other(ext),
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" => Some(AudioFileType::Mp3),
            _ => None,
        }
    }

    /// Classifies by the extension of the URL's last path segment, falling
    /// back to `content_type` when the path has no recognised extension.
    pub fn classify(url: &str, content_type: Option<&str>) -> Self {
        let from_path = url_extension(url).map(|ext| Self::from_extension(&ext));
        match from_path {
            Some(AudioFileType::Mp3) => AudioFileType::Mp3,
            other => content_type
                .and_then(Self::from_content_type)
                .or(other)
                .unwrap_or_else(|| AudioFileType::Other(String::new())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AudioFileType::Mp3 => "mp3",
            AudioFileType::Other(ext) => ext,
        }
    }
}

impl fmt::Display for AudioFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFileType::Other(ext) if ext.is_empty() => f.write_str("unknown"),
            other => f.write_str(other.as_str()),
        }
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

fn url_extension(url: &str) -> Option<String> {
    let name = last_path_segment(url)?;
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_string())
}

/// Title and artist as supplied by a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
}

impl TrackMetadata {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Title from the URL's file stem, unknown artist.
    pub fn from_url(url: &str) -> Self {
        let title = last_path_segment(url)
            .map(|name| match name.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem.to_string(),
                _ => name,
            })
            .unwrap_or_else(|| url.to_string());
        Self {
            title,
            artist: String::new(),
        }
    }
}

/// A playable track: metadata plus its full encoded content.
pub struct Track {
    pub title: String,
    pub artist: String,
    pub file_type: AudioFileType,
    pub content: Box<dyn ReadSeek>,
}

impl Track {
    pub fn from_bytes(metadata: TrackMetadata, file_type: AudioFileType, bytes: Vec<u8>) -> Self {
        Self {
            title: metadata.title,
            artist: metadata.artist,
            file_type,
            content: Box::new(Cursor::new(bytes)),
        }
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("title", &self.title)
            .field("artist", &self.artist)
            .field("file_type", &self.file_type)
            .finish_non_exhaustive()
    }
}
