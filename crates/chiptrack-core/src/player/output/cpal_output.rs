//! Real output device via CPAL.
//!
//! A `cpal::Stream` is not `Send`, so each stream lives on its own audio
//! thread that builds it, reports readiness, and parks until told to stop.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{lock_ignoring_poison, start_or_restore, AudioOutput, Mixer, OutputConfig, OutputError};
use crate::player::streamer::{Frame, SILENCE};

/// Largest fixed buffer requested from a device, in frames.
const MAX_BUFFER_FRAMES: u32 = 16_384;

struct StreamThread {
    config: OutputConfig,
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl StreamThread {
    fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            tracing::warn!("audio thread panicked");
        }
    }
}

pub struct CpalOutput {
    mixer: Arc<Mutex<Mixer>>,
    device_needle: Option<String>,
    stream: Mutex<Option<StreamThread>>,
}

impl CpalOutput {
    /// `device_needle` selects the first output device whose name contains it
    /// (case-insensitive); `None` uses the host default.
    pub fn new(device_needle: Option<String>) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::default())),
            device_needle,
            stream: Mutex::new(None),
        }
    }

    /// Opens a stream for `config` on a new audio thread and waits until it plays.
    fn start(&self, config: OutputConfig) -> Result<StreamThread, OutputError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), OutputError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let mixer = Arc::clone(&self.mixer);
        let needle = self.device_needle.clone();
        let handle = thread::Builder::new()
            .name("chiptrack-audio".to_string())
            .spawn(move || match open_stream(needle.as_deref(), config, mixer) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(StreamThread {
                config,
                stop_tx,
                handle,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(OutputError::ThreadExited)
            }
        }
    }
}

impl AudioOutput for CpalOutput {
    fn init(&self, config: OutputConfig) -> Result<(), OutputError> {
        let mut current = lock_ignoring_poison(&self.stream);
        if current.as_ref().is_some_and(|s| s.config == config) {
            return Ok(());
        }
        // One render path at a time: the old stream stops before the new one starts.
        let previous = current.take().map(|old| {
            let config = old.config;
            old.stop();
            config
        });

        match start_or_restore(config, previous, |c| self.start(c)) {
            Ok(started) => {
                *current = Some(started);
                Ok(())
            }
            Err((err, restored)) => {
                *current = restored;
                Err(err)
            }
        }
    }

    fn mixer(&self) -> &Arc<Mutex<Mixer>> {
        &self.mixer
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if let Some(stream) = lock_ignoring_poison(&self.stream).take() {
            stream.stop();
        }
    }
}

/// Names of all output devices of the default host.
pub fn output_device_names() -> Result<Vec<String>, OutputError> {
    let host = cpal::default_host();
    let devices = host.output_devices()?;
    Ok(devices.filter_map(|d| device_name(&d)).collect())
}

fn device_name(device: &cpal::Device) -> Option<String> {
    device.description().ok().map(|d| d.to_string())
}

fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device, OutputError> {
    match needle {
        Some(needle) => {
            let needle_lc = needle.to_lowercase();
            host.output_devices()?
                .find(|d| {
                    device_name(d)
                        .map(|n| n.to_lowercase().contains(&needle_lc))
                        .unwrap_or(false)
                })
                .ok_or_else(|| OutputError::NoMatchingDevice(needle.to_string()))
        }
        None => host
            .default_output_device()
            .ok_or(OutputError::NoDefaultDevice),
    }
}

fn open_stream(
    needle: Option<&str>,
    config: OutputConfig,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<cpal::Stream, OutputError> {
    let host = cpal::default_host();
    let device = pick_device(&host, needle)?;
    let supported = pick_output_config(&device, config.sample_rate.hz())?;
    if supported.sample_rate() != config.sample_rate.hz() {
        tracing::warn!(
            requested_hz = config.sample_rate.hz(),
            device_hz = supported.sample_rate(),
            "device does not support the track's sample rate; playback speed will differ"
        );
    }

    let mut stream_config: cpal::StreamConfig = supported.config();
    stream_config.buffer_size = pick_buffer_size(&supported, config.buffer_frames);
    tracing::info!(
        device = device_name(&device).as_deref().unwrap_or("unknown"),
        rate_hz = stream_config.sample_rate,
        channels = stream_config.channels,
        buffer = ?stream_config.buffer_size,
        "output stream"
    );

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer)?,
        other => return Err(OutputError::UnsupportedSampleFormat(format!("{other:?}"))),
    };
    stream.play()?;
    Ok(stream)
}

/// Closest supported config to `target_rate`, preferring stereo and float samples.
fn pick_output_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::SupportedStreamConfig, OutputError> {
    device
        .supported_output_configs()?
        .filter(|range| sample_format_rank(range.sample_format()).is_some())
        .map(|range| {
            let rate = target_rate.clamp(range.min_sample_rate(), range.max_sample_rate());
            let score = (
                rate.abs_diff(target_rate),
                range.channels() != 2,
                sample_format_rank(range.sample_format()),
            );
            (score, range.with_sample_rate(rate))
        })
        .min_by_key(|(score, _)| *score)
        .map(|(_, cfg)| cfg)
        .ok_or(OutputError::NoSupportedConfig)
}

fn sample_format_rank(format: cpal::SampleFormat) -> Option<u8> {
    match format {
        cpal::SampleFormat::F32 => Some(0),
        cpal::SampleFormat::I16 => Some(1),
        cpal::SampleFormat::U16 => Some(2),
        _ => None,
    }
}

fn pick_buffer_size(config: &cpal::SupportedStreamConfig, wanted: u32) -> cpal::BufferSize {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            let max = (*max).min(MAX_BUFFER_FRAMES).max(*min);
            cpal::BufferSize::Fixed(wanted.clamp(*min, max))
        }
        cpal::SupportedBufferSize::Unknown => cpal::BufferSize::Default,
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<cpal::Stream, OutputError>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut frames: Vec<Frame> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let count = data.len() / channels.max(1);
            frames.resize(count, SILENCE);
            lock_ignoring_poison(&mixer).render(&mut frames);
            write_frames(data, &frames, channels);
        },
        |err| tracing::warn!(error = %err, "output stream error"),
        None,
    )?;
    Ok(stream)
}

/// Writes stereo frames to an interleaved device buffer: mono devices get the
/// average, extra channels get silence.
fn write_frames<T>(data: &mut [T], frames: &[Frame], channels: usize)
where
    T: cpal::Sample + cpal::FromSample<f32>,
{
    if channels == 0 {
        return;
    }
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);
    for (out, frame) in data.chunks_mut(channels).zip(frames) {
        match out {
            [mono] => *mono = <T as cpal::Sample>::from_sample::<f32>(0.5 * (frame[0] + frame[1])),
            [left, right, rest @ ..] => {
                *left = <T as cpal::Sample>::from_sample::<f32>(frame[0]);
                *right = <T as cpal::Sample>::from_sample::<f32>(frame[1]);
                rest.fill(silence);
            }
            [] => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_frames_maps_channels() {
        let frames = [[0.5, -0.5], [1.0, 0.0]];

        let mut stereo = [0.0f32; 4];
        write_frames(&mut stereo, &frames, 2);
        assert_eq!(stereo, [0.5, -0.5, 1.0, 0.0]);

        let mut mono = [9.0f32; 2];
        write_frames(&mut mono, &frames, 1);
        assert_eq!(mono, [0.0, 0.5]);

        let mut quad = [9.0f32; 4];
        write_frames(&mut quad, &frames[..1], 4);
        assert_eq!(quad, [0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn write_frames_converts_to_integer_samples() {
        let mut out = [0i16; 2];
        write_frames(&mut out, &[[0.0, 0.0]], 2);
        assert_eq!(out, [0, 0]);
    }
}
