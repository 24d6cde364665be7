//! Microphone capture using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use parking_lot::Mutex;
use std::convert::identity;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::AudioSettings;
use crate::error::DiarizationError;
use crate::wav_encoder::AudioBuffer;

/// Manages a single scoped capture session on the default input device
///
/// Frames arrive on the audio thread and accumulate in a shared buffer until
/// [`AudioCapture::stop`] drains them. The stream is released on every exit
/// path, including Drop.
pub struct AudioCapture {
    stream: Option<cpal::Stream>,
    captured: Arc<Mutex<Vec<f32>>>,
    active: Arc<AtomicBool>,
    settings: AudioSettings,
    stream_channels: u16,
    stream_rate: u32,
}

impl AudioCapture {
    /// Creates a new AudioCapture instance
    pub fn new(settings: AudioSettings) -> Self {
        Self {
            stream: None,
            captured: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicBool::new(false)),
            stream_channels: settings.channels,
            stream_rate: settings.sample_rate,
            settings,
        }
    }

    /// Starts audio capture on the default input device
    ///
    /// Prefers the configured rate and channel count; when the device refuses
    /// that shape, falls back to its default configuration and records the
    /// actual geometry for the returned buffer.
    ///
    /// # Returns
    /// Result indicating success or a `Device` error
    pub fn start(&mut self) -> Result<(), DiarizationError> {
        if self.stream.is_some() {
            return Ok(()); // Already capturing
        }

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            DiarizationError::Device("no input device available".to_string())
        })?;
        log::info!(
            "Opening capture stream on {}",
            device.name().unwrap_or_else(|_| "unknown device".to_string())
        );

        self.captured.lock().clear();

        let requested = cpal::StreamConfig {
            channels: self.settings.channels,
            sample_rate: cpal::SampleRate(self.settings.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match self.build_stream(&device, &requested, identity::<f32>) {
            Ok(stream) => {
                self.stream_channels = requested.channels;
                self.stream_rate = requested.sample_rate.0;
                stream
            }
            Err(e) => {
                log::warn!(
                    "Requested capture format unavailable ({}), falling back to device default",
                    e
                );
                let default = device.default_input_config().map_err(|e| {
                    DiarizationError::Device(format!(
                        "failed to query default input config: {}",
                        e
                    ))
                })?;
                let config = default.config();
                self.stream_channels = config.channels;
                self.stream_rate = config.sample_rate.0;
                match default.sample_format() {
                    SampleFormat::F32 => self.build_stream(&device, &config, identity::<f32>)?,
                    SampleFormat::I16 => {
                        self.build_stream(&device, &config, |s: i16| s as f32 / 32768.0)?
                    }
                    SampleFormat::U16 => self.build_stream(&device, &config, |s: u16| {
                        (s as f32 - 32768.0) / 32768.0
                    })?,
                    other => {
                        return Err(DiarizationError::Device(format!(
                            "unsupported input sample format {:?}",
                            other
                        )));
                    }
                }
            }
        };

        stream.play().map_err(|e| {
            DiarizationError::Device(format!("failed to start capture stream: {}", e))
        })?;

        self.active.store(true, Ordering::Release);
        self.stream = Some(stream);
        Ok(())
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        convert: fn(T) -> f32,
    ) -> Result<cpal::Stream, DiarizationError>
    where
        T: cpal::SizedSample + 'static,
    {
        let captured = self.captured.clone();
        let active = self.active.clone();

        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    // Only buffer frames while a session is active
                    if active.load(Ordering::Relaxed) {
                        let mut buffer = captured.lock();
                        buffer.extend(data.iter().map(|&s| convert(s)));
                    }
                },
                |err| {
                    log::warn!("Capture stream error: {}", err);
                },
                None,
            )
            .map_err(|e| DiarizationError::Device(format!("failed to open stream: {}", e)))
    }

    /// Stops capture, releases the device, and returns the buffered frames
    ///
    /// # Returns
    /// The raw capture, or `EmptyRecording` when zero frames were buffered
    pub fn stop(&mut self) -> Result<AudioBuffer, DiarizationError> {
        self.active.store(false, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause capture stream: {}", e);
            }
        }

        let samples = std::mem::take(&mut *self.captured.lock());
        if samples.is_empty() {
            return Err(DiarizationError::EmptyRecording);
        }

        log::debug!(
            "Capture stopped with {} samples ({}ch @ {}Hz)",
            samples.len(),
            self.stream_channels,
            self.stream_rate
        );

        Ok(AudioBuffer {
            samples,
            channels: self.stream_channels,
            sample_rate: self.stream_rate,
        })
    }

    /// Whether a capture session is currently buffering frames
    ///
    /// Pure status query with no side effects.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Releases the stream without draining the buffer
    pub fn release(&mut self) {
        self.active.store(false, Ordering::Release);
        self.stream = None;
        self.captured.lock().clear();
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.release();
    }
}
