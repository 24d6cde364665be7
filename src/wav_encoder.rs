//! PCM quantization and canonical WAV container encoding
//!
//! The bytes handed to the remote engine must be a well-formed 16-bit PCM
//! container, so every encode is verified by parsing its own header back
//! before the value is released.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

use crate::error::DiarizationError;

/// Raw captured sample frames, owned by the encoder during conversion
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Channel-interleaved f32 samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Number of interleaved channels
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Duration of the buffered audio in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.channels == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        frames / self.sample_rate as f64
    }
}

/// Declared format of an encoded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// RIFF/WAVE container with 16-bit little-endian PCM data
    WavPcm16,
}

/// Immutable encoded payload ready for upload
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    bytes: Vec<u8>,
    format: AudioFormat,
}

impl EncodedAudio {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Quantizes one float sample to 16-bit PCM
///
/// The two halves of the range scale differently so that -1.0 maps exactly to
/// i16::MIN and 1.0 exactly to i16::MAX; decoding with [`dequantize_sample`]
/// and re-encoding reproduces the same bits.
pub fn quantize_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0).round().max(-32768.0) as i16
    } else {
        (s * 32767.0).round().min(32767.0) as i16
    }
}

/// Inverse of [`quantize_sample`]
pub fn dequantize_sample(value: i16) -> f32 {
    if value < 0 {
        value as f32 / 32768.0
    } else {
        value as f32 / 32767.0
    }
}

/// Fields recovered from a container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Remaining-size field declared after the magic
    pub declared_size: u32,
    /// Format tag from the fmt block; 1 means integer PCM
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Declared length of the data block in bytes
    pub data_len: u32,
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Parses a container header without touching the sample data
///
/// Walks the chunk list after the magic, so extra chunks between `fmt ` and
/// `data` are tolerated.
pub fn parse_header(bytes: &[u8]) -> Result<ContainerInfo, DiarizationError> {
    if bytes.len() < 44 {
        return Err(DiarizationError::Encoding(
            "container shorter than a WAV header".to_string(),
        ));
    }
    if &bytes[0..4] != b"RIFF" {
        return Err(DiarizationError::Encoding("missing RIFF magic".to_string()));
    }
    let declared_size = read_u32(bytes, 4);
    if &bytes[8..12] != b"WAVE" {
        return Err(DiarizationError::Encoding("missing WAVE marker".to_string()));
    }

    let mut fmt: Option<(u16, u16, u32, u32, u16, u16)> = None;
    let mut data_len: Option<u32> = None;
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_size = read_u32(bytes, offset + 4) as usize;
        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || offset + 8 + 16 > bytes.len() {
                    return Err(DiarizationError::Encoding(
                        "format block truncated".to_string(),
                    ));
                }
                let base = offset + 8;
                fmt = Some((
                    read_u16(bytes, base),
                    read_u16(bytes, base + 2),
                    read_u32(bytes, base + 4),
                    read_u32(bytes, base + 8),
                    read_u16(bytes, base + 12),
                    read_u16(bytes, base + 14),
                ));
            }
            b"data" => {
                data_len = Some(chunk_size as u32);
                break;
            }
            _ => {}
        }
        // chunk payloads are word aligned
        offset += 8 + chunk_size + (chunk_size & 1);
    }

    let (format_tag, channels, sample_rate, byte_rate, block_align, bits_per_sample) =
        fmt.ok_or_else(|| DiarizationError::Encoding("missing format block".to_string()))?;
    let data_len =
        data_len.ok_or_else(|| DiarizationError::Encoding("missing data block".to_string()))?;

    Ok(ContainerInfo {
        declared_size,
        format_tag,
        channels,
        sample_rate,
        byte_rate,
        block_align,
        bits_per_sample,
        data_len,
    })
}

/// Encodes a raw capture into a verified canonical container
///
/// # Arguments
/// * `buffer` - Interleaved float samples with their declared geometry
///
/// # Returns
/// The encoded payload, or `Encoding` when the produced bytes fail
/// verification
pub fn encode(buffer: &AudioBuffer) -> Result<EncodedAudio, DiarizationError> {
    if buffer.channels == 0 || buffer.sample_rate == 0 {
        return Err(DiarizationError::Encoding(
            "audio buffer has no declared geometry".to_string(),
        ));
    }

    let spec = WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in &buffer.samples {
            writer.write_sample(quantize_sample(sample))?;
        }
        writer.finalize()?;
    }
    let bytes = cursor.into_inner();

    verify_container(&bytes, buffer)?;

    Ok(EncodedAudio {
        bytes,
        format: AudioFormat::WavPcm16,
    })
}

/// Checks the produced bytes against the buffer they were encoded from
fn verify_container(bytes: &[u8], buffer: &AudioBuffer) -> Result<(), DiarizationError> {
    let info = parse_header(bytes)?;
    let expected_block_align = buffer.channels * 2;
    let expected_data_len = (buffer.samples.len() * 2) as u32;

    if info.format_tag != 1 {
        return Err(DiarizationError::Encoding(format!(
            "expected PCM format tag 1, found {}",
            info.format_tag
        )));
    }
    if info.channels != buffer.channels
        || info.sample_rate != buffer.sample_rate
        || info.bits_per_sample != 16
    {
        return Err(DiarizationError::Encoding(format!(
            "header declares {}ch/{}Hz/{}bit, encoded from {}ch/{}Hz/16bit",
            info.channels,
            info.sample_rate,
            info.bits_per_sample,
            buffer.channels,
            buffer.sample_rate
        )));
    }
    if info.block_align != expected_block_align
        || info.byte_rate != buffer.sample_rate * expected_block_align as u32
    {
        return Err(DiarizationError::Encoding(
            "header rate fields are inconsistent".to_string(),
        ));
    }
    if info.data_len != expected_data_len {
        return Err(DiarizationError::Encoding(format!(
            "data block declares {} bytes, expected {}",
            info.data_len, expected_data_len
        )));
    }
    if info.declared_size as usize != bytes.len().saturating_sub(8) {
        return Err(DiarizationError::Encoding(
            "declared remaining size disagrees with payload length".to_string(),
        ));
    }
    Ok(())
}

/// Loads a WAV file from disk into an [`AudioBuffer`]
///
/// Accepts the formats the pipeline itself produces (16-bit integer PCM) plus
/// 32-bit float, which capture tools commonly write.
pub fn read_wav_file(path: &Path) -> Result<AudioBuffer, DiarizationError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(dequantize_sample))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(DiarizationError::Encoding(format!(
                "unsupported WAV sample format {:?}/{} in {}",
                format,
                bits,
                path.display()
            )));
        }
    };

    Ok(AudioBuffer {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}
