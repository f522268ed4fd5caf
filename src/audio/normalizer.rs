//! # Audio Normalization
//!
//! Decodes an uploaded audio clip and re-encodes it as mono, 16kHz, 16-bit
//! linear PCM in a WAV container. The pipeline is:
//!
//! upload bytes → symphonia decode → downmix to mono → rubato resample →
//! 16-bit PCM → WAV
//!
//! Any failure to decode is reported as `AppError::AudioDecode`; the
//! request is aborted with no retry.

use crate::error::{AppError, AppResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Sample rate required by the speech recognition service.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Normalized audio ready for transcription.
///
/// ## Fields:
/// - `wav`: Complete WAV file bytes (mono, 16kHz, 16-bit)
/// - `duration_seconds`: Length of the clip after resampling
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    pub wav: Vec<u8>,
    pub duration_seconds: f64,
}

/// Converts arbitrary uploaded audio into the fixed transcription format.
///
/// Stateless; one instance is shared by all requests.
#[derive(Debug, Clone, Default)]
pub struct AudioNormalizer;

impl AudioNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize an uploaded clip.
    ///
    /// ## Parameters:
    /// - **data**: Raw upload bytes in any supported container/codec
    /// - **mime_type**: The upload's declared content type, used only as a
    ///   probe hint (e.g. "audio/ogg" or "audio/mpeg;codecs=...")
    ///
    /// ## Returns:
    /// - **Ok(NormalizedAudio)**: Mono 16kHz 16-bit WAV bytes
    /// - **Err(AudioDecode)**: The bytes could not be decoded
    pub fn normalize(&self, data: Vec<u8>, mime_type: Option<&str>) -> AppResult<NormalizedAudio> {
        let (samples, source_rate, channels) = decode_to_f32(data, mime_type)?;

        debug!(
            samples = samples.len(),
            source_rate,
            channels,
            "decoded upload"
        );

        let mono = downmix_to_mono(&samples, channels);
        let resampled = if source_rate == TARGET_SAMPLE_RATE {
            mono
        } else {
            resample(&mono, source_rate, TARGET_SAMPLE_RATE)?
        };

        let duration_seconds = resampled.len() as f64 / f64::from(TARGET_SAMPLE_RATE);
        let wav = encode_wav(&resampled)?;

        Ok(NormalizedAudio {
            wav,
            duration_seconds,
        })
    }
}

/// Decode the upload into interleaved f32 samples.
///
/// Returns (samples, sample_rate, channel_count).
fn decode_to_f32(data: Vec<u8>, mime_type: Option<&str>) -> AppResult<(Vec<f32>, u32, usize)> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    // The declared content type is only a hint; symphonia still probes the
    // actual bytes. Browsers send things like "audio/ogg;codecs=opus", so
    // strip any parameters first.
    let mut hint = Hint::new();
    if let Some(mime) = mime_type {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        if !essence.is_empty() {
            hint.mime_type(essence);
        }
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AppError::AudioDecode(format!("unrecognized audio container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::AudioDecode("no decodable audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AppError::AudioDecode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream surfaces as an unexpected-EOF I/O error.
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AppError::AudioDecode(format!("demux failed: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();

                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                });
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            // A single corrupt packet is skipped; a stream of them will
            // end with the empty-output check below.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(AppError::AudioDecode(format!("decode failed: {}", e)));
            }
        }
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(AppError::AudioDecode(
            "no audio samples could be decoded".to_string(),
        ));
    }

    Ok((samples, sample_rate, channels))
}

/// Downmix interleaved samples to a single channel by averaging.
fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a mono clip in one pass with a sinc resampler.
fn resample(mono: &[f32], source_rate: u32, target_rate: u32) -> AppResult<Vec<f32>> {
    if mono.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, mono.len(), 1)
        .map_err(|e| AppError::AudioDecode(format!("resampler init failed: {}", e)))?;

    let input = vec![mono.to_vec()];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| AppError::AudioDecode(format!("resample failed: {}", e)))?;

    Ok(output.pop().unwrap_or_default())
}

/// Encode mono f32 samples as a 16-bit PCM WAV file in memory.
fn encode_wav(mono: &[f32]) -> AppResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AppError::Internal(format!("WAV writer init failed: {}", e)))?;

        for &sample in mono {
            let clamped = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(clamped)
                .map_err(|e| AppError::Internal(format!("WAV write failed: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| AppError::Internal(format!("WAV finalize failed: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a WAV clip in memory: `seconds` of a 440Hz tone.
    fn tone_wav(sample_rate: u32, channels: u16, seconds: f64) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (seconds * sample_rate as f64) as usize;

        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            let sample = (0.4 * (2.0 * std::f64::consts::PI * 440.0 * t).sin() * 32767.0) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }

        writer.finalize().unwrap();
        cursor.into_inner()
    }

    /// Parse normalized output and return (spec, sample_count).
    fn parse_output(wav: &[u8]) -> (hound::WavSpec, usize) {
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        let count = reader.into_samples::<i16>().count();
        (spec, count)
    }

    #[test]
    fn stereo_44k_becomes_mono_16k() {
        let input = tone_wav(44_100, 2, 0.5);
        let normalized = AudioNormalizer::new()
            .normalize(input, Some("audio/wav"))
            .unwrap();

        let (spec, count) = parse_output(&normalized.wav);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, TARGET_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);

        // Half a second of audio should land close to 8000 frames after
        // resampling (sinc filters trim a few edge samples).
        assert!((7000..=9000).contains(&count), "got {} frames", count);
        assert!((normalized.duration_seconds - 0.5).abs() < 0.1);
    }

    #[test]
    fn already_target_format_passes_through() {
        let input = tone_wav(16_000, 1, 0.25);
        let normalized = AudioNormalizer::new()
            .normalize(input, Some("audio/wav"))
            .unwrap();

        let (spec, count) = parse_output(&normalized.wav);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, TARGET_SAMPLE_RATE);
        assert_eq!(count, 4000);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let garbage = vec![0xDEu8, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33];
        let result = AudioNormalizer::new().normalize(garbage, Some("audio/webm"));
        assert!(matches!(result, Err(AppError::AudioDecode(_))));
    }

    #[test]
    fn mime_hint_is_not_trusted() {
        // A valid WAV clip with a wrong declared type still decodes; the
        // probe inspects the bytes.
        let input = tone_wav(22_050, 1, 0.1);
        let result = AudioNormalizer::new().normalize(input, Some("audio/mpeg"));
        assert!(result.is_ok());
    }

    #[test]
    fn downmix_averages_channels() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_to_mono(&interleaved, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }
}
