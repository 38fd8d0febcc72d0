use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono PCM in [-1, 1] at the source's native rate.
#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut format = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?
        .format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let samples = read_mono(format.as_mut(), decoder.as_mut(), track_id, channels)?;

    let audio = AudioData::new(samples, sample_rate);
    log::info!(
        "Decoded {}: {} samples, {}Hz, {} channel(s) -> mono, {:.1}s",
        path.display(),
        audio.samples.len(),
        sample_rate,
        channels,
        audio.duration()
    );
    Ok(audio)
}

fn read_mono(
    format: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
    channels: usize,
) -> Result<Vec<f32>> {
    let mut mono = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt packets are skipped, the stream stays usable.
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        downmix_into(buf.samples(), channels, &mut mono);
    }

    Ok(mono)
}

/// Average interleaved frames into a single channel.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_frames() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, -0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.0]);
    }

    #[test]
    fn downmix_mono_passthrough() {
        let mut out = vec![0.25];
        downmix_into(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![0.25, 0.1, 0.2]);
    }

    #[test]
    fn duration_of_empty_rate_is_zero() {
        assert_eq!(AudioData::new(vec![0.0; 10], 0).duration(), 0.0);
        assert_eq!(AudioData::new(vec![0.0; 22050], 44100).duration(), 0.5);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = decode_audio(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(err.to_string().contains("Failed to open audio file"));
    }
}
