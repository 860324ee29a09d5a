//! In-memory audio clips.
//!
//! Clips are decoded on the control thread (with `hound`) and shared with
//! signal sources through an `Arc`, so re-allocating render resources never
//! touches the file system again.

use std::f64::consts::TAU;
use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::error::{DspError, DspResult};

/// Non-interleaved stereo audio held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: f64,
}

impl AudioClip {
    /// Build a clip from two channels.
    ///
    /// Fails if the channels are empty, differ in length, or the sample
    /// rate is not positive.
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: f64) -> DspResult<Self> {
        if left.is_empty() {
            return Err(DspError::InvalidSample("clip has no frames"));
        }
        if left.len() != right.len() {
            return Err(DspError::InvalidSample("channel lengths differ"));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSample("sample rate must be positive"));
        }
        Ok(Self {
            left,
            right,
            sample_rate,
        })
    }

    /// Build a clip with the same data on both channels.
    pub fn mono(samples: Vec<f32>, sample_rate: f64) -> DspResult<Self> {
        Self::new(samples.clone(), samples, sample_rate)
    }

    /// A short decaying sine at `frequency`, used when no sample file is
    /// configured.
    pub fn pluck(frequency: f64, seconds: f64, sample_rate: f64) -> DspResult<Self> {
        let frames = (seconds * sample_rate).round().max(1.0) as usize;
        let decay = 5.0 / seconds.max(1e-3);
        let samples = (0..frames)
            .map(|i| {
                let t = i as f64 / sample_rate;
                ((TAU * frequency * t).sin() * (-decay * t).exp()) as f32
            })
            .collect();
        Self::mono(samples, sample_rate)
    }

    /// Decode a WAV file. Mono files are duplicated to both channels and
    /// channels past the second are dropped.
    pub fn load_wav(path: &Path) -> DspResult<Self> {
        let wav_error = |source| DspError::Wav {
            path: path.to_path_buf(),
            source,
        };
        let reader = WavReader::open(path).map_err(wav_error)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(wav_error)?,
            SampleFormat::Int => {
                let bits = spec.bits_per_sample;
                if bits == 0 || bits > 32 {
                    return Err(DspError::UnsupportedBitDepth(bits));
                }
                let max_val = (1i64 << (bits - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(wav_error)?
            }
        };

        if samples.is_empty() {
            return Err(DspError::EmptyFile(path.to_path_buf()));
        }

        // Deinterleave to stereo
        let frames = samples.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for chunk in samples.chunks_exact(channels) {
            left.push(chunk[0]);
            right.push(chunk.get(1).copied().unwrap_or(chunk[0]));
        }

        log::info!(
            "Loaded {}: {} frames, {} channels, {} Hz",
            path.display(),
            frames,
            channels,
            spec.sample_rate
        );
        Self::new(left, right, spec.sample_rate as f64)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Always false: clips hold at least one frame.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Sample rate the clip was recorded at.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Left channel.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel.
    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Frame at `index` as `(left, right)`.
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        (self.left[index], self.right[index])
    }

    /// Linearly interpolated frame at fractional `position`.
    ///
    /// Positions at or past the last frame return silence.
    #[inline]
    pub fn frame_at(&self, position: f64) -> (f32, f32) {
        if position < 0.0 {
            return (0.0, 0.0);
        }
        let index = position as usize;
        if index >= self.len() {
            return (0.0, 0.0);
        }
        let frac = (position - index as f64) as f32;
        let (l0, r0) = self.frame(index);
        let (l1, r1) = if index + 1 < self.len() {
            self.frame(index + 1)
        } else {
            (0.0, 0.0)
        };
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hound::{WavSpec, WavWriter};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("basic-au-dsp-{}-{}.wav", name, std::process::id()))
    }

    #[test]
    fn test_rejects_empty_and_mismatched() {
        assert!(AudioClip::new(vec![], vec![], 44100.0).is_err());
        assert!(AudioClip::new(vec![0.0; 2], vec![0.0; 3], 44100.0).is_err());
        assert!(AudioClip::mono(vec![0.0; 2], 0.0).is_err());
    }

    #[test]
    fn test_interpolation() {
        let clip = AudioClip::mono(vec![0.0, 1.0, 0.0], 44100.0).unwrap();
        assert_abs_diff_eq!(clip.frame_at(0.5).0, 0.5);
        assert_abs_diff_eq!(clip.frame_at(1.25).1, 0.75);
        assert_eq!(clip.frame_at(3.0), (0.0, 0.0));
    }

    #[test]
    fn test_pluck_decays() {
        let clip = AudioClip::pluck(440.0, 0.5, 44100.0).unwrap();
        assert_eq!(clip.len(), 22050);
        let head = clip.left()[..1000].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let tail = clip.left()[21000..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(head > 10.0 * tail);
    }

    #[test]
    fn test_load_stereo_int_wav() {
        let path = temp_path("stereo16");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = AudioClip::load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(clip.len(), 4);
        assert_eq!(clip.sample_rate(), 22050.0);
        assert_abs_diff_eq!(clip.frame(0).0, 0.5);
        assert_abs_diff_eq!(clip.frame(0).1, -0.5);
    }

    #[test]
    fn test_load_mono_float_wav() {
        let path = temp_path("mono32");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [0.25f32, -0.25, 0.5] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let clip = AudioClip::load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(clip.len(), 3);
        assert_eq!(clip.left(), clip.right());
    }

    #[test]
    fn test_missing_file() {
        let err = AudioClip::load_wav(Path::new("/nonexistent/loop.wav")).unwrap_err();
        assert!(matches!(err, DspError::Wav { .. }));
    }
}
