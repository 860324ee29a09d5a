//! Sample-accurate looping clip player.

use std::path::Path;
use std::sync::Arc;

use basic_au_core::{RenderFormat, RenderResult, RenderSlice, SignalSource, SourceError};

use crate::clip::AudioClip;
use crate::error::DspResult;

/// Plays a clip from memory, wrapping to the start at the exact frame the
/// clip ends. Ignores MIDI.
#[derive(Debug)]
pub struct LoopPlayer {
    clip: Arc<AudioClip>,
    position: usize,
    looping: bool,
    prepared: bool,
    running: bool,
}

impl LoopPlayer {
    /// Create a looping player over `clip`.
    pub fn new(clip: Arc<AudioClip>) -> Self {
        Self {
            clip,
            position: 0,
            looping: true,
            prepared: false,
            running: false,
        }
    }

    /// Decode `path` and create a player. Control thread only.
    pub fn open(path: &Path) -> DspResult<Self> {
        Ok(Self::new(Arc::new(AudioClip::load_wav(path)?)))
    }

    /// Play once and then render silence instead of wrapping.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Next frame to be played.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl SignalSource for LoopPlayer {
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()> {
        if (self.clip.sample_rate() - format.sample_rate).abs() > f64::EPSILON {
            log::warn!(
                "Clip sample rate {} Hz differs from render rate {} Hz; playing unresampled",
                self.clip.sample_rate(),
                format.sample_rate
            );
        }
        self.position = 0;
        self.prepared = true;
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError> {
        if !self.prepared {
            return Err(SourceError::NotPrepared);
        }
        output.clear();
        if !self.running {
            return Ok(());
        }

        let len = self.clip.len();
        for frame in 0..output.len() {
            if self.position >= len {
                if !self.looping {
                    break;
                }
                self.position = 0;
            }
            let (left, right) = self.clip.frame(self.position);
            output.write_frame(frame, left, right);
            self.position += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basic_au_core::AudioBuffer;

    fn clip() -> Arc<AudioClip> {
        Arc::new(AudioClip::new(vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0], 44100.0).unwrap())
    }

    #[test]
    fn test_wraps_at_exact_frame() {
        let mut player = LoopPlayer::new(clip());
        player.prepare(&RenderFormat::default()).unwrap();
        player.start();

        let mut buffer = AudioBuffer::stereo(7);
        player.render(&mut buffer.slice_mut(0..7).unwrap()).unwrap();
        assert_eq!(buffer.channel(0), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
        assert_eq!(buffer.channel(1)[2], -3.0);
        assert_eq!(player.position(), 1);
    }

    #[test]
    fn test_position_carries_across_calls() {
        let mut player = LoopPlayer::new(clip());
        player.prepare(&RenderFormat::default()).unwrap();
        player.start();

        let mut buffer = AudioBuffer::stereo(2);
        player.render(&mut buffer.slice_mut(0..2).unwrap()).unwrap();
        player.render(&mut buffer.slice_mut(0..2).unwrap()).unwrap();
        assert_eq!(buffer.channel(0), &[3.0, 1.0]);
    }

    #[test]
    fn test_one_shot_ends_in_silence() {
        let mut player = LoopPlayer::new(clip()).with_looping(false);
        player.prepare(&RenderFormat::default()).unwrap();
        player.start();

        let mut buffer = AudioBuffer::stereo(5);
        player.render(&mut buffer.slice_mut(0..5).unwrap()).unwrap();
        assert_eq!(buffer.channel(0), &[1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stopped_is_silent_and_keeps_position() {
        let mut player = LoopPlayer::new(clip());
        player.prepare(&RenderFormat::default()).unwrap();
        player.start();
        let mut buffer = AudioBuffer::stereo(2);
        player.render(&mut buffer.slice_mut(0..2).unwrap()).unwrap();

        player.stop();
        player.render(&mut buffer.slice_mut(0..2).unwrap()).unwrap();
        assert_eq!(buffer.peak(0..2), 0.0);
        assert_eq!(player.position(), 2);
    }

    #[test]
    fn test_ignores_midi() {
        let mut player = LoopPlayer::new(clip());
        player.note_on(60, 100, 0);
        assert!(!player.is_note_active(60, 0));
    }
}
