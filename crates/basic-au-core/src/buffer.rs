//! Audio buffers handed across the render boundary.
//!
//! # Architecture
//!
//! - **[`AudioBuffer`]**: caller-owned, fixed channel count and fixed
//!   capacity. The host allocates it once to the negotiated format; the
//!   engine writes into it but never resizes it.
//! - **[`RenderSlice`]**: a borrowed stereo window over a frame range of an
//!   `AudioBuffer`. Signal sources render into slices, which lets the engine
//!   split a render call at event boundaries without copying.
//!
//! # Real-Time Safety
//!
//! Creating a `RenderSlice` only re-borrows existing storage. Nothing in this
//! module allocates after `AudioBuffer::new`.

use std::ops::Range;

use crate::types::CHANNEL_COUNT;

// =============================================================================
// AudioBuffer - host-owned output storage
// =============================================================================

/// Non-interleaved output buffer for one render call.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    capacity: usize,
}

impl AudioBuffer {
    /// Allocate a zeroed buffer. Call from the control thread only.
    pub fn new(channel_count: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; channel_count],
            capacity,
        }
    }

    /// Allocate a zeroed stereo buffer.
    pub fn stereo(capacity: usize) -> Self {
        Self::new(CHANNEL_COUNT, capacity)
    }

    /// Frames each channel can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Read a channel. Panics if `index` is out of range.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Write a channel. Panics if `index` is out of range.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Zero every channel.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Fill every channel with a constant. Mostly useful to detect frames
    /// the engine did not write.
    pub fn fill(&mut self, value: f32) {
        for channel in &mut self.channels {
            channel.fill(value);
        }
    }

    /// Largest absolute sample in `range` across all channels.
    ///
    /// The range is clipped to the buffer capacity.
    pub fn peak(&self, range: Range<usize>) -> f32 {
        let end = range.end.min(self.capacity);
        let start = range.start.min(end);
        self.channels
            .iter()
            .flat_map(|channel| channel[start..end].iter())
            .fold(0.0f32, |peak, sample| peak.max(sample.abs()))
    }

    /// Borrow a stereo window over `range`.
    ///
    /// Returns `None` if the range exceeds the capacity or the buffer is not
    /// stereo.
    pub fn slice_mut(&mut self, range: Range<usize>) -> Option<RenderSlice<'_>> {
        if range.start > range.end || range.end > self.capacity {
            return None;
        }
        // Layout is fixed at CHANNEL_COUNT == 2.
        match self.channels.as_mut_slice() {
            [left, right] => Some(RenderSlice {
                channels: [&mut left[range.clone()], &mut right[range]],
            }),
            _ => None,
        }
    }
}

// =============================================================================
// RenderSlice - borrowed stereo frame range
// =============================================================================

/// Stereo window into an [`AudioBuffer`], valid for one render segment.
pub struct RenderSlice<'a> {
    channels: [&'a mut [f32]; CHANNEL_COUNT],
}

impl<'a> RenderSlice<'a> {
    /// Build a slice directly from two channel slices of equal length.
    ///
    /// Returns `None` if the lengths differ.
    pub fn from_channels(left: &'a mut [f32], right: &'a mut [f32]) -> Option<Self> {
        if left.len() != right.len() {
            return None;
        }
        Some(Self {
            channels: [left, right],
        })
    }

    /// Number of frames in this slice.
    #[inline]
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Whether this slice covers zero frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a channel.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &*self.channels[index]
    }

    /// Write a channel.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut *self.channels[index]
    }

    /// Both channels at once.
    #[inline]
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let [left, right] = &mut self.channels;
        (&mut **left, &mut **right)
    }

    /// Zero the slice.
    pub fn clear(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.fill(0.0);
        }
    }

    /// Multiply every sample by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for channel in self.channels.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Write the same mono sample to both channels at `frame`.
    #[inline]
    pub fn write_frame(&mut self, frame: usize, left: f32, right: f32) {
        self.channels[0][frame] = left;
        self.channels[1][frame] = right;
    }

    /// Add to both channels at `frame`.
    #[inline]
    pub fn add_frame(&mut self, frame: usize, left: f32, right: f32) {
        self.channels[0][frame] += left;
        self.channels[1][frame] += right;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_bounds() {
        let mut buffer = AudioBuffer::stereo(16);
        assert_eq!(buffer.slice_mut(0..16).map(|s| s.len()), Some(16));
        assert_eq!(buffer.slice_mut(4..8).map(|s| s.len()), Some(4));
        assert!(buffer.slice_mut(0..17).is_none());
    }

    #[test]
    fn test_slice_requires_stereo() {
        let mut mono = AudioBuffer::new(1, 8);
        assert!(mono.slice_mut(0..8).is_none());
    }

    #[test]
    fn test_slice_writes_only_its_range() {
        let mut buffer = AudioBuffer::stereo(8);
        {
            let mut slice = buffer.slice_mut(2..4).unwrap();
            slice.write_frame(0, 1.0, -1.0);
            slice.write_frame(1, 0.5, -0.5);
        }
        assert_eq!(buffer.channel(0), &[0.0, 0.0, 1.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(buffer.channel(1)[2], -1.0);
        assert_eq!(buffer.peak(0..2), 0.0);
        assert_eq!(buffer.peak(0..8), 1.0);
    }

    #[test]
    fn test_apply_gain() {
        let mut buffer = AudioBuffer::stereo(4);
        buffer.fill(1.0);
        buffer.slice_mut(0..4).unwrap().apply_gain(0.25);
        assert!(buffer.channel(1).iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_from_channels_length_mismatch() {
        let mut left = [0.0f32; 4];
        let mut right = [0.0f32; 3];
        assert!(RenderSlice::from_channels(&mut left, &mut right).is_none());
    }
}
