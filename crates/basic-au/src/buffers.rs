//! Core Audio buffer list ABI and output delivery.
//!
//! The engine renders into a [`RenderBuffer`] owned by the unit. After a
//! successful call the rendered frames are handed to the host's
//! `AudioBufferList`: copied when the host supplied its own memory, or lent
//! by pointer when the host passed null data pointers and asked the unit to
//! provide the buffers.
//!
//! # Supported Audio Formats
//!
//! Non-interleaved float (f32) audio only: one `AudioBuffer` per channel,
//! `number_channels == 1`, data aligned for f32.

use std::ffi::c_void;

use basic_au_core::{AudioBuffer as RenderBuffer, FormatError, RenderError, RenderResult};

/// Core Audio AudioBuffer structure.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AudioBuffer {
    /// Interleaved channel count; 1 for non-interleaved audio.
    pub number_channels: u32,
    /// Size of the buffer in bytes.
    pub data_byte_size: u32,
    /// Pointer to the audio data.
    pub data: *mut c_void,
}

/// Core Audio AudioBufferList structure.
///
/// Contains a variable number of AudioBuffer structures.
#[repr(C)]
#[derive(Debug)]
pub struct AudioBufferList {
    /// Number of buffers in the list.
    pub number_buffers: u32,
    /// First buffer (actual array continues beyond this).
    pub buffers: [AudioBuffer; 1],
}

impl AudioBufferList {
    /// Get a mutable reference to the buffer at the given index.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `index < number_buffers`.
    #[inline]
    pub unsafe fn buffer_at_mut(&mut self, index: u32) -> &mut AudioBuffer {
        let buffers_ptr = self.buffers.as_mut_ptr();
        &mut *buffers_ptr.add(index as usize)
    }
}

/// A two-buffer `AudioBufferList` with the same memory layout, for callers
/// that own their output memory.
#[repr(C)]
#[derive(Debug)]
pub struct StereoBufferList {
    number_buffers: u32,
    buffers: [AudioBuffer; 2],
}

impl StereoBufferList {
    /// Point the list at two channel slices.
    ///
    /// The slices must outlive every use of [`as_mut_ptr`](Self::as_mut_ptr).
    pub fn new(left: &mut [f32], right: &mut [f32]) -> Self {
        let buffer = |channel: &mut [f32]| AudioBuffer {
            number_channels: 1,
            data_byte_size: std::mem::size_of_val(channel) as u32,
            data: channel.as_mut_ptr() as *mut c_void,
        };
        Self {
            number_buffers: 2,
            buffers: [buffer(left), buffer(right)],
        }
    }

    /// A list whose data pointers are null, asking the unit to lend its
    /// own buffers.
    pub fn unbacked() -> Self {
        let buffer = AudioBuffer {
            number_channels: 1,
            data_byte_size: 0,
            data: std::ptr::null_mut(),
        };
        Self {
            number_buffers: 2,
            buffers: [buffer, buffer],
        }
    }

    /// Data pointer of channel `index` after a render call.
    pub fn data(&self, index: usize) -> *const f32 {
        self.buffers[index].data as *const f32
    }

    /// The list as the render block receives it.
    pub fn as_mut_ptr(&mut self) -> *mut AudioBufferList {
        self as *mut Self as *mut AudioBufferList
    }
}

#[inline]
fn is_f32_aligned(data: *const c_void) -> bool {
    (data as usize) % std::mem::align_of::<f32>() == 0
}

/// Check that the host's buffer list can take `frame_count` frames of
/// `channel_count` channels. Nothing is written.
///
/// Every error [`deliver_output`] can report is reported here, so a render
/// call can refuse the host's buffers before any event is applied.
///
/// # Safety
///
/// `list` must be null or point to a valid `AudioBufferList` whose
/// `number_buffers` entries are readable.
pub unsafe fn validate_output(
    list: *const AudioBufferList,
    frame_count: usize,
    channel_count: usize,
) -> RenderResult<()> {
    if list.is_null() {
        return Err(RenderError::InvalidBuffer("null output buffer list"));
    }
    let number_buffers = (*list).number_buffers as usize;
    if number_buffers != channel_count {
        return Err(RenderError::UnsupportedFormat(FormatError::ChannelCount {
            expected: channel_count,
            actual: number_buffers,
        }));
    }

    let byte_count = frame_count * std::mem::size_of::<f32>();
    let buffers = std::ptr::addr_of!((*list).buffers) as *const AudioBuffer;
    for index in 0..number_buffers {
        let buffer = &*buffers.add(index);
        if buffer.number_channels != 1 {
            return Err(RenderError::UnsupportedFormat(FormatError::ChannelCount {
                expected: 1,
                actual: buffer.number_channels as usize,
            }));
        }
        // Null data asks the unit to lend its own memory.
        if buffer.data.is_null() {
            continue;
        }
        if !is_f32_aligned(buffer.data) {
            return Err(RenderError::InvalidBuffer("output buffer not aligned for f32"));
        }
        if (buffer.data_byte_size as usize) < byte_count {
            return Err(RenderError::BufferOverrun {
                requested: frame_count.min(u32::MAX as usize) as u32,
                maximum: buffer.data_byte_size / std::mem::size_of::<f32>() as u32,
            });
        }
    }
    Ok(())
}

/// Deliver `frame_count` rendered frames to the host's buffer list.
///
/// The list is validated as a whole first: on error no buffer has been
/// written. Buffers with a null data pointer are pointed at `rendered`,
/// which must then stay untouched until the host has consumed the audio.
///
/// # Safety
///
/// `list` must point to a valid `AudioBufferList` whose `number_buffers`
/// entries are readable and writable, and whose non-null data pointers
/// reference at least `data_byte_size` writable bytes.
pub unsafe fn deliver_output(
    rendered: &mut RenderBuffer,
    frame_count: usize,
    list: *mut AudioBufferList,
) -> RenderResult<()> {
    if frame_count > rendered.capacity() {
        return Err(RenderError::BufferOverrun {
            requested: frame_count.min(u32::MAX as usize) as u32,
            maximum: rendered.capacity().min(u32::MAX as usize) as u32,
        });
    }
    validate_output(list, frame_count, rendered.channel_count())?;

    let list = &mut *list;
    let byte_count = (frame_count * std::mem::size_of::<f32>()) as u32;
    for index in 0..list.number_buffers {
        let buffer = list.buffer_at_mut(index);
        let channel = &mut rendered.channel_mut(index as usize)[..frame_count];
        if buffer.data.is_null() {
            buffer.data = channel.as_mut_ptr() as *mut c_void;
        } else {
            let target = std::slice::from_raw_parts_mut(buffer.data as *mut f32, frame_count);
            target.copy_from_slice(channel);
        }
        buffer.data_byte_size = byte_count;
    }
    Ok(())
}
