//! The render handle hosts call for audio.
//!
//! [`RenderBlock`] is the Rust counterpart of an AUv3 `internalRenderBlock`.
//! It holds only a [`Weak`] reference to the unit's render state, so a host
//! that keeps the block alive after dropping the unit gets
//! [`os_status::UNINITIALIZED`] instead of a dangling engine.
//!
//! # Real-Time Safety
//!
//! The render state sits behind a mutex that the control thread takes for
//! allocate/deallocate. The block never waits for it: `try_lock` either
//! succeeds immediately or the call returns
//! [`os_status::CANNOT_DO_IN_CURRENT_CONTEXT`]. Events are decoded into a
//! list allocated with the state and audio is rendered into a scratch buffer
//! sized at allocation, so a render call does not allocate.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use basic_au_core::{AudioBuffer, EventList, RenderEngine, RenderEvent, RenderFormat, RenderResult};

use crate::buffers::{deliver_output, validate_output, AudioBufferList};
use crate::error::{os_status, status_of};
use crate::render_event::{extract_render_events, AURenderEvent, AudioTimeStamp};

/// Everything the render thread touches.
pub(crate) struct UnitRenderState {
    pub(crate) engine: RenderEngine,
    events: Box<EventList>,
    scratch: AudioBuffer,
}

impl UnitRenderState {
    pub(crate) fn new(engine: RenderEngine) -> Self {
        Self {
            engine,
            events: Box::new(EventList::new()),
            scratch: AudioBuffer::stereo(0),
        }
    }

    /// Allocate the engine and a scratch buffer for its largest quantum.
    pub(crate) fn allocate(&mut self, format: RenderFormat) -> RenderResult<()> {
        self.engine.allocate(format)?;
        self.scratch = AudioBuffer::new(format.channel_count, format.max_frames as usize);
        Ok(())
    }

    pub(crate) fn deallocate(&mut self) {
        self.engine.deallocate();
        self.scratch = AudioBuffer::stereo(0);
    }
}

/// Lifetime-checked render entry point.
///
/// Cheap to clone; every clone refers to the same unit.
#[derive(Clone)]
pub struct RenderBlock {
    state: Weak<Mutex<UnitRenderState>>,
}

impl RenderBlock {
    pub(crate) fn new(state: &Arc<Mutex<UnitRenderState>>) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }

    /// Whether the unit behind this block still exists.
    pub fn is_alive(&self) -> bool {
        self.state.strong_count() > 0
    }

    /// Render `frame_count` frames of already-decoded events into `output`.
    ///
    /// Returns an OSStatus; `os_status::NO_ERR` on success.
    pub fn render(
        &self,
        frame_count: u32,
        events: &[RenderEvent],
        output: &mut AudioBuffer,
    ) -> i32 {
        self.with_state(|state| state.engine.render(frame_count, events, output))
    }

    /// Render with the Audio Unit calling convention.
    ///
    /// Checks `output` first and refuses the call before any event is
    /// applied if it cannot take the frames. Then decodes the host's event
    /// list relative to `timestamp`, renders into the unit's scratch buffer
    /// and delivers the frames to `output`. Host events that do not fit the
    /// event list are dropped and counted in the stats.
    ///
    /// # Safety
    ///
    /// `timestamp` must be null or valid for reads. `output` must point to a
    /// valid `AudioBufferList` as described in [`deliver_output`], and
    /// `events` must satisfy [`extract_render_events`]. All pointers must
    /// stay valid for the duration of the call. Memory lent to `output`
    /// stays valid until the next render call or deallocation.
    pub unsafe fn render_raw(
        &self,
        timestamp: *const AudioTimeStamp,
        frame_count: u32,
        output: *mut AudioBufferList,
        events: *const AURenderEvent,
    ) -> i32 {
        self.with_state(|state| {
            let channel_count = state.scratch.channel_count();
            if let Err(err) = validate_output(output, frame_count as usize, channel_count) {
                return state.engine.reject(err);
            }

            let call_start = if timestamp.is_null() {
                0.0
            } else {
                (*timestamp).sample_time
            };
            extract_render_events(events, call_start, &mut state.events);
            let dropped = state.events.dropped();
            if dropped > 0 {
                state.engine.stats().record_dropped_events(dropped as u64);
            }

            let UnitRenderState {
                engine,
                events,
                scratch,
            } = state;
            engine.render(frame_count, events.as_slice(), scratch)?;
            deliver_output(scratch, frame_count as usize, output)
        })
    }

    fn with_state<F>(&self, render: F) -> i32
    where
        F: FnOnce(&mut UnitRenderState) -> RenderResult<()>,
    {
        let Some(state) = self.state.upgrade() else {
            return os_status::UNINITIALIZED;
        };
        // Real-time safety: use try_lock to avoid blocking
        let mut guard = match state.try_lock() {
            Ok(guard) => guard,
            Err(_) => return os_status::CANNOT_DO_IN_CURRENT_CONTEXT,
        };
        status_of(&render(&mut guard))
    }
}

impl fmt::Debug for RenderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderBlock")
            .field("alive", &self.is_alive())
            .finish()
    }
}
