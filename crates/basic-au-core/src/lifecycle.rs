//! Render resource lifecycle.
//!
//! [`LifecycleManager`] owns the [`EngineState`] machine:
//!
//! ```text
//! Uninitialized --[allocate]--> Allocated --[deallocate]--> Deallocated
//!                                   ^                            |
//!                                   +---------[allocate]---------+
//! ```
//!
//! The signal source is only known to be sized correctly once the host has
//! negotiated a format, so construction, `prepare` and `start` all happen in
//! `allocate` on the control thread, never inside `render`. The host
//! guarantees no render call overlaps `allocate` or `deallocate`.

use crate::error::{RenderError, RenderResult};
use crate::format::RenderFormat;
use crate::parameters::ParameterRegistry;
use crate::source::{SignalSource, SourceFactory};
use crate::types::ParameterAddress;

/// Everything a render call needs, built by `allocate`.
pub struct RenderResources {
    /// Negotiated format.
    pub format: RenderFormat,
    /// The running signal source.
    pub source: Box<dyn SignalSource>,
}

/// Engine lifecycle states.
pub enum EngineState {
    /// Constructed, never allocated.
    Uninitialized,
    /// Resources allocated; render calls are valid.
    Allocated(RenderResources),
    /// Resources released; `allocate` may be called again.
    Deallocated,
}

impl EngineState {
    /// Check if in allocated state.
    pub fn is_allocated(&self) -> bool {
        matches!(self, Self::Allocated(_))
    }

    /// State name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Allocated(_) => "allocated",
            Self::Deallocated => "deallocated",
        }
    }

    /// Get the negotiated format (only when allocated).
    pub fn format(&self) -> Option<&RenderFormat> {
        match self {
            Self::Allocated(resources) => Some(&resources.format),
            _ => None,
        }
    }
}

/// Allocates and releases render resources off the render thread.
pub struct LifecycleManager {
    state: EngineState,
    factory: SourceFactory,
}

impl LifecycleManager {
    /// Create a manager in the uninitialized state.
    pub fn new(factory: SourceFactory) -> Self {
        Self {
            state: EngineState::Uninitialized,
            factory,
        }
    }

    /// Current state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Get reference to resources (only when allocated).
    pub fn resources(&self) -> Option<&RenderResources> {
        match &self.state {
            EngineState::Allocated(resources) => Some(resources),
            _ => None,
        }
    }

    /// Get mutable reference to resources (only when allocated).
    pub fn resources_mut(&mut self) -> Option<&mut RenderResources> {
        match &mut self.state {
            EngineState::Allocated(resources) => Some(resources),
            _ => None,
        }
    }

    /// Build, prepare and start the signal source for `format`, then push
    /// the registry's current values into it.
    ///
    /// Valid from `Uninitialized` and `Deallocated`. On failure the state is
    /// unchanged and a later `allocate` may be retried.
    pub fn allocate(
        &mut self,
        format: RenderFormat,
        registry: &ParameterRegistry,
        mix_gain_address: Option<ParameterAddress>,
    ) -> RenderResult<()> {
        if self.state.is_allocated() {
            return Err(RenderError::InvalidState(
                "allocate called while resources are allocated",
            ));
        }

        if let Err(e) = format.validate() {
            log::warn!("Rejecting render format {:?}: {}", format, e);
            return Err(RenderError::UnsupportedFormat(e));
        }

        let mut source = (self.factory)(&format).map_err(allocation_failure)?;
        source.prepare(&format).map_err(allocation_failure)?;
        source.start();

        initialize_parameters(&mut *source, registry, mix_gain_address)?;

        log::info!(
            "Allocated render resources: {} Hz, {} channels, max {} frames",
            format.sample_rate,
            format.channel_count,
            format.max_frames
        );
        self.state = EngineState::Allocated(RenderResources { format, source });
        Ok(())
    }

    /// Stop and release the signal source. Never fails.
    ///
    /// A second call (or a call before any `allocate`) is a no-op.
    pub fn deallocate(&mut self) {
        let previous = std::mem::replace(&mut self.state, EngineState::Deallocated);
        match previous {
            EngineState::Allocated(mut resources) => {
                resources.source.stop();
                log::info!("Deallocated render resources");
            }
            EngineState::Uninitialized => {
                self.state = EngineState::Uninitialized;
            }
            EngineState::Deallocated => {}
        }
    }
}

/// Push every parameter's current value into the freshly started source.
///
/// Observers see their current value, and the mix gain parameter (if bound)
/// reaches `set_mix_gain`, so restored host state is audible from the first
/// rendered frame.
pub fn initialize_parameters(
    source: &mut dyn SignalSource,
    registry: &ParameterRegistry,
    mix_gain_address: Option<ParameterAddress>,
) -> RenderResult<()> {
    registry.publish_all();
    if let Some(address) = mix_gain_address {
        source.set_mix_gain(registry.get(address)?);
    }
    Ok(())
}

fn allocation_failure(err: RenderError) -> RenderError {
    let err = match err {
        RenderError::ResourceAllocationFailed(_) => err,
        other => RenderError::ResourceAllocationFailed(other.to_string()),
    };
    log::error!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_info::ParameterInfo;
    use crate::source::SilentSource;

    fn registry() -> ParameterRegistry {
        ParameterRegistry::new(&[ParameterInfo::new(0, "gain", "Gain").with_default(0.25)])
            .unwrap()
    }

    fn silent_factory() -> SourceFactory {
        Box::new(|_format: &RenderFormat| Ok(Box::new(SilentSource::new()) as Box<dyn SignalSource>))
    }

    #[test]
    fn test_allocate_and_deallocate() {
        let registry = registry();
        let mut lifecycle = LifecycleManager::new(silent_factory());
        assert_eq!(lifecycle.state().name(), "uninitialized");

        lifecycle
            .allocate(RenderFormat::default(), &registry, Some(0))
            .unwrap();
        assert!(lifecycle.state().is_allocated());
        assert!(lifecycle.resources().unwrap().source.is_running());

        lifecycle.deallocate();
        assert_eq!(lifecycle.state().name(), "deallocated");
        lifecycle.deallocate();
        assert_eq!(lifecycle.state().name(), "deallocated");

        lifecycle
            .allocate(RenderFormat::default(), &registry, None)
            .unwrap();
        assert!(lifecycle.state().is_allocated());
    }

    #[test]
    fn test_allocate_twice_rejected() {
        let registry = registry();
        let mut lifecycle = LifecycleManager::new(silent_factory());
        lifecycle
            .allocate(RenderFormat::default(), &registry, None)
            .unwrap();
        assert!(matches!(
            lifecycle.allocate(RenderFormat::default(), &registry, None),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_unsupported_format_leaves_state() {
        let registry = registry();
        let mut lifecycle = LifecycleManager::new(silent_factory());
        let result = lifecycle.allocate(RenderFormat::new(44100.0, 6, 512), &registry, None);
        assert!(matches!(result, Err(RenderError::UnsupportedFormat(_))));
        assert_eq!(lifecycle.state().name(), "uninitialized");
    }

    #[test]
    fn test_factory_failure_is_allocation_failure() {
        let registry = registry();
        let mut lifecycle = LifecycleManager::new(Box::new(|_format: &RenderFormat| {
            Err::<Box<dyn SignalSource>, _>(RenderError::StateError("no sample loaded".to_string()))
        }));
        let result = lifecycle.allocate(RenderFormat::default(), &registry, None);
        assert!(matches!(result, Err(RenderError::ResourceAllocationFailed(_))));
        assert!(!lifecycle.state().is_allocated());
    }

    #[test]
    fn test_deallocate_before_allocate_is_noop() {
        let mut lifecycle = LifecycleManager::new(silent_factory());
        lifecycle.deallocate();
        assert_eq!(lifecycle.state().name(), "uninitialized");
    }
}
