//! Parameter registry.
//!
//! [`ParameterRegistry`] maps stable addresses to range-bounded values. The
//! table is fixed at construction: parameters are never added or removed
//! afterwards, so lookups are a binary search over a sorted slice.
//!
//! # Thread Safety
//!
//! Values are stored as `f32` bits in an `AtomicU32`, so `get` and `set` are
//! lock-free and safe to call from the render thread. During a render pass
//! only the render thread writes values (single-writer discipline); control
//! thread changes reach it through the per-call event list.
//!
//! Change observers are installed once per address through a `OnceLock` and
//! invoked synchronously from `set`. An observer therefore runs on whichever
//! thread called `set` and must itself be real-time safe.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::parameter_info::ParameterInfo;
use crate::types::{ParameterAddress, ParameterValue};

/// Callback invoked with the new (clamped) value after every `set`.
pub type ChangeObserver = Box<dyn Fn(ParameterValue) + Send + Sync>;

struct ParameterSlot {
    info: ParameterInfo,
    value: AtomicU32,
    observer: OnceLock<ChangeObserver>,
}

impl ParameterSlot {
    fn new(info: ParameterInfo) -> Self {
        Self {
            info,
            value: AtomicU32::new(info.default.to_bits()),
            observer: OnceLock::new(),
        }
    }

    #[inline]
    fn load(&self) -> ParameterValue {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }

    #[inline]
    fn store(&self, value: ParameterValue) {
        self.value.store(value.to_bits(), Ordering::Release);
    }

    #[inline]
    fn notify(&self, value: ParameterValue) {
        if let Some(observer) = self.observer.get() {
            observer(value);
        }
    }
}

/// Fixed, address-keyed set of automatable values.
pub struct ParameterRegistry {
    // Sorted by address.
    slots: Vec<ParameterSlot>,
}

impl ParameterRegistry {
    /// Build a registry from a parameter table.
    ///
    /// Fails if two rows share an address or a row's range is malformed.
    pub fn new(table: &[ParameterInfo]) -> RenderResult<Self> {
        let mut infos = table.to_vec();
        infos.sort_by_key(|info| info.address);

        for pair in infos.windows(2) {
            if pair[0].address == pair[1].address {
                return Err(RenderError::DuplicateParameterAddress(pair[0].address));
            }
        }
        if let Some(info) = infos.iter().find(|info| !info.is_valid()) {
            return Err(RenderError::InvalidParameterRange(info.address));
        }

        Ok(Self {
            slots: infos.into_iter().map(ParameterSlot::new).collect(),
        })
    }

    #[inline]
    fn slot(&self, address: ParameterAddress) -> RenderResult<&ParameterSlot> {
        self.slots
            .binary_search_by_key(&address, |slot| slot.info.address)
            .map(|index| &self.slots[index])
            .map_err(|_| RenderError::InvalidParameterAddress(address))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry has no parameters.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `address` is registered.
    pub fn contains(&self, address: ParameterAddress) -> bool {
        self.slot(address).is_ok()
    }

    /// Metadata for `address`.
    pub fn info(&self, address: ParameterAddress) -> RenderResult<&ParameterInfo> {
        self.slot(address).map(|slot| &slot.info)
    }

    /// Metadata for every parameter, in address order.
    pub fn infos(&self) -> impl Iterator<Item = &ParameterInfo> {
        self.slots.iter().map(|slot| &slot.info)
    }

    /// Current value of `address`.
    #[inline]
    pub fn get(&self, address: ParameterAddress) -> RenderResult<ParameterValue> {
        self.slot(address).map(ParameterSlot::load)
    }

    /// Clamp, store and notify. Returns the stored value.
    ///
    /// Real-time safe as long as the installed observer is.
    #[inline]
    pub fn set(&self, address: ParameterAddress, value: ParameterValue) -> RenderResult<ParameterValue> {
        let slot = self.slot(address)?;
        let clamped = slot.info.clamp(value);
        slot.store(clamped);
        slot.notify(clamped);
        Ok(clamped)
    }

    /// Install the change observer for `address`.
    ///
    /// One observer per address for the lifetime of the registry; a second
    /// install fails with [`RenderError::ObserverAlreadyInstalled`].
    pub fn observe_changes<F>(&self, address: ParameterAddress, observer: F) -> RenderResult<()>
    where
        F: Fn(ParameterValue) + Send + Sync + 'static,
    {
        let slot = self.slot(address)?;
        slot.observer
            .set(Box::new(observer))
            .map_err(|_| RenderError::ObserverAlreadyInstalled(address))
    }

    /// Invoke every observer with its parameter's current value.
    ///
    /// Called when render resources are allocated so the signal chain picks
    /// up restored state before the first explicit change.
    pub fn publish_all(&self) {
        for slot in &self.slots {
            slot.notify(slot.load());
        }
    }

    /// Set every parameter back to its default, notifying observers.
    pub fn reset_to_defaults(&self) {
        for slot in &self.slots {
            slot.store(slot.info.default);
            slot.notify(slot.info.default);
        }
    }

    /// Capture every current value.
    pub fn snapshot(&self) -> ParameterState {
        ParameterState {
            values: self
                .slots
                .iter()
                .map(|slot| (slot.info.address, slot.load()))
                .collect(),
        }
    }

    /// Apply a saved snapshot. Control thread only.
    ///
    /// Addresses the registry does not know are skipped with a warning so
    /// state saved by a newer build still loads. Returns how many values
    /// were applied.
    pub fn restore(&self, state: &ParameterState) -> usize {
        let mut applied = 0;
        for (&address, &value) in &state.values {
            match self.set(address, value) {
                Ok(_) => applied += 1,
                Err(e) => log::warn!("Skipping saved parameter: {}", e),
            }
        }
        log::debug!("Restored {} of {} saved parameters", applied, state.values.len());
        applied
    }
}

impl fmt::Debug for ParameterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|slot| (slot.info.identifier, slot.load())))
            .finish()
    }
}

/// Serializable snapshot of parameter values, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub values: BTreeMap<ParameterAddress, ParameterValue>,
}

impl ParameterState {
    /// Serialize to JSON.
    pub fn to_json(&self) -> RenderResult<String> {
        serde_json::to_string(self)
            .map_err(|e| RenderError::StateError(format!("cannot serialize parameters: {}", e)))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RenderError::StateError(format!("invalid parameter state: {}", e)))
    }
}
