//! Fixed-capacity handle table.
//!
//! Maps small integer [`Handle`]s to open native devices. Each occupied slot
//! owns exactly one native resource together with its [`BlockingMode`] and at
//! most one pending diagnostic string.
//!
//! ## Rules
//! - Allocation takes the lowest free slot, so a closed handle's number is
//!   handed out again by the next open.
//! - A handle is valid only while its slot is occupied. Out-of-range and
//!   released handles resolve to [`HidError::InvalidHandle`] and nothing else
//!   happens.
//! - A full table reports [`HidError::CapacityExhausted`] before any native
//!   resource is acquired.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HidError, HidResult};

/// Opaque reference to one open device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(usize);

impl Handle {
    /// Rebuild a handle from its raw number.
    ///
    /// The result is only meaningful if it came from a live open; anything
    /// else resolves to [`HidError::InvalidHandle`].
    pub const fn from_raw(raw: usize) -> Self {
        Handle(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<Handle> for usize {
    fn from(h: Handle) -> usize {
        h.0
    }
}

/// How a read behaves when no report is pending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockingMode {
    /// Suspend the calling thread until data arrives or the device fails.
    #[default]
    Blocking,
    /// Return `Ok(0)` immediately when nothing has arrived.
    NonBlocking,
}

impl BlockingMode {
    pub fn from_nonblocking(nonblocking: bool) -> Self {
        if nonblocking {
            BlockingMode::NonBlocking
        } else {
            BlockingMode::Blocking
        }
    }

    pub fn is_blocking(self) -> bool {
        self == BlockingMode::Blocking
    }
}

/// One occupied table entry.
pub(crate) struct Slot<D> {
    pub device: D,
    pub mode: BlockingMode,
    last_error: Option<String>,
}

impl<D> Slot<D> {
    fn new(device: D, mode: BlockingMode) -> Self {
        Self {
            device,
            mode,
            last_error: None,
        }
    }

    /// Replace the pending diagnostic.
    pub fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Arena of device slots with first-free-slot reuse.
pub(crate) struct HandleTable<D> {
    slots: Vec<Option<Slot<D>>>,
}

impl<D> HandleTable<D> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Occupy the lowest free slot with the device produced by `open`.
    ///
    /// `open` runs only if a slot is free; if it fails the slot stays free.
    pub fn allocate_with<F>(&mut self, mode: BlockingMode, open: F) -> HidResult<Handle>
    where
        F: FnOnce() -> HidResult<D>,
    {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(HidError::CapacityExhausted {
                capacity: self.slots.len(),
            })?;
        let device = open()?;
        self.slots[index] = Some(Slot::new(device, mode));
        Ok(Handle(index))
    }

    pub fn get(&self, handle: Handle) -> HidResult<&Slot<D>> {
        self.slots
            .get(handle.0)
            .and_then(Option::as_ref)
            .ok_or(HidError::InvalidHandle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> HidResult<&mut Slot<D>> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or(HidError::InvalidHandle(handle))
    }

    /// Vacate the slot and hand back its contents.
    pub fn release(&mut self, handle: Handle) -> HidResult<Slot<D>> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::take)
            .ok_or(HidError::InvalidHandle(handle))
    }

    /// Handles of all occupied slots, lowest first.
    pub fn handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| Handle(i))
            .collect()
    }
}
