use gpuwire_protocol::handle::{ObjectHandle, ObjectType};
use tracing::trace;

use crate::error::{AllocationError, LookupError};

/// Lifecycle of a single slot.
#[derive(Debug)]
pub enum SlotState<T> {
    /// Available for allocation.
    Free,
    /// Allocated by the client, native construction still outstanding.
    Pending,
    /// Backed by a live native object.
    Ready(T),
    /// Free, but the generation counter ran out; the id can never be reused.
    Retired,
}

/// Payload-free view of a slot's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Free { next_generation: u32 },
    Pending { generation: u32 },
    Ready { generation: u32 },
    Retired,
}

/// One entry of an [`ObjectTable`].
#[derive(Debug)]
pub struct ObjectData<T> {
    /// For a live slot, the generation it was allocated with. For a free slot,
    /// the lowest generation the next allocation at this id may carry.
    generation: u32,
    state: SlotState<T>,
}

impl<T> ObjectData<T> {
    fn new() -> Self {
        Self {
            generation: 0,
            state: SlotState::Free,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn state(&self) -> &SlotState<T> {
        &self.state
    }

    pub fn status(&self) -> SlotStatus {
        let generation = self.generation;
        match self.state {
            SlotState::Free => SlotStatus::Free { next_generation: generation },
            SlotState::Pending => SlotStatus::Pending { generation },
            SlotState::Ready(_) => SlotStatus::Ready { generation },
            SlotState::Retired => SlotStatus::Retired,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, SlotState::Pending | SlotState::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SlotState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SlotState::Ready(_))
    }

    /// The native object, once construction has resolved successfully.
    pub fn native(&self) -> Option<&T> {
        match &self.state {
            SlotState::Ready(native) => Some(native),
            _ => None,
        }
    }

    /// True when this slot is live and was allocated with `handle`'s generation.
    pub fn matches(&self, handle: ObjectHandle) -> bool {
        self.is_live() && self.generation == handle.generation
    }

    /// Promote a pending slot to ready.
    pub fn set_ready(&mut self, native: T) {
        debug_assert!(self.is_pending(), "set_ready on a slot that is not pending");
        self.state = SlotState::Ready(native);
    }
}

/// Generation-tagged slot storage for one object type, indexed by the
/// client-chosen id.
pub struct ObjectTable<T> {
    kind: ObjectType,
    slots: Vec<ObjectData<T>>,
    max_objects: u32,
    live: usize,
}

/// Upper bound on ids any table accepts, whatever the configuration asks for.
pub const MAX_TABLE_CAPACITY: u32 = 1 << 20;

impl<T> ObjectTable<T> {
    /// Ids at or above `max_objects` are rejected. Clamped to [`MAX_TABLE_CAPACITY`].
    pub fn new(kind: ObjectType, max_objects: u32) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            max_objects: max_objects.min(MAX_TABLE_CAPACITY),
            live: 0,
        }
    }

    pub fn kind(&self) -> ObjectType {
        self.kind
    }

    /// Allocate the slot at `handle.id` in the pending state.
    ///
    /// The handle's generation must be at least the slot's next generation so
    /// that a reused id can never alias a reference to an earlier object.
    pub fn allocate(&mut self, handle: ObjectHandle) -> Result<&mut ObjectData<T>, AllocationError> {
        let kind = self.kind;
        let id = handle.id;
        if id >= self.max_objects {
            return Err(AllocationError::OutOfRange {
                kind,
                id,
                max: self.max_objects,
            });
        }

        let index = id as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, ObjectData::new);
        }

        let slot = &mut self.slots[index];
        match slot.state {
            SlotState::Pending | SlotState::Ready(_) => {
                return Err(AllocationError::InUse { kind, id });
            }
            SlotState::Retired => {
                return Err(AllocationError::GenerationExhausted { kind, id });
            }
            SlotState::Free => {}
        }
        if handle.generation < slot.generation {
            return Err(AllocationError::StaleGeneration {
                kind,
                handle,
                expected: slot.generation,
            });
        }

        slot.generation = handle.generation;
        slot.state = SlotState::Pending;
        self.live += 1;
        trace!(%kind, %handle, "slot allocated");
        Ok(slot)
    }

    /// The slot at `id` in whatever state it is in.
    pub fn get(&self, id: u32) -> Option<&ObjectData<T>> {
        self.slots.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut ObjectData<T>> {
        self.slots.get_mut(id as usize)
    }

    /// Resolve `handle` to its native object, checking generation and state.
    pub fn get_ready(&self, handle: ObjectHandle) -> Result<&T, LookupError> {
        let kind = self.kind;
        let slot = self
            .get(handle.id)
            .filter(|slot| slot.is_live())
            .ok_or(LookupError::Unknown { kind, handle })?;
        if slot.generation != handle.generation {
            return Err(LookupError::StaleGeneration {
                kind,
                handle,
                current: slot.generation,
            });
        }
        slot.native().ok_or(LookupError::NotReady { kind, handle })
    }

    /// Return the slot at `id` to the free state, handing back its native
    /// object if it had one. Freeing a slot that is not live does nothing.
    pub fn free(&mut self, id: u32) -> Option<T> {
        let slot = self.slots.get_mut(id as usize)?;
        if !slot.is_live() {
            return None;
        }

        let previous = std::mem::replace(&mut slot.state, SlotState::Free);
        match slot.generation.checked_add(1) {
            Some(next) => slot.generation = next,
            None => slot.state = SlotState::Retired,
        }
        self.live -= 1;
        trace!(kind = %self.kind, id, next_generation = slot.generation, "slot freed");

        match previous {
            SlotState::Ready(native) => Some(native),
            _ => None,
        }
    }

    /// Destroy the ready object `handle` refers to, handing back its native
    /// object. Pending slots are refused so an outstanding completion always
    /// finds the slot it was issued for.
    pub fn free_ready(&mut self, handle: ObjectHandle) -> Result<T, LookupError> {
        self.get_ready(handle)?;
        match self.free(handle.id) {
            Some(native) => Ok(native),
            None => Err(LookupError::Unknown {
                kind: self.kind,
                handle,
            }),
        }
    }

    /// Status of the slot at `id`; ids never touched report a fresh free slot.
    pub fn status(&self, id: u32) -> SlotStatus {
        self.get(id)
            .map_or(SlotStatus::Free { next_generation: 0 }, ObjectData::status)
    }

    /// Lowest generation an allocation at `id` would currently accept, or
    /// the live generation if the slot is in use.
    pub fn next_generation(&self, id: u32) -> u32 {
        self.get(id).map_or(0, |slot| slot.generation)
    }

    /// Number of pending or ready slots.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Free every live slot, returning the native objects that were ready.
    pub fn drain(&mut self) -> Vec<(ObjectHandle, T)> {
        let mut natives = Vec::new();
        for id in 0..self.slots.len() {
            let id = id as u32;
            let generation = self.slots[id as usize].generation;
            if let Some(native) = self.free(id) {
                natives.push((ObjectHandle::new(id, generation), native));
            }
        }
        natives
    }
}
