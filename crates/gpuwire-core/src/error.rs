use gpuwire_protocol::handle::{ObjectHandle, ObjectType};

/// Why an object table refused to allocate a slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("{kind} id {id} is already in use")]
    InUse { kind: ObjectType, id: u32 },

    #[error("{kind} id {id} is outside the table range (max {max})")]
    OutOfRange { kind: ObjectType, id: u32, max: u32 },

    #[error("{kind} handle {handle} is stale: expected generation {expected} or later")]
    StaleGeneration {
        kind: ObjectType,
        handle: ObjectHandle,
        expected: u32,
    },

    #[error("{kind} id {id} has exhausted its generations")]
    GenerationExhausted { kind: ObjectType, id: u32 },
}

/// Why a handle could not be resolved to a usable object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("unknown {kind} handle {handle}")]
    Unknown { kind: ObjectType, handle: ObjectHandle },

    #[error("{kind} handle {handle} is stale (slot is at generation {current})")]
    StaleGeneration {
        kind: ObjectType,
        handle: ObjectHandle,
        current: u32,
    },

    #[error("{kind} {handle} is not ready yet")]
    NotReady { kind: ObjectType, handle: ObjectHandle },
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
