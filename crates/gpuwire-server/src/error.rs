use gpuwire_core::error::{AllocationError, LookupError};
use gpuwire_protocol::handle::{ObjectHandle, ObjectType};
use gpuwire_protocol::wire::WireError;

/// Synchronous failure of a dispatch entry point. The decoder treats any of
/// these as a malformed command stream.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("native API refused to start {operation}")]
    NativeRejected { operation: &'static str },

    #[error("native API failed to create {kind} {handle}")]
    NativeCreationFailed { kind: ObjectType, handle: ObjectHandle },

    #[error("device {handle} still has {pending} pending objects")]
    DeviceBusy { handle: ObjectHandle, pending: usize },

    #[error("wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("return stream disconnected")]
    Disconnected,
}
