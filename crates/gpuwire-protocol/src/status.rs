use serde::{Deserialize, Serialize};

/// Outcome of an asynchronous pipeline creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum CreatePipelineStatus {
    Success,
    Error,
    DeviceLost,
    DeviceDestroyed,
    Unknown,
}

/// Error classification reported by error scopes and uncaptured errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ErrorType {
    NoError,
    Validation,
    OutOfMemory,
    Unknown,
    DeviceLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum BufferMapStatus {
    Success,
    Error,
    Unknown,
    DeviceLost,
    DestroyedBeforeCallback,
    UnmappedBeforeCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum QueueWorkDoneStatus {
    Success,
    Error,
    Unknown,
    DeviceLost,
}
