use serde::{Deserialize, Serialize};

use crate::handle::{ObjectHandle, RequestSerial};
use crate::status::{BufferMapStatus, CreatePipelineStatus, ErrorType, QueueWorkDoneStatus};

/// Server-to-client message reporting the outcome of a request or an
/// unsolicited device event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
         rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum ReturnCommand {
    // ── Unsolicited device events ───────────────────────────
    DeviceUncapturedErrorCallback {
        error_type: ErrorType,
        message: String,
    },
    DeviceLostCallback {
        message: String,
    },

    // ── Serial-correlated results ───────────────────────────
    DevicePopErrorScopeCallback {
        request_serial: RequestSerial,
        error_type: ErrorType,
        message: String,
    },
    DeviceCreateReadyComputePipelineCallback {
        request_serial: RequestSerial,
        status: CreatePipelineStatus,
        message: String,
    },
    DeviceCreateReadyRenderPipelineCallback {
        request_serial: RequestSerial,
        status: CreatePipelineStatus,
        message: String,
    },
    BufferMapAsyncCallback {
        buffer: ObjectHandle,
        request_serial: RequestSerial,
        status: BufferMapStatus,
        /// Contents of the mapped range, present for successful read maps.
        initial_data: Option<Vec<u8>>,
    },
    QueueWorkDoneCallback {
        request_serial: RequestSerial,
        status: QueueWorkDoneStatus,
    },
}

impl ReturnCommand {
    /// The serial this command resolves, if it answers a client request.
    pub fn request_serial(&self) -> Option<RequestSerial> {
        match self {
            ReturnCommand::DeviceUncapturedErrorCallback { .. }
            | ReturnCommand::DeviceLostCallback { .. } => None,
            ReturnCommand::DevicePopErrorScopeCallback { request_serial, .. }
            | ReturnCommand::DeviceCreateReadyComputePipelineCallback { request_serial, .. }
            | ReturnCommand::DeviceCreateReadyRenderPipelineCallback { request_serial, .. }
            | ReturnCommand::BufferMapAsyncCallback { request_serial, .. }
            | ReturnCommand::QueueWorkDoneCallback { request_serial, .. } => Some(*request_serial),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReturnCommand::DeviceUncapturedErrorCallback { .. } => "DeviceUncapturedErrorCallback",
            ReturnCommand::DeviceLostCallback { .. } => "DeviceLostCallback",
            ReturnCommand::DevicePopErrorScopeCallback { .. } => "DevicePopErrorScopeCallback",
            ReturnCommand::DeviceCreateReadyComputePipelineCallback { .. } => {
                "DeviceCreateReadyComputePipelineCallback"
            }
            ReturnCommand::DeviceCreateReadyRenderPipelineCallback { .. } => {
                "DeviceCreateReadyRenderPipelineCallback"
            }
            ReturnCommand::BufferMapAsyncCallback { .. } => "BufferMapAsyncCallback",
            ReturnCommand::QueueWorkDoneCallback { .. } => "QueueWorkDoneCallback",
        }
    }
}
