//! The seam to the real GPU API.
//!
//! Asynchronous entry points take a boxed `FnOnce` that owns everything the
//! server needs to resume the request. The native side may run it on any
//! thread, reentrantly from inside the entry point, or much later, but it
//! can only run it once.

use gpuwire_protocol::descriptor::{BufferDescriptor, MapMode};
use gpuwire_protocol::status::{BufferMapStatus, CreatePipelineStatus, ErrorType, QueueWorkDoneStatus};

pub type CreatePipelineCallback<P> = Box<dyn FnOnce(CreatePipelineStatus, Option<P>, String) + Send>;
pub type PopErrorScopeCallback = Box<dyn FnOnce(ErrorType, String) + Send>;
pub type BufferMapCallback = Box<dyn FnOnce(BufferMapStatus) + Send>;
pub type QueueWorkDoneCallback = Box<dyn FnOnce(QueueWorkDoneStatus) + Send>;
pub type UncapturedErrorCallback = Box<dyn Fn(ErrorType, String) + Send + Sync>;
pub type DeviceLostCallback = Box<dyn Fn(String) + Send + Sync>;

/// Native GPU procedures the server drives on behalf of the client.
pub trait NativeGpu: Send + Sync + 'static {
    /// Device handles are cloned out of the object table so the table lock
    /// is never held across a native call.
    type Device: Clone + Send + Sync + 'static;
    type Buffer: Clone + Send + Sync + 'static;
    type ComputePipeline: Send + 'static;
    type RenderPipeline: Send + 'static;
    /// Already decoded and resolved by the command decoder.
    type ComputePipelineDescriptor;
    type RenderPipelineDescriptor;

    fn create_ready_compute_pipeline(
        &self,
        device: &Self::Device,
        descriptor: &Self::ComputePipelineDescriptor,
        callback: CreatePipelineCallback<Self::ComputePipeline>,
    );

    fn create_ready_render_pipeline(
        &self,
        device: &Self::Device,
        descriptor: &Self::RenderPipelineDescriptor,
        callback: CreatePipelineCallback<Self::RenderPipeline>,
    );

    /// Returns false, dropping `callback` unrun, when there is no error
    /// scope to pop.
    fn pop_error_scope(&self, device: &Self::Device, callback: PopErrorScopeCallback) -> bool;

    fn buffer_map_async(
        &self,
        buffer: &Self::Buffer,
        mode: MapMode,
        offset: u64,
        size: u64,
        callback: BufferMapCallback,
    );

    /// Copy out a mapped range. Called with server state locked; must not
    /// call back into the server.
    fn buffer_read_mapped(&self, buffer: &Self::Buffer, offset: u64, size: u64) -> Option<Vec<u8>>;

    fn queue_on_submitted_work_done(&self, device: &Self::Device, callback: QueueWorkDoneCallback);

    fn create_buffer(&self, device: &Self::Device, descriptor: &BufferDescriptor) -> Option<Self::Buffer>;

    fn set_uncaptured_error_callback(&self, device: &Self::Device, callback: Option<UncapturedErrorCallback>);

    fn set_device_lost_callback(&self, device: &Self::Device, callback: Option<DeviceLostCallback>);

    /// Unregister both device callbacks.
    fn clear_device_callbacks(&self, device: &Self::Device) {
        self.set_uncaptured_error_callback(device, None);
        self.set_device_lost_callback(device, None);
    }
}
