//! Completion handlers for native callbacks.
//!
//! The `forward_*` functions are the fixed-signature adapters the native
//! callbacks are built from. They take back the request, gate on the
//! liveness witness, and re-dispatch onto the server. Nothing here runs once
//! teardown has begun.

use tracing::{debug, error};

use gpuwire_core::object_table::ObjectTable;
use gpuwire_protocol::commands::ReturnCommand;
use gpuwire_protocol::descriptor::MapMode;
use gpuwire_protocol::handle::ObjectHandle;
use gpuwire_protocol::status::{BufferMapStatus, CreatePipelineStatus, ErrorType, QueueWorkDoneStatus};

use crate::native::NativeGpu;
use crate::request::{ErrorScopeRequest, MapRequest, PipelineRequest, ServerLink, WorkDoneRequest};
use crate::server::ServerInner;

pub(crate) fn forward_create_ready_compute_pipeline<N: NativeGpu>(
    request: Box<PipelineRequest<N>>,
    status: CreatePipelineStatus,
    pipeline: Option<N::ComputePipeline>,
    message: String,
) {
    request.link().with_live(|server| {
        server.on_create_ready_compute_pipeline(status, pipeline, message, &request)
    });
}

pub(crate) fn forward_create_ready_render_pipeline<N: NativeGpu>(
    request: Box<PipelineRequest<N>>,
    status: CreatePipelineStatus,
    pipeline: Option<N::RenderPipeline>,
    message: String,
) {
    request.link().with_live(|server| {
        server.on_create_ready_render_pipeline(status, pipeline, message, &request)
    });
}

pub(crate) fn forward_pop_error_scope<N: NativeGpu>(
    request: Box<ErrorScopeRequest<N>>,
    error_type: ErrorType,
    message: String,
) {
    request
        .link()
        .with_live(|server| server.on_pop_error_scope(error_type, message, &request));
}

pub(crate) fn forward_buffer_map_async<N: NativeGpu>(request: Box<MapRequest<N>>, status: BufferMapStatus) {
    request.link().with_live(|server| server.on_buffer_map_async(status, &request));
}

pub(crate) fn forward_queue_work_done<N: NativeGpu>(
    request: Box<WorkDoneRequest<N>>,
    status: QueueWorkDoneStatus,
) {
    request.link().with_live(|server| server.on_queue_work_done(status, &request));
}

pub(crate) fn forward_uncaptured_error<N: NativeGpu>(
    link: &ServerLink<N>,
    error_type: ErrorType,
    message: String,
) {
    link.with_live(|server| server.on_uncaptured_error(error_type, message));
}

pub(crate) fn forward_device_lost<N: NativeGpu>(link: &ServerLink<N>, message: String) {
    link.with_live(|server| server.on_device_lost(message));
}

/// Settle the pending slot a pipeline request was issued for.
fn resolve_pending_pipeline<T>(
    table: &mut ObjectTable<T>,
    target: ObjectHandle,
    status: CreatePipelineStatus,
    native: Option<T>,
) {
    let kind = table.kind();
    let pending = table
        .get_mut(target.id)
        .filter(|slot| slot.is_pending() && slot.matches(target));
    let Some(slot) = pending else {
        error!("{} completion for {} found no pending slot", kind, target);
        panic!("{kind} {target} resolved twice or without allocation");
    };

    match status {
        CreatePipelineStatus::Success => {
            let Some(native) = native else {
                error!("{} {} reported success without a native object", kind, target);
                panic!("successful {kind} creation returned no native object");
            };
            slot.set_ready(native);
        }
        CreatePipelineStatus::Error => {
            table.free(target.id);
        }
        // The server is always torn down before its device, so a device
        // cannot disappear while one of its pipelines is pending.
        CreatePipelineStatus::DeviceLost
        | CreatePipelineStatus::DeviceDestroyed
        | CreatePipelineStatus::Unknown => {
            error!("{} {} completed with {:?} while the server was alive", kind, target, status);
            unreachable!("{kind} creation completed with {status:?} before server teardown");
        }
    }
}

impl<N: NativeGpu> ServerInner<N> {
    pub(crate) fn on_create_ready_compute_pipeline(
        &self,
        status: CreatePipelineStatus,
        pipeline: Option<N::ComputePipeline>,
        message: String,
        request: &PipelineRequest<N>,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let target = *request.payload();
        resolve_pending_pipeline(&mut state.objects.compute_pipelines, target.pipeline, status, pipeline);
        state.end_pending(target.device);
        debug!("compute pipeline {} resolved: {:?} ({})", target.pipeline, status, request.serial());

        self.emit(
            state,
            ReturnCommand::DeviceCreateReadyComputePipelineCallback {
                request_serial: request.serial(),
                status,
                message,
            },
        );
    }

    pub(crate) fn on_create_ready_render_pipeline(
        &self,
        status: CreatePipelineStatus,
        pipeline: Option<N::RenderPipeline>,
        message: String,
        request: &PipelineRequest<N>,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let target = *request.payload();
        resolve_pending_pipeline(&mut state.objects.render_pipelines, target.pipeline, status, pipeline);
        state.end_pending(target.device);
        debug!("render pipeline {} resolved: {:?} ({})", target.pipeline, status, request.serial());

        self.emit(
            state,
            ReturnCommand::DeviceCreateReadyRenderPipelineCallback {
                request_serial: request.serial(),
                status,
                message,
            },
        );
    }

    pub(crate) fn on_pop_error_scope(
        &self,
        error_type: ErrorType,
        message: String,
        request: &ErrorScopeRequest<N>,
    ) {
        let mut state = self.state.lock();
        debug!("error scope popped: {:?} ({})", error_type, request.serial());
        self.emit(
            &mut state,
            ReturnCommand::DevicePopErrorScopeCallback {
                request_serial: request.serial(),
                error_type,
                message,
            },
        );
    }

    pub(crate) fn on_buffer_map_async(&self, status: BufferMapStatus, request: &MapRequest<N>) {
        let mut state = self.state.lock();
        let target = *request.payload();

        // Only a buffer that is still the one the map was issued on has
        // contents worth sending back.
        let initial_data = if status == BufferMapStatus::Success && target.mode.contains(MapMode::READ) {
            state
                .objects
                .buffers
                .get_ready(target.buffer)
                .ok()
                .and_then(|buffer| self.procs.buffer_read_mapped(buffer, target.offset, target.size))
        } else {
            None
        };
        debug!("buffer {} map resolved: {:?} ({})", target.buffer, status, request.serial());

        self.emit(
            &mut state,
            ReturnCommand::BufferMapAsyncCallback {
                buffer: target.buffer,
                request_serial: request.serial(),
                status,
                initial_data,
            },
        );
    }

    pub(crate) fn on_queue_work_done(&self, status: QueueWorkDoneStatus, request: &WorkDoneRequest<N>) {
        let mut state = self.state.lock();
        debug!("queue work done: {:?} ({})", status, request.serial());
        self.emit(
            &mut state,
            ReturnCommand::QueueWorkDoneCallback {
                request_serial: request.serial(),
                status,
            },
        );
    }

    pub(crate) fn on_uncaptured_error(&self, error_type: ErrorType, message: String) {
        let mut state = self.state.lock();
        debug!("uncaptured {:?} error: {}", error_type, message);
        self.emit(
            &mut state,
            ReturnCommand::DeviceUncapturedErrorCallback { error_type, message },
        );
    }

    pub(crate) fn on_device_lost(&self, message: String) {
        let mut state = self.state.lock();
        error!("device lost: {}", message);
        self.emit(&mut state, ReturnCommand::DeviceLostCallback { message });
    }
}
