//! Entry points invoked by the command decoder, one per incoming command.
//!
//! Each returns the outcome of the synchronous part only. Results of
//! asynchronous operations reach the client later through exactly one return
//! command per accepted request.

use tracing::{debug, warn};

use gpuwire_core::object_table::ObjectTable;
use gpuwire_protocol::descriptor::{BufferDescriptor, MapMode};
use gpuwire_protocol::handle::{ObjectHandle, ObjectType, RequestSerial};

use crate::completion;
use crate::error::ServerError;
use crate::native::NativeGpu;
use crate::request::{AsyncRequest, MapTarget, PipelineTarget};
use crate::server::{KnownObjects, WireServer};

impl<N: NativeGpu> WireServer<N> {
    pub fn do_device_create_ready_compute_pipeline(
        &self,
        device: ObjectHandle,
        request_serial: RequestSerial,
        pipeline: ObjectHandle,
        descriptor: &N::ComputePipelineDescriptor,
    ) -> Result<(), ServerError> {
        let native_device = self.allocate_pending(device, pipeline, |objects| {
            &mut objects.compute_pipelines
        })?;

        let target = PipelineTarget { device, pipeline };
        let request = AsyncRequest::new(self.link(), request_serial, target);
        self.inner.procs.create_ready_compute_pipeline(
            &native_device,
            descriptor,
            Box::new(move |status, native, message| {
                completion::forward_create_ready_compute_pipeline(request, status, native, message)
            }),
        );

        debug!("compute pipeline {} requested ({})", pipeline, request_serial);
        self.inner.stats.record_accepted();
        Ok(())
    }

    pub fn do_device_create_ready_render_pipeline(
        &self,
        device: ObjectHandle,
        request_serial: RequestSerial,
        pipeline: ObjectHandle,
        descriptor: &N::RenderPipelineDescriptor,
    ) -> Result<(), ServerError> {
        let native_device = self.allocate_pending(device, pipeline, |objects| {
            &mut objects.render_pipelines
        })?;

        let target = PipelineTarget { device, pipeline };
        let request = AsyncRequest::new(self.link(), request_serial, target);
        self.inner.procs.create_ready_render_pipeline(
            &native_device,
            descriptor,
            Box::new(move |status, native, message| {
                completion::forward_create_ready_render_pipeline(request, status, native, message)
            }),
        );

        debug!("render pipeline {} requested ({})", pipeline, request_serial);
        self.inner.stats.record_accepted();
        Ok(())
    }

    pub fn do_device_pop_error_scope(
        &self,
        device: ObjectHandle,
        request_serial: RequestSerial,
    ) -> Result<(), ServerError> {
        let native_device = self.ready_device(device)?;

        let request = AsyncRequest::new(self.link(), request_serial, ());
        let started = self.inner.procs.pop_error_scope(
            &native_device,
            Box::new(move |error_type, message| {
                completion::forward_pop_error_scope(request, error_type, message)
            }),
        );
        // A refused pop dropped the callback, and the request with it.
        if !started {
            warn!("device {} has no error scope to pop ({})", device, request_serial);
            self.inner.stats.record_rejected();
            return Err(ServerError::NativeRejected {
                operation: "pop_error_scope",
            });
        }

        debug!("error scope pop requested on device {} ({})", device, request_serial);
        self.inner.stats.record_accepted();
        Ok(())
    }

    pub fn do_buffer_map_async(
        &self,
        buffer: ObjectHandle,
        request_serial: RequestSerial,
        mode: MapMode,
        offset: u64,
        size: u64,
    ) -> Result<(), ServerError> {
        let native_buffer = self.inner.state.lock().objects.buffers.get_ready(buffer).cloned();
        let native_buffer = native_buffer.inspect_err(|e| {
            warn!("map rejected: {}", e);
            self.inner.stats.record_rejected();
        })?;

        let target = MapTarget {
            buffer,
            mode,
            offset,
            size,
        };
        let request = AsyncRequest::new(self.link(), request_serial, target);
        self.inner.procs.buffer_map_async(
            &native_buffer,
            mode,
            offset,
            size,
            Box::new(move |status| completion::forward_buffer_map_async(request, status)),
        );

        debug!("buffer {} map {:?} [{}+{}] requested ({})", buffer, mode, offset, size, request_serial);
        self.inner.stats.record_accepted();
        Ok(())
    }

    pub fn do_queue_on_submitted_work_done(
        &self,
        device: ObjectHandle,
        request_serial: RequestSerial,
    ) -> Result<(), ServerError> {
        let native_device = self.ready_device(device)?;

        let request = AsyncRequest::new(self.link(), request_serial, ());
        self.inner.procs.queue_on_submitted_work_done(
            &native_device,
            Box::new(move |status| completion::forward_queue_work_done(request, status)),
        );

        debug!("work-done notification requested on device {} ({})", device, request_serial);
        self.inner.stats.record_accepted();
        Ok(())
    }

    /// Synchronous buffer creation. A native failure leaves the id free.
    pub fn do_device_create_buffer(
        &self,
        device: ObjectHandle,
        buffer: ObjectHandle,
        descriptor: &BufferDescriptor,
    ) -> Result<(), ServerError> {
        let native_device = self.allocate_pending(device, buffer, |objects| &mut objects.buffers)?;

        let created = self.inner.procs.create_buffer(&native_device, descriptor);

        let mut state = self.inner.state.lock();
        state.end_pending(device);
        match created {
            Some(native) => {
                if let Some(slot) = state.objects.buffers.get_mut(buffer.id) {
                    slot.set_ready(native);
                }
                debug!("created buffer {} ({} bytes)", buffer, descriptor.size);
                self.inner.stats.record_accepted();
                Ok(())
            }
            None => {
                state.objects.buffers.free(buffer.id);
                warn!("native buffer creation failed for {}", buffer);
                self.inner.stats.record_rejected();
                Err(ServerError::NativeCreationFailed {
                    kind: ObjectType::Buffer,
                    handle: buffer,
                })
            }
        }
    }

    /// Release the object `handle` refers to. The native object is dropped
    /// after the server lock is released.
    pub fn do_destroy_object(&self, kind: ObjectType, handle: ObjectHandle) -> Result<(), ServerError> {
        let mut state = self.inner.state.lock();
        match kind {
            ObjectType::Device => {
                let pending = state.pending_on(handle);
                if pending > 0 {
                    warn!("device {} destroy refused: {} objects pending", handle, pending);
                    self.inner.stats.record_rejected();
                    return Err(ServerError::DeviceBusy { handle, pending });
                }
                let device = state.objects.devices.free_ready(handle)?;
                drop(state);
                self.inner.procs.clear_device_callbacks(&device);
            }
            ObjectType::Buffer => {
                let buffer = state.objects.buffers.free_ready(handle)?;
                drop(state);
                drop(buffer);
            }
            ObjectType::ComputePipeline => {
                let pipeline = state.objects.compute_pipelines.free_ready(handle)?;
                drop(state);
                drop(pipeline);
            }
            ObjectType::RenderPipeline => {
                let pipeline = state.objects.render_pipelines.free_ready(handle)?;
                drop(state);
                drop(pipeline);
            }
        }
        debug!("destroyed {} {}", kind, handle);
        Ok(())
    }

    fn ready_device(&self, device: ObjectHandle) -> Result<N::Device, ServerError> {
        let native_device = self.inner.state.lock().objects.devices.get_ready(device).cloned();
        native_device.map_err(|e| {
            warn!("command rejected: {}", e);
            self.inner.stats.record_rejected();
            ServerError::from(e)
        })
    }

    /// Resolve the parent device and reserve the result slot, releasing the
    /// lock before the caller reaches the native API. Nothing is allocated if
    /// the device does not resolve. A successful reservation counts as pending
    /// on `device` until the slot is settled.
    fn allocate_pending<T>(
        &self,
        device: ObjectHandle,
        result: ObjectHandle,
        table: impl FnOnce(&mut KnownObjects<N>) -> &mut ObjectTable<T>,
    ) -> Result<N::Device, ServerError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let allocated = state
            .objects
            .devices
            .get_ready(device)
            .cloned()
            .map_err(ServerError::from)
            .and_then(|native_device| {
                table(&mut state.objects).allocate(result)?;
                Ok(native_device)
            });
        match &allocated {
            Ok(_) => state.begin_pending(device),
            Err(e) => {
                warn!("command rejected: {}", e);
                self.inner.stats.record_rejected();
            }
        }
        allocated
    }
}
