//! Scripted native GPU for driving the wire server in tests.
//!
//! Asynchronous callbacks are parked until a test fires them, unless
//! immediate completion is switched on.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use gpuwire_core::config::ServerConfig;
use gpuwire_protocol::commands::ReturnCommand;
use gpuwire_protocol::descriptor::{BufferDescriptor, MapMode};
use gpuwire_protocol::handle::ObjectHandle;
use gpuwire_protocol::status::{BufferMapStatus, CreatePipelineStatus, ErrorType, QueueWorkDoneStatus};
use gpuwire_protocol::wire;
use gpuwire_server::native::{
    BufferMapCallback, CreatePipelineCallback, DeviceLostCallback, NativeGpu, PopErrorScopeCallback,
    QueueWorkDoneCallback, UncapturedErrorCallback,
};
use gpuwire_server::{FrameSerializer, WireServer};

pub const DEVICE: ObjectHandle = ObjectHandle::new(1, 0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBuffer(pub u64);

#[derive(Debug, PartialEq, Eq)]
pub struct MockPipeline(pub u64);

pub struct PipelineDesc {
    pub label: &'static str,
}

pub const DESC: PipelineDesc = PipelineDesc { label: "test" };

#[derive(Default)]
struct MockState {
    compute: VecDeque<CreatePipelineCallback<MockPipeline>>,
    render: VecDeque<CreatePipelineCallback<MockPipeline>>,
    error_scopes: VecDeque<PopErrorScopeCallback>,
    maps: VecDeque<BufferMapCallback>,
    work_done: VecDeque<QueueWorkDoneCallback>,
    uncaptured: HashMap<u32, UncapturedErrorCallback>,
    lost: HashMap<u32, DeviceLostCallback>,
    open_error_scopes: u32,
    immediate_pipelines: Option<CreatePipelineStatus>,
    fail_buffer_creation: bool,
    buffer_contents: HashMap<u64, Vec<u8>>,
    next_native: u64,
    native_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockGpu {
    state: Arc<Mutex<MockState>>,
}

fn fire_pipeline(
    callback: CreatePipelineCallback<MockPipeline>,
    status: CreatePipelineStatus,
    native_id: u64,
    message: &str,
) {
    let native = (status == CreatePipelineStatus::Success).then_some(MockPipeline(native_id));
    callback(status, native, message.to_string());
}

impl MockGpu {
    fn next_native(&self) -> u64 {
        let mut state = self.state.lock();
        state.next_native += 1;
        state.next_native
    }

    pub fn native_calls(&self) -> usize {
        self.state.lock().native_calls
    }

    pub fn pending_compute(&self) -> usize {
        self.state.lock().compute.len()
    }

    pub fn pending_error_scopes(&self) -> usize {
        self.state.lock().error_scopes.len()
    }

    /// Complete pipelines from inside the create call itself.
    pub fn set_immediate_pipelines(&self, status: Option<CreatePipelineStatus>) {
        self.state.lock().immediate_pipelines = status;
    }

    pub fn set_fail_buffer_creation(&self, fail: bool) {
        self.state.lock().fail_buffer_creation = fail;
    }

    pub fn take_compute(&self) -> Option<CreatePipelineCallback<MockPipeline>> {
        self.state.lock().compute.pop_front()
    }

    /// Resolve the oldest outstanding compute pipeline request.
    pub fn complete_compute(&self, status: CreatePipelineStatus, message: &str) {
        let callback = self.take_compute().expect("no pending compute pipeline");
        fire_pipeline(callback, status, self.next_native(), message);
    }

    /// Resolve the newest outstanding compute pipeline request.
    pub fn complete_compute_last(&self, status: CreatePipelineStatus, message: &str) {
        let callback = self
            .state
            .lock()
            .compute
            .pop_back()
            .expect("no pending compute pipeline");
        fire_pipeline(callback, status, self.next_native(), message);
    }

    pub fn complete_render(&self, status: CreatePipelineStatus, message: &str) {
        let callback = self
            .state
            .lock()
            .render
            .pop_front()
            .expect("no pending render pipeline");
        fire_pipeline(callback, status, self.next_native(), message);
    }

    pub fn push_error_scope(&self) {
        self.state.lock().open_error_scopes += 1;
    }

    pub fn complete_error_scope(&self, error_type: ErrorType, message: &str) {
        let callback = self
            .state
            .lock()
            .error_scopes
            .pop_front()
            .expect("no pending error scope pop");
        callback(error_type, message.to_string());
    }

    pub fn complete_map(&self, status: BufferMapStatus) {
        let callback = self.state.lock().maps.pop_front().expect("no pending map");
        callback(status);
    }

    pub fn complete_work_done(&self, status: QueueWorkDoneStatus) {
        let callback = self
            .state
            .lock()
            .work_done
            .pop_front()
            .expect("no pending work-done request");
        callback(status);
    }

    pub fn write_buffer(&self, buffer: &MockBuffer, data: &[u8]) {
        self.state
            .lock()
            .buffer_contents
            .insert(buffer.0, data.to_vec());
    }

    /// Report an uncaptured error on `device`. Returns false if the server
    /// has no callback registered.
    pub fn raise_uncaptured_error(&self, device: u32, error_type: ErrorType, message: &str) -> bool {
        let callback = self.state.lock().uncaptured.remove(&device);
        let Some(callback) = callback else {
            return false;
        };
        callback(error_type, message.to_string());
        self.state.lock().uncaptured.entry(device).or_insert(callback);
        true
    }

    pub fn lose_device(&self, device: u32, message: &str) -> bool {
        let callback = self.state.lock().lost.remove(&device);
        let Some(callback) = callback else {
            return false;
        };
        callback(message.to_string());
        self.state.lock().lost.entry(device).or_insert(callback);
        true
    }

    pub fn has_device_callbacks(&self, device: u32) -> bool {
        let state = self.state.lock();
        state.uncaptured.contains_key(&device) || state.lost.contains_key(&device)
    }
}

impl NativeGpu for MockGpu {
    type Device = MockDevice;
    type Buffer = MockBuffer;
    type ComputePipeline = MockPipeline;
    type RenderPipeline = MockPipeline;
    type ComputePipelineDescriptor = PipelineDesc;
    type RenderPipelineDescriptor = PipelineDesc;

    fn create_ready_compute_pipeline(
        &self,
        _device: &MockDevice,
        descriptor: &PipelineDesc,
        callback: CreatePipelineCallback<MockPipeline>,
    ) {
        let immediate = {
            let mut state = self.state.lock();
            state.native_calls += 1;
            state.immediate_pipelines
        };
        match immediate {
            Some(status) => fire_pipeline(callback, status, self.next_native(), descriptor.label),
            None => self.state.lock().compute.push_back(callback),
        }
    }

    fn create_ready_render_pipeline(
        &self,
        _device: &MockDevice,
        descriptor: &PipelineDesc,
        callback: CreatePipelineCallback<MockPipeline>,
    ) {
        let immediate = {
            let mut state = self.state.lock();
            state.native_calls += 1;
            state.immediate_pipelines
        };
        match immediate {
            Some(status) => fire_pipeline(callback, status, self.next_native(), descriptor.label),
            None => self.state.lock().render.push_back(callback),
        }
    }

    fn pop_error_scope(&self, _device: &MockDevice, callback: PopErrorScopeCallback) -> bool {
        let mut state = self.state.lock();
        state.native_calls += 1;
        if state.open_error_scopes == 0 {
            return false;
        }
        state.open_error_scopes -= 1;
        state.error_scopes.push_back(callback);
        true
    }

    fn buffer_map_async(
        &self,
        _buffer: &MockBuffer,
        _mode: MapMode,
        _offset: u64,
        _size: u64,
        callback: BufferMapCallback,
    ) {
        let mut state = self.state.lock();
        state.native_calls += 1;
        state.maps.push_back(callback);
    }

    fn buffer_read_mapped(&self, buffer: &MockBuffer, offset: u64, size: u64) -> Option<Vec<u8>> {
        let state = self.state.lock();
        let contents = state.buffer_contents.get(&buffer.0)?;
        let start = offset as usize;
        let end = start.checked_add(size as usize)?;
        contents.get(start..end).map(<[u8]>::to_vec)
    }

    fn queue_on_submitted_work_done(&self, _device: &MockDevice, callback: QueueWorkDoneCallback) {
        let mut state = self.state.lock();
        state.native_calls += 1;
        state.work_done.push_back(callback);
    }

    fn create_buffer(&self, _device: &MockDevice, descriptor: &BufferDescriptor) -> Option<MockBuffer> {
        if self.state.lock().fail_buffer_creation {
            return None;
        }
        let id = self.next_native();
        self.state
            .lock()
            .buffer_contents
            .insert(id, vec![0; descriptor.size as usize]);
        Some(MockBuffer(id))
    }

    fn set_uncaptured_error_callback(&self, device: &MockDevice, callback: Option<UncapturedErrorCallback>) {
        let mut state = self.state.lock();
        match callback {
            Some(callback) => {
                state.uncaptured.insert(device.0, callback);
            }
            None => {
                state.uncaptured.remove(&device.0);
            }
        }
    }

    fn set_device_lost_callback(&self, device: &MockDevice, callback: Option<DeviceLostCallback>) {
        let mut state = self.state.lock();
        match callback {
            Some(callback) => {
                state.lost.insert(device.0, callback);
            }
            None => {
                state.lost.remove(&device.0);
            }
        }
    }
}

pub struct Harness {
    pub server: WireServer<MockGpu>,
    pub gpu: MockGpu,
    pub frames: Receiver<Vec<u8>>,
}

pub fn harness() -> Harness {
    harness_with(ServerConfig::default())
}

pub fn harness_with(config: ServerConfig) -> Harness {
    gpuwire_common::logging::init_test_logging();

    let gpu = MockGpu::default();
    let (serializer, frames) = FrameSerializer::channel(&config);
    let server = WireServer::new(gpu.clone(), serializer, &config);
    server
        .inject_device(MockDevice(DEVICE.id), DEVICE)
        .expect("device injection");

    Harness { server, gpu, frames }
}

/// Decode every return command emitted so far.
pub fn drain_returns(frames: &Receiver<Vec<u8>>) -> Vec<ReturnCommand> {
    frames
        .try_iter()
        .flat_map(|frame| wire::decode_stream(&frame).expect("return frame decodes"))
        .collect()
}
