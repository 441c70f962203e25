use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use gpuwire_core::config::ServerConfig;
use gpuwire_core::object_table::ObjectTable;
use gpuwire_protocol::commands::ReturnCommand;
use gpuwire_protocol::handle::{ObjectHandle, ObjectType};

use crate::completion;
use crate::error::ServerError;
use crate::liveness::LivenessToken;
use crate::native::NativeGpu;
use crate::request::ServerLink;
use crate::serializer::CommandSerializer;

/// Server-wide counters. Shared with outstanding requests, so they remain
/// readable after the server itself is gone.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub requests_accepted: AtomicU64,
    pub requests_rejected: AtomicU64,
    pub returns_emitted: AtomicU64,
    pub completions_dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests_accepted: u64,
    pub requests_rejected: u64,
    pub returns_emitted: u64,
    pub completions_dropped: u64,
}

impl ServerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            returns_emitted: self.returns_emitted.load(Ordering::Relaxed),
            completions_dropped: self.completions_dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.completions_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// One object table per object type.
pub struct KnownObjects<N: NativeGpu> {
    pub(crate) devices: ObjectTable<N::Device>,
    pub(crate) buffers: ObjectTable<N::Buffer>,
    pub(crate) compute_pipelines: ObjectTable<N::ComputePipeline>,
    pub(crate) render_pipelines: ObjectTable<N::RenderPipeline>,
}

impl<N: NativeGpu> KnownObjects<N> {
    fn new(max_objects: u32) -> Self {
        Self {
            devices: ObjectTable::new(ObjectType::Device, max_objects),
            buffers: ObjectTable::new(ObjectType::Buffer, max_objects),
            compute_pipelines: ObjectTable::new(ObjectType::ComputePipeline, max_objects),
            render_pipelines: ObjectTable::new(ObjectType::RenderPipeline, max_objects),
        }
    }

    pub fn devices(&self) -> &ObjectTable<N::Device> {
        &self.devices
    }

    pub fn buffers(&self) -> &ObjectTable<N::Buffer> {
        &self.buffers
    }

    pub fn compute_pipelines(&self) -> &ObjectTable<N::ComputePipeline> {
        &self.compute_pipelines
    }

    pub fn render_pipelines(&self) -> &ObjectTable<N::RenderPipeline> {
        &self.render_pipelines
    }
}

/// Everything mutated by dispatch and completion. Emitting under the same
/// lock as the table update keeps the outgoing stream in observation order.
pub(crate) struct ServerState<N: NativeGpu> {
    pub(crate) objects: KnownObjects<N>,
    /// Objects still pending on each device. A device with any is not destroyable.
    pending_by_device: HashMap<ObjectHandle, usize>,
    serializer: Box<dyn CommandSerializer>,
}

impl<N: NativeGpu> ServerState<N> {
    pub(crate) fn begin_pending(&mut self, device: ObjectHandle) {
        *self.pending_by_device.entry(device).or_insert(0) += 1;
    }

    pub(crate) fn end_pending(&mut self, device: ObjectHandle) {
        if let Entry::Occupied(mut entry) = self.pending_by_device.entry(device) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
            }
        }
    }

    pub(crate) fn pending_on(&self, device: ObjectHandle) -> usize {
        self.pending_by_device.get(&device).copied().unwrap_or(0)
    }
}

pub(crate) struct ServerInner<N: NativeGpu> {
    pub(crate) procs: N,
    pub(crate) state: Mutex<ServerState<N>>,
    pub(crate) stats: Arc<ServerStats>,
}

impl<N: NativeGpu> ServerInner<N> {
    /// Append a return command to the outgoing stream.
    pub(crate) fn emit(&self, state: &mut ServerState<N>, cmd: ReturnCommand) {
        match state.serializer.serialize(&cmd) {
            Ok(()) => {
                self.stats.returns_emitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(command = cmd.name(), "failed to serialize return command: {}", e);
            }
        }
    }
}

/// The wire server: owns the object tables and the liveness token, and
/// turns native completions into return commands.
pub struct WireServer<N: NativeGpu> {
    pub(crate) inner: Arc<ServerInner<N>>,
    liveness: LivenessToken,
}

impl<N: NativeGpu> WireServer<N> {
    pub fn new<S>(procs: N, serializer: S, config: &ServerConfig) -> Self
    where
        S: CommandSerializer + 'static,
    {
        let inner = Arc::new(ServerInner {
            procs,
            state: Mutex::new(ServerState {
                objects: KnownObjects::new(config.max_objects_per_table),
                pending_by_device: HashMap::new(),
                serializer: Box::new(serializer),
            }),
            stats: Arc::new(ServerStats::default()),
        });

        Self {
            inner,
            liveness: LivenessToken::new(),
        }
    }

    /// Register a device created outside the wire and forward its uncaptured
    /// errors and device loss to the client.
    pub fn inject_device(&self, device: N::Device, handle: ObjectHandle) -> Result<(), ServerError> {
        self.inner
            .state
            .lock()
            .objects
            .devices
            .allocate(handle)?
            .set_ready(device.clone());

        let error_link = self.link();
        self.inner.procs.set_uncaptured_error_callback(
            &device,
            Some(Box::new(move |error_type, message| {
                completion::forward_uncaptured_error(&error_link, error_type, message)
            })),
        );
        let lost_link = self.link();
        self.inner.procs.set_device_lost_callback(
            &device,
            Some(Box::new(move |message| completion::forward_device_lost(&lost_link, message))),
        );

        info!("injected device {}", handle);
        Ok(())
    }

    pub(crate) fn link(&self) -> ServerLink<N> {
        ServerLink::new(&self.inner, self.liveness.witness())
    }

    pub fn procs(&self) -> &N {
        &self.inner.procs
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        self.inner.stats.clone()
    }

    /// Inspect the object tables under the server lock.
    pub fn with_objects<R>(&self, f: impl FnOnce(&KnownObjects<N>) -> R) -> R {
        f(&self.inner.state.lock().objects)
    }
}

impl<N: NativeGpu> Drop for WireServer<N> {
    fn drop(&mut self) {
        // Waits for running completions; later ones are dropped unseen.
        self.liveness.invalidate();

        let devices = self.inner.state.lock().objects.devices.drain();
        for (_, device) in &devices {
            self.inner.procs.clear_device_callbacks(device);
        }
        info!(devices = devices.len(), "wire server torn down");
    }
}
