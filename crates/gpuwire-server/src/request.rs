use std::sync::{Arc, Weak};

use tracing::debug;

use gpuwire_protocol::descriptor::MapMode;
use gpuwire_protocol::handle::{ObjectHandle, RequestSerial};

use crate::liveness::LivenessWitness;
use crate::native::NativeGpu;
use crate::server::{ServerInner, ServerStats};

/// What an asynchronous callback holds onto the server: a weak reference,
/// the liveness witness that gates it, and the statistics block (which
/// outlives the server).
pub(crate) struct ServerLink<N: NativeGpu> {
    server: Weak<ServerInner<N>>,
    witness: LivenessWitness,
    stats: Arc<ServerStats>,
}

impl<N: NativeGpu> Clone for ServerLink<N> {
    fn clone(&self) -> Self {
        Self {
            server: self.server.clone(),
            witness: self.witness.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<N: NativeGpu> ServerLink<N> {
    pub(crate) fn new(server: &Arc<ServerInner<N>>, witness: LivenessWitness) -> Self {
        Self {
            server: Arc::downgrade(server),
            witness,
            stats: server.stats.clone(),
        }
    }

    /// Run `f` against the server if, and only if, it is still alive.
    /// Teardown cannot start until `f` returns.
    pub(crate) fn with_live<R>(&self, f: impl FnOnce(&ServerInner<N>) -> R) -> Option<R> {
        let Some(_alive) = self.witness.enter() else {
            self.stats.record_dropped();
            debug!("server torn down, dropping completion");
            return None;
        };
        let Some(server) = self.server.upgrade() else {
            self.stats.record_dropped();
            debug!("server released, dropping completion");
            return None;
        };
        Some(f(&server))
    }
}

/// Correlation record for one outstanding native call. Boxed at dispatch,
/// moved into the native callback, and consumed by the completion handler.
pub(crate) struct AsyncRequest<N: NativeGpu, P> {
    link: ServerLink<N>,
    serial: RequestSerial,
    payload: P,
}

impl<N: NativeGpu, P> AsyncRequest<N, P> {
    pub(crate) fn new(link: ServerLink<N>, serial: RequestSerial, payload: P) -> Box<Self> {
        Box::new(Self { link, serial, payload })
    }

    pub(crate) fn link(&self) -> &ServerLink<N> {
        &self.link
    }

    pub(crate) fn serial(&self) -> RequestSerial {
        self.serial
    }

    pub(crate) fn payload(&self) -> &P {
        &self.payload
    }
}

/// The device a pipeline is created on, and the slot it resolves into.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineTarget {
    pub device: ObjectHandle,
    pub pipeline: ObjectHandle,
}

pub(crate) type PipelineRequest<N> = AsyncRequest<N, PipelineTarget>;

pub(crate) type ErrorScopeRequest<N> = AsyncRequest<N, ()>;

pub(crate) type WorkDoneRequest<N> = AsyncRequest<N, ()>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct MapTarget {
    pub buffer: ObjectHandle,
    pub mode: MapMode,
    pub offset: u64,
    pub size: u64,
}

pub(crate) type MapRequest<N> = AsyncRequest<N, MapTarget>;
