mod completion;
mod dispatch;
pub mod error;
pub mod liveness;
pub mod native;
mod request;
pub mod serializer;
pub mod server;

pub use error::ServerError;
pub use liveness::{LivenessToken, LivenessWitness};
pub use native::NativeGpu;
pub use serializer::{CommandSerializer, FrameSerializer};
pub use server::{KnownObjects, ServerStats, StatsSnapshot, WireServer};
