pub mod handle;
pub mod status;
pub mod descriptor;
pub mod commands;
pub mod wire;
pub mod error;

pub use commands::ReturnCommand;
pub use error::ProtocolError;
pub use handle::{ObjectHandle, ObjectType, RequestSerial};
pub use status::{BufferMapStatus, CreatePipelineStatus, ErrorType, QueueWorkDoneStatus};
