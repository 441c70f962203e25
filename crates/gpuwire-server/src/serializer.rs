use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use gpuwire_core::config::ServerConfig;
use gpuwire_protocol::commands::ReturnCommand;
use gpuwire_protocol::wire;

use crate::error::ServerError;

/// Appends return commands to the single ordered outgoing stream.
pub trait CommandSerializer: Send {
    fn serialize(&mut self, cmd: &ReturnCommand) -> Result<(), ServerError>;
}

/// Encodes each return command as a wire frame and hands it to the
/// transport through a channel.
pub struct FrameSerializer {
    tx: Sender<Vec<u8>>,
    stream_id: u32,
    compression_threshold: usize,
}

impl FrameSerializer {
    pub fn new(tx: Sender<Vec<u8>>, config: &ServerConfig) -> Self {
        Self {
            tx,
            stream_id: config.stream_id,
            compression_threshold: config.compression_threshold,
        }
    }

    /// Create a serializer together with the receiving end the transport drains.
    pub fn channel(config: &ServerConfig) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx, config), rx)
    }
}

impl CommandSerializer for FrameSerializer {
    fn serialize(&mut self, cmd: &ReturnCommand) -> Result<(), ServerError> {
        let frame = wire::encode_return_command(cmd, self.stream_id, self.compression_threshold)?;
        trace!(command = cmd.name(), bytes = frame.len(), "return frame encoded");
        self.tx.send(frame).map_err(|_| ServerError::Disconnected)
    }
}
