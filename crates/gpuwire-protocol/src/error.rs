use serde::{Deserialize, Serialize};

use crate::wire::WireError;

/// Failures a consumer of the return stream can observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProtocolError {
    #[error("truncated frame: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("malformed frame: {0}")]
    Malformed(String),
}

impl From<WireError> for ProtocolError {
    fn from(e: WireError) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}
