//! Error types for IPC operations.

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported resolution {0}; expected one of 512, 768, 1024, 2048")]
    UnsupportedResolution(u32),
}
