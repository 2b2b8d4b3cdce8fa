//! Remote PBR texture generation for PBR Forge
//!
//! A [`TextureBackend`] produces the raw `/generate` response; the
//! [`JobController`] runs one request at a time on a background worker and
//! exposes it to a polling host loop; the decoded [`TextureSet`] is finally
//! handed to a [`MaterialSink`].

mod job;
mod material;
mod remote;
mod textures;

pub use job::{
    Checkpoint, JobController, JobError, JobHandle, JobId, JobProgress, JobState, JobStatus,
    Outcome,
};
pub use material::{
    DirectorySink, MANIFEST_FILE, MaterialSink, SinkError, apply_normal_strength, material_name,
};
pub use remote::RemoteBackend;
pub use textures::{ResizeFilter, TextureSet};

use std::future::Future;

use pbrforge_ipc::{TextureRequest, TextureResponse};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Request rejected by backend: {0}")]
    RemoteRejected(String),

    #[error("Backend ran out of GPU memory ({0}). Try a smaller resolution (e.g. 512).")]
    ResourceExhausted(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response: {0}")]
    DecodeFailure(String),

    #[error("Worker aborted: {0}")]
    Worker(String),
}

impl GenerationError {
    /// Short machine-readable code for host notifications
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::ConnectionFailure(_) => "connection_failure",
            GenerationError::RemoteRejected(_) => "remote_rejected",
            GenerationError::ResourceExhausted(_) => "resource_exhausted",
            GenerationError::Backend { .. } => "backend_error",
            GenerationError::DecodeFailure(_) => "decode_failure",
            GenerationError::Worker(_) => "worker_aborted",
        }
    }

    /// Whether retrying at a lower resolution is likely to help
    pub fn suggests_lower_resolution(&self) -> bool {
        matches!(self, GenerationError::ResourceExhausted(_))
    }
}

/// A source of generated texture sets
///
/// Implementations perform one complete remote generation per call. They are
/// shared with the job worker, so they must be `Send + Sync`.
pub trait TextureBackend: Send + Sync + 'static {
    /// Generate all maps for `request`
    fn generate(
        &self,
        request: TextureRequest,
    ) -> impl Future<Output = Result<TextureResponse, GenerationError>> + Send;
}
