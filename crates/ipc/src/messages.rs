//! Events the generator reports to its host.

use serde::{Deserialize, Serialize};

use crate::types::MaterialManifest;

/// Messages from the texture generator to the host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ForgeToHost {
    /// Generation progress
    JobProgress {
        job_id: u64,
        progress: f32,
        status: String,
    },

    /// Textures generated and written for the host to pick up
    JobComplete {
        job_id: u64,
        material: MaterialManifest,
    },

    /// Job stopped at the user's request
    JobCancelled { job_id: u64 },

    /// Error notification
    Error { code: String, message: String },
}

impl ForgeToHost {
    /// Serialize as a single JSON line
    pub fn to_json_line(&self) -> Result<String, crate::IpcError> {
        Ok(serde_json::to_string(self)?)
    }
}
