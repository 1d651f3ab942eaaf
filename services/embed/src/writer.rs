//! The external metadata tool, behind a capability trait.
//!
//! Embedding goes through exiftool, one subprocess per asset. The trait
//! keeps the run policy (continue vs abort) testable without the binary
//! installed.

use std::io;
use std::path::Path;
use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::metadata::MetadataFields;

/// Tool invoked when none is configured.
pub const DEFAULT_TOOL: &str = "exiftool";

/// Errors from one metadata write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The tool ran and rejected the asset. Recoverable at the run level.
    #[error("{tool} failed with {status}: {stderr}")]
    Tool {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The tool binary is not installed or not on PATH. Fatal for the run.
    #[error("{tool} is not installed or not on PATH")]
    ToolMissing { tool: String },

    /// The tool could not be spawned for another reason. Fatal for the run.
    #[error("failed to run {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    /// Whether this failure is scoped to a single asset. Everything else
    /// aborts the whole run.
    pub fn is_per_asset(&self) -> bool {
        matches!(self, WriteError::Tool { .. })
    }
}

/// Capability of writing one reading's tag values into one asset.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    async fn write(&self, fields: &MetadataFields, asset: &Path) -> Result<(), WriteError>;
}

/// Real writer that shells out to exiftool.
pub struct ExiftoolWriter {
    program: String,
}

impl ExiftoolWriter {
    pub fn new(program: impl Into<String>) -> Self {
        ExiftoolWriter {
            program: program.into(),
        }
    }
}

impl Default for ExiftoolWriter {
    fn default() -> Self {
        ExiftoolWriter::new(DEFAULT_TOOL)
    }
}

/// Tag assignment flags in the order the tool receives them. The asset
/// path is appended last by the caller.
fn build_args(fields: &MetadataFields) -> Vec<String> {
    vec![
        "-overwrite_original".to_string(),
        format!("-XMP:Temperature={}", fields.temperature),
        format!("-XMP:Humidity={}", fields.humidity),
        format!("-XMP:Pressure={}", fields.pressure),
        format!("-XMP:LightLevel={}", fields.light),
        format!("-XMP:SensorTimestamp={}", fields.timestamp),
        format!("-GPSLatitude={}", fields.latitude.abs()),
        format!("-GPSLatitudeRef={}", fields.latitude_ref()),
        format!("-GPSLongitude={}", fields.longitude.abs()),
        format!("-GPSLongitudeRef={}", fields.longitude_ref()),
        format!("-XMP:Description={}", fields.description()),
    ]
}

#[async_trait]
impl MetadataWriter for ExiftoolWriter {
    async fn write(&self, fields: &MetadataFields, asset: &Path) -> Result<(), WriteError> {
        let args = build_args(fields);
        debug!(tool = %self.program, asset = %asset.display(), "Invoking metadata tool");

        let output = Command::new(&self.program)
            .args(&args)
            .arg(asset)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    WriteError::ToolMissing {
                        tool: self.program.clone(),
                    }
                } else {
                    WriteError::Io {
                        tool: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(WriteError::Tool {
                tool: self.program.clone(),
                status: output.status,
                stderr,
            });
        }

        Ok(())
    }
}
