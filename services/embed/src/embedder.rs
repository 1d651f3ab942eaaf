//! Drives one writer over the resolved asset set.
//!
//! Strictly sequential, one subprocess at a time, no timeout and no
//! retry. An asset the tool rejects is logged and counted; a tool that
//! cannot run at all aborts the run with the remaining assets untouched.

use std::path::PathBuf;

use tracing::{error, info, instrument, warn};

use crate::metadata::MetadataFields;
use crate::writer::{MetadataWriter, WriteError};

/// Outcome of one embedding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedSummary {
    /// Assets the run was asked to process.
    pub attempted: usize,
    /// Assets the tool accepted.
    pub embedded: usize,
}

impl EmbedSummary {
    pub fn all_succeeded(&self) -> bool {
        self.embedded == self.attempted
    }
}

/// Applies one reading's tag values to every asset in order.
pub struct Embedder<W: MetadataWriter> {
    writer: W,
}

impl<W: MetadataWriter> Embedder<W> {
    pub fn new(writer: W) -> Self {
        Embedder { writer }
    }

    /// Embed `fields` into each asset, in order.
    ///
    /// Per-asset failures are counted and the run continues; any other
    /// failure aborts immediately and propagates.
    #[instrument(skip_all, fields(assets = assets.len()))]
    pub async fn run(
        &self,
        fields: &MetadataFields,
        assets: &[PathBuf],
    ) -> Result<EmbedSummary, WriteError> {
        let mut summary = EmbedSummary {
            attempted: assets.len(),
            embedded: 0,
        };

        for asset in assets {
            match self.writer.write(fields, asset).await {
                Ok(()) => {
                    summary.embedded += 1;
                    info!(asset = %asset.display(), "Metadata embedded");
                }
                Err(e) if e.is_per_asset() => {
                    warn!(asset = %asset.display(), error = %e, "Asset rejected, continuing");
                }
                Err(e) => {
                    error!(error = %e, "Embedding run aborted");
                    return Err(e);
                }
            }
        }

        Ok(summary)
    }
}
