//! Artifact verification and page counting.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use docpress_shared::{DocpressError, Result};

/// Reports the page count of a rendered artifact, when it can.
pub trait PageCounter {
    /// `None` means "unavailable"; it is never an error.
    fn count_pages(&self, artifact: &Path) -> Option<u32>;
}

/// Page counter backed by poppler's `pdfinfo`.
#[derive(Debug, Clone)]
pub struct PdfInfo {
    program: String,
}

impl PdfInfo {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdfInfo {
    fn default() -> Self {
        Self::new("pdfinfo")
    }
}

impl PageCounter for PdfInfo {
    fn count_pages(&self, artifact: &Path) -> Option<u32> {
        let output = match Command::new(&self.program)
            .arg(artifact)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(program = %self.program, error = %e, "page counter unavailable");
                return None;
            }
        };

        if !output.status.success() {
            debug!(program = %self.program, status = ?output.status, "page counter failed");
            return None;
        }

        parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the `Pages:` value from `pdfinfo` output.
pub fn parse_pdfinfo_pages(stdout: &str) -> Option<u32> {
    stdout.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|rest| rest.trim().parse().ok())
    })
}

/// Remove a leftover staging file from an earlier, interrupted run.
///
/// Without this a crashed converter's output could be promoted by a later
/// run whose converter wrote nothing.
pub fn clear_staging(staging: &Path) -> Result<()> {
    match std::fs::remove_file(staging) {
        Ok(()) => {
            debug!(path = %staging.display(), "removed stale staging artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DocpressError::verification(
            staging,
            format!("cannot clear stale staging artifact: {e}"),
        )),
    }
}

/// Best-effort removal of the staging file after a failed conversion.
pub fn discard_staging(staging: &Path) {
    match std::fs::remove_file(staging) {
        Ok(()) => debug!(path = %staging.display(), "discarded partial artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %staging.display(), error = %e, "could not remove partial artifact");
        }
    }
}

/// Check the converter's output and move it onto the final artifact path.
///
/// The staging file must exist and be non-empty; anything else means the
/// converter claimed success without producing a result. Returns the
/// artifact size in bytes.
pub fn promote_artifact(staging: &Path, artifact: &Path) -> Result<u64> {
    let meta = match std::fs::metadata(staging) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DocpressError::verification(
                staging,
                "converter exited successfully but wrote no output",
            ));
        }
        Err(e) => {
            return Err(DocpressError::verification(
                staging,
                format!("cannot inspect converter output: {e}"),
            ));
        }
    };

    if !meta.is_file() || meta.len() == 0 {
        discard_staging(staging);
        return Err(DocpressError::verification(
            staging,
            "converter output is empty",
        ));
    }

    std::fs::rename(staging, artifact).map_err(|e| {
        DocpressError::verification(artifact, format!("cannot move artifact into place: {e}"))
    })?;

    info!(path = %artifact.display(), size = meta.len(), "artifact verified");
    Ok(meta.len())
}
