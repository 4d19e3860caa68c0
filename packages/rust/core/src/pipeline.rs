//! End-to-end build: manifest → combined document → converter → verified artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use docpress_shared::{
    BuildArtifact, BuildConfig, BuildLayout, BuildReport, BuildStage, CleanupOutcome,
    DocpressError, Result, SourceDocument,
};

use crate::assembler::{self, AssembleResult};
use crate::converter::{ConvertRequest, Converter};
use crate::manifest::resolve_manifest;
use crate::registry::{RegistryCheck, validate_languages};
use crate::verify::{self, PageCounter};

/// Run-time switches for a build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Delete the intermediate document after a successful build.
    pub clean: bool,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called each time the build reaches a new stage.
    fn stage(&self, stage: BuildStage, detail: &str);
    /// Called right before the converter is started; it may run for a while.
    fn converting(&self, converter: &str);
    /// Called for non-fatal problems.
    fn warning(&self, message: &str);
    /// Called once when the build fails. `reached` is the last completed stage.
    fn failed(&self, reached: BuildStage, error: &DocpressError);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: BuildStage, _detail: &str) {}
    fn converting(&self, _converter: &str) {}
    fn warning(&self, _message: &str) {}
    fn failed(&self, _reached: BuildStage, _error: &DocpressError) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Everything validated before assembly starts.
#[derive(Debug, Clone)]
pub struct Preflight {
    /// Source documents in reading order.
    pub documents: Vec<SourceDocument>,
    /// Language guide registry result.
    pub registry: RegistryCheck,
}

/// Validate the manifest, the source tree, and the language guide registry.
pub fn preflight(
    config: &BuildConfig,
    layout: &BuildLayout,
    progress: &dyn ProgressReporter,
) -> Result<Preflight> {
    let documents = resolve_manifest(&config.manifest())?;
    assembler::check_sources(&layout.source_root, &documents)?;

    let registry = validate_languages(&layout.source_root, &config.languages)?;
    for path in &registry.missing_optional {
        progress.warning(&format!("optional guide file missing: {}", path.display()));
    }

    Ok(Preflight {
        documents,
        registry,
    })
}

/// Check that the converter's descriptors exist. Their content is not read.
pub fn check_descriptors(layout: &BuildLayout) -> Result<()> {
    if !layout.metadata.is_file() {
        return Err(DocpressError::not_found(
            "metadata descriptor",
            &layout.metadata,
        ));
    }
    if !layout.styling.is_file() {
        return Err(DocpressError::not_found("styling descriptor", &layout.styling));
    }
    Ok(())
}

/// Produce only the combined document.
#[instrument(skip_all, fields(build_dir = %layout.build_dir.display()))]
pub fn assemble_only(
    config: &BuildConfig,
    layout: &BuildLayout,
    progress: &dyn ProgressReporter,
) -> Result<AssembleResult> {
    let mut tracker = StageTracker::new(progress);
    let result = run_assemble(&mut tracker, config, layout);
    if let Err(e) = &result {
        tracker.fail(e);
    }
    result
}

fn run_assemble(
    tracker: &mut StageTracker<'_>,
    config: &BuildConfig,
    layout: &BuildLayout,
) -> Result<AssembleResult> {
    ensure_output_dir(&layout.output_dir)?;
    tracker.advance(BuildStage::DirReady, &layout.output_dir.display().to_string());
    let checked = preflight(config, layout, tracker.progress)?;

    let assembled =
        assembler::assemble(&layout.source_root, &checked.documents, &layout.intermediate)?;
    tracker.advance(
        BuildStage::Assembled,
        &format!("{} documents", assembled.document_count),
    );
    Ok(assembled)
}

/// Run the full build.
///
/// 1. Create the output directory
/// 2. Validate manifest, sources, registry, and descriptors
/// 3. Assemble the combined document
/// 4. Run the converter into a staging file
/// 5. Verify the staging file and promote it to the final artifact
/// 6. Optionally delete the intermediate document
/// 7. Count pages and write `build-report.json`
///
/// Every fatal error stops the run at the step that raised it. Nothing is
/// retried.
#[instrument(skip_all, fields(build_dir = %layout.build_dir.display(), clean = options.clean))]
pub fn build(
    config: &BuildConfig,
    layout: &BuildLayout,
    options: BuildOptions,
    converter: &dyn Converter,
    pages: &dyn PageCounter,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();
    let mut tracker = StageTracker::new(progress);

    match run_build(&mut tracker, config, layout, options, converter, pages) {
        Ok(report) => {
            progress.done(&report);
            info!(
                documents = report.document_count,
                size = report.artifact.size_bytes,
                elapsed_ms = start.elapsed().as_millis(),
                "build complete"
            );
            Ok(report)
        }
        Err(e) => {
            tracker.fail(&e);
            Err(e)
        }
    }
}

fn run_build(
    tracker: &mut StageTracker<'_>,
    config: &BuildConfig,
    layout: &BuildLayout,
    options: BuildOptions,
    converter: &dyn Converter,
    pages: &dyn PageCounter,
) -> Result<BuildReport> {
    let started_at = Utc::now();

    // --- Output directory ---
    ensure_output_dir(&layout.output_dir)?;
    tracker.advance(BuildStage::DirReady, &layout.output_dir.display().to_string());

    // --- Validation: nothing is written until everything checks out ---
    let checked = preflight(config, layout, tracker.progress)?;
    check_descriptors(layout)?;

    // --- Assembly ---
    let assembled =
        assembler::assemble(&layout.source_root, &checked.documents, &layout.intermediate)?;
    tracker.advance(
        BuildStage::Assembled,
        &format!(
            "{} documents, {} bytes",
            assembled.document_count, assembled.bytes
        ),
    );

    // --- Conversion ---
    verify::clear_staging(&layout.staging)?;
    tracker.progress.converting(converter.name());
    // The converter runs inside the build directory, so relative layout paths
    // would resolve against it a second time.
    let input = absolute(&layout.intermediate)?;
    let output = absolute(&layout.staging)?;
    let metadata = absolute(&layout.metadata)?;
    let styling = absolute(&layout.styling)?;
    let working_dir = absolute(&layout.build_dir)?;
    let request = ConvertRequest {
        input: &input,
        output: &output,
        metadata: &metadata,
        styling: &styling,
        working_dir: &working_dir,
    };
    if let Err(e) = converter.convert(&request) {
        verify::discard_staging(&layout.staging);
        return Err(e);
    }
    tracker.advance(BuildStage::Converted, converter.name());

    // --- Verification ---
    let size_bytes = verify::promote_artifact(&layout.staging, &layout.artifact)?;
    tracker.advance(BuildStage::Verified, &layout.artifact.display().to_string());

    // --- Cleanup (best effort) ---
    let cleanup = if options.clean {
        let outcome = remove_intermediate(&layout.intermediate);
        match &outcome {
            CleanupOutcome::Failed(reason) => tracker.progress.warning(&format!(
                "could not delete {}: {reason}",
                layout.intermediate.display()
            )),
            _ => tracker.advance(
                BuildStage::CleanedUp,
                &layout.intermediate.display().to_string(),
            ),
        }
        outcome
    } else {
        CleanupOutcome::Retained
    };

    // --- Report ---
    let report = BuildReport {
        started_at,
        finished_at: Utc::now(),
        document_count: assembled.document_count,
        combined_sha256: assembled.sha256,
        combined_bytes: assembled.bytes,
        intermediate: layout.intermediate.clone(),
        artifact: BuildArtifact {
            path: layout.artifact.clone(),
            size_bytes,
            page_count: pages.count_pages(&layout.artifact),
        },
        cleanup,
    };

    if let Err(e) = write_report(&layout.report, &report) {
        warn!(error = %e, "could not write build report");
        tracker.progress.warning(&e.to_string());
    }

    tracker.advance(BuildStage::Done, "");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Stage tracking
// ---------------------------------------------------------------------------

/// Walks the build state machine and forwards transitions to the reporter.
struct StageTracker<'a> {
    stage: BuildStage,
    progress: &'a dyn ProgressReporter,
}

impl<'a> StageTracker<'a> {
    fn new(progress: &'a dyn ProgressReporter) -> Self {
        Self {
            stage: BuildStage::Init,
            progress,
        }
    }

    fn advance(&mut self, next: BuildStage, detail: &str) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal build transition {:?} -> {next:?}",
            self.stage
        );
        info!(from = ?self.stage, to = ?next, detail, "build stage");
        self.stage = next;
        self.progress.stage(next, detail);
    }

    fn fail(&mut self, error: &DocpressError) {
        warn!(reached = ?self.stage, category = %error.category(), error = %error, "build failed");
        self.progress.failed(self.stage, error);
        self.stage = BuildStage::Failed;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| DocpressError::io(path, e))
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| DocpressError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Delete the intermediate document. Failure is reported, never raised.
fn remove_intermediate(path: &Path) -> CleanupOutcome {
    match std::fs::remove_file(path) {
        Ok(()) => CleanupOutcome::Removed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cleanup failed");
            CleanupOutcome::Failed(e.to_string())
        }
    }
}

/// Write the build report (pretty-printed JSON).
fn write_report(path: &Path, report: &BuildReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| DocpressError::config(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| DocpressError::io(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
