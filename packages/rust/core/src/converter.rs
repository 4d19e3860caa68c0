//! External document converter.
//!
//! The converter is a black box: it gets the combined document plus the
//! metadata and styling descriptors and either writes a PDF or fails. The
//! [`Converter`] trait is the seam; [`Pandoc`] runs the real tool.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, instrument};

use docpress_shared::{DocpressError, Result};

/// PDF rendering engine passed to pandoc.
pub const PDF_ENGINE: &str = "xelatex";

/// Depth of the generated table of contents.
pub const TOC_DEPTH: u8 = 2;

/// Syntax highlighting theme.
pub const HIGHLIGHT_STYLE: &str = "tango";

/// Input format: Markdown with the extensions the guides rely on.
pub const INPUT_FORMAT: &str = "markdown\
+smart\
+pipe_tables\
+fenced_code_blocks\
+backtick_code_blocks\
+fenced_code_attributes\
+definition_lists\
+footnotes";

/// Everything a single conversion needs.
///
/// The converter runs in `working_dir`, so the other paths should be absolute.
#[derive(Debug, Clone, Copy)]
pub struct ConvertRequest<'a> {
    /// Combined Markdown document.
    pub input: &'a Path,
    /// Where the converter should write the PDF.
    pub output: &'a Path,
    /// Metadata descriptor (title, author, fonts, link colours).
    pub metadata: &'a Path,
    /// Styling descriptor included in the document header.
    pub styling: &'a Path,
    /// Directory the converter runs in.
    pub working_dir: &'a Path,
}

/// Renders a combined document into the final artifact.
pub trait Converter {
    /// Program name, for status output.
    fn name(&self) -> &str;

    /// Run one conversion, blocking until it finishes.
    ///
    /// A non-zero exit must surface as [`DocpressError::Conversion`] carrying
    /// the tool's own diagnostics.
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<()>;
}

/// Converter backed by the `pandoc` CLI.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: String,
}

impl Pandoc {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The fixed argument list for a request.
    pub fn args(request: &ConvertRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![request.input.into(), "-o".into(), request.output.into()];

        let mut metadata = OsString::from("--metadata-file=");
        metadata.push(request.metadata);
        args.push(metadata);

        let mut header = OsString::from("--include-in-header=");
        header.push(request.styling);
        args.push(header);

        args.extend(
            [
                format!("--pdf-engine={PDF_ENGINE}"),
                "--toc".to_string(),
                format!("--toc-depth={TOC_DEPTH}"),
                "--number-sections".to_string(),
                format!("--highlight-style={HIGHLIGHT_STYLE}"),
                "-V".to_string(),
                "colorlinks=true".to_string(),
                "-f".to_string(),
                INPUT_FORMAT.to_string(),
            ]
            .map(OsString::from),
        );

        args
    }
}

impl Default for Pandoc {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl Converter for Pandoc {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip_all, fields(program = %self.program, output = %request.output.display()))]
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<()> {
        let args = Self::args(request);
        debug!(?args, "invoking converter");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(request.working_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| DocpressError::ConverterSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            if diagnostics.trim().is_empty() {
                diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            return Err(DocpressError::Conversion {
                code: output.status.code(),
                diagnostics,
            });
        }

        info!("converter exited successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request<'a>(paths: &'a [PathBuf; 5]) -> ConvertRequest<'a> {
        ConvertRequest {
            input: &paths[0],
            output: &paths[1],
            metadata: &paths[2],
            styling: &paths[3],
            working_dir: &paths[4],
        }
    }

    fn paths() -> [PathBuf; 5] {
        [
            PathBuf::from("output/combined.md"),
            PathBuf::from("output/.partial-guide.pdf"),
            PathBuf::from("metadata.yaml"),
            PathBuf::from("header.tex"),
            PathBuf::from("."),
        ]
    }

    #[test]
    fn args_carry_fixed_flags() {
        let paths = paths();
        let args: Vec<String> = Pandoc::args(&request(&paths))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "output/combined.md");
        assert_eq!(args[1..3], ["-o", "output/.partial-guide.pdf"]);
        assert!(args.contains(&"--metadata-file=metadata.yaml".to_string()));
        assert!(args.contains(&"--include-in-header=header.tex".to_string()));
        assert!(args.contains(&"--pdf-engine=xelatex".to_string()));
        assert!(args.contains(&"--toc".to_string()));
        assert!(args.contains(&"--toc-depth=2".to_string()));
        assert!(args.contains(&"--number-sections".to_string()));
        assert!(args.contains(&"--highlight-style=tango".to_string()));
        assert!(args.contains(&"colorlinks=true".to_string()));
    }

    #[test]
    fn input_format_enables_extensions() {
        for ext in [
            "smart",
            "pipe_tables",
            "fenced_code_blocks",
            "backtick_code_blocks",
            "fenced_code_attributes",
            "definition_lists",
            "footnotes",
        ] {
            assert!(INPUT_FORMAT.contains(&format!("+{ext}")), "missing {ext}");
        }
        assert!(INPUT_FORMAT.starts_with("markdown+"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let paths = paths();
        let pandoc = Pandoc::new("docpress-no-such-converter");
        let err = pandoc.convert(&request(&paths)).unwrap_err();
        assert!(matches!(err, DocpressError::ConverterSpawn { .. }));
        assert_eq!(err.category(), docpress_shared::ErrorCategory::Conversion);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_surfaces_stderr_verbatim() {
        // `sh` treats the input document as a script, standing in for a failing converter.
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("output")).unwrap();
        std::fs::write(
            tmp.path().join("output/combined.md"),
            "echo 'xelatex not found' >&2\nexit 43\n",
        )
        .unwrap();

        let paths = paths();
        let mut req = request(&paths);
        req.working_dir = tmp.path();

        let err = Pandoc::new("sh").convert(&req).unwrap_err();
        match err {
            DocpressError::Conversion { code, diagnostics } => {
                assert_eq!(code, Some(43));
                assert_eq!(diagnostics, "xelatex not found\n");
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }
}
