//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use colored::Colorize;
use docpress_core::converter::Pandoc;
use docpress_core::manifest::resolve_manifest;
use docpress_core::pipeline::{self, BuildOptions, ProgressReporter};
use docpress_core::verify::PdfInfo;
use docpress_markdown::AnchorMap;
use docpress_shared::{
    BuildConfig, BuildReport, BuildStage, DocpressError, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docpress: render the guide's Markdown sources into a single PDF.
#[derive(Parser)]
#[command(
    name = "docpress",
    version,
    about = "Assemble the guide's Markdown sources and render them to PDF with pandoc.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Build directory (defaults to the current directory).
    #[arg(long, global = true)]
    pub build_dir: Option<PathBuf>,

    /// Config file (defaults to docpress.toml in the build directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Delete the combined document after a successful build.
    #[arg(long)]
    pub clean: bool,

    /// Defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum Command {
    /// Run the full build (the default).
    Build {
        /// Delete the combined document after a successful build.
        #[arg(long)]
        clean: bool,
    },

    /// Produce only the combined Markdown document.
    Assemble,

    /// Validate manifest, sources, and language guides without converting.
    Check,

    /// Print the resolved manifest order with anchors.
    Manifest,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum ConfigAction {
    /// Write docpress.toml with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docpress=info",
        1 => "docpress=debug",
        _ => "docpress=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Command::Build { clean: cli.clean });

    let outcome = resolve_build_dir(cli.build_dir.as_deref()).and_then(|build_dir| {
        let explicit = cli.config.as_deref();
        match command {
            Command::Build { clean } => cmd_build(&build_dir, explicit, clean || cli.clean),
            Command::Assemble => cmd_assemble(&build_dir, explicit),
            Command::Check => cmd_check(&build_dir, explicit),
            Command::Manifest => cmd_manifest(&build_dir, explicit),
            Command::Config { action } => match action {
                ConfigAction::Init => cmd_config_init(&build_dir),
                ConfigAction::Show => cmd_config_show(&build_dir, explicit),
            },
        }
    });

    outcome.map_err(|e| {
        print_failure_banner(&e);
        e.into()
    })
}

/// The build directory as an absolute path, so every layout path is too.
fn resolve_build_dir(explicit: Option<&Path>) -> docpress_shared::Result<PathBuf> {
    match explicit {
        Some(dir) => std::path::absolute(dir).map_err(|e| DocpressError::io(dir, e)),
        None => std::env::current_dir().map_err(|e| DocpressError::io(".", e)),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(build_dir: &Path, explicit: Option<&Path>, clean: bool) -> docpress_shared::Result<()> {
    let config = load_config(build_dir, explicit)?;
    let layout = config.layout(build_dir);

    info!(
        build_dir = %build_dir.display(),
        documents = config.manifest().len(),
        clean,
        "starting build"
    );

    let converter = Pandoc::new(&config.tools.converter);
    let pages = PdfInfo::new(&config.tools.page_counter);
    let reporter = CliProgress::new();

    let report = pipeline::build(
        &config,
        &layout,
        BuildOptions { clean },
        &converter,
        &pages,
        &reporter,
    )?;

    print_summary(&report);
    Ok(())
}

fn cmd_assemble(build_dir: &Path, explicit: Option<&Path>) -> docpress_shared::Result<()> {
    let config = load_config(build_dir, explicit)?;
    let layout = config.layout(build_dir);
    let reporter = CliProgress::new();

    let result = pipeline::assemble_only(&config, &layout, &reporter)?;
    reporter.finish();

    println!();
    println!("  {}", "Combined document written".green().bold());
    println!("  Path:      {}", result.path.display());
    println!("  Documents: {}", result.document_count);
    println!("  Size:      {}", format_size(result.bytes as u64));
    println!("  SHA-256:   {}", result.sha256);
    println!();
    Ok(())
}

fn cmd_check(build_dir: &Path, explicit: Option<&Path>) -> docpress_shared::Result<()> {
    let config = load_config(build_dir, explicit)?;
    let layout = config.layout(build_dir);
    let reporter = CliProgress::new();

    let checked = pipeline::preflight(&config, &layout, &reporter)?;
    pipeline::check_descriptors(&layout)?;
    reporter.finish();

    println!();
    println!("  {}", "Sources look good".green().bold());
    println!("  Documents:       {}", checked.documents.len());
    println!("  Language guides: {}", checked.registry.guides);
    if !checked.registry.missing_optional.is_empty() {
        println!(
            "  Missing optional files: {}",
            checked.registry.missing_optional.len()
        );
    }
    println!();
    Ok(())
}

fn cmd_manifest(build_dir: &Path, explicit: Option<&Path>) -> docpress_shared::Result<()> {
    let config = load_config(build_dir, explicit)?;
    let docs = resolve_manifest(&config.manifest())?;
    let anchors = AnchorMap::from_paths(docs.iter().map(|d| d.path.as_str()));

    for doc in &docs {
        if let Some(title) = &doc.part_break {
            println!("{}", title.bold());
        }
        let anchor = anchors.get(&doc.path).unwrap_or_default();
        println!(
            "  {:>3}. {:<48} {}",
            doc.position + 1,
            doc.path,
            format!("#{anchor}").dimmed()
        );
    }
    Ok(())
}

fn cmd_config_init(build_dir: &Path) -> docpress_shared::Result<()> {
    let path = init_config(build_dir)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(build_dir: &Path, explicit: Option<&Path>) -> docpress_shared::Result<()> {
    let config: BuildConfig = load_config(build_dir, explicit)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| DocpressError::config(format!("cannot render config: {e}")))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_summary(report: &BuildReport) {
    let elapsed = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0;
    let pages = report
        .artifact
        .page_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unavailable".to_string());

    println!();
    println!("  {}", "Build succeeded".green().bold());
    println!("  Artifact:  {}", report.artifact.path.display());
    println!("  Size:      {}", format_size(report.artifact.size_bytes));
    println!("  Pages:     {pages}");
    println!("  Documents: {}", report.document_count);
    println!("  SHA-256:   {}", report.combined_sha256);
    println!("  Time:      {elapsed:.1}s");
    println!();
}

fn print_failure_banner(error: &DocpressError) {
    eprintln!();
    eprintln!(
        "  {}",
        format!("Build failed ({} error)", error.category()).red().bold()
    );
    eprintln!();
}

/// Human-readable byte count, e.g. `1.4 MiB (1468006 bytes)`.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {} ({bytes} bytes)", UNITS[unit])
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: coloured status lines plus an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message("Preparing build");
        Self { spinner }
    }

    fn line(&self, text: String) {
        self.spinner.suspend(|| println!("{text}"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: BuildStage, detail: &str) {
        if detail.is_empty() {
            self.line(format!("{} {}", "✓".green(), stage.label()));
        } else {
            self.line(format!(
                "{} {} {}",
                "✓".green(),
                stage.label(),
                format!("({detail})").dimmed()
            ));
        }
        self.spinner.set_message("Working");
    }

    fn converting(&self, converter: &str) {
        self.spinner
            .set_message(format!("Rendering PDF with {converter} (this can take a while)"));
    }

    fn warning(&self, message: &str) {
        self.line(format!("{} {}", "!".yellow().bold(), message.yellow()));
    }

    fn failed(&self, reached: BuildStage, error: &DocpressError) {
        self.finish();
        eprintln!(
            "{} failed after: {} ({} error)",
            "✗".red().bold(),
            reached.label(),
            error.category()
        );
    }

    fn done(&self, _report: &BuildReport) {
        self.finish();
    }
}
