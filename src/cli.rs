//! Command-line interface for domlens.

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::analyze::{AnalysisMode, Depth, Inspector, RootSpec, RunRequest, Scheduler};
use crate::document::Document;
use crate::export::ExportDocument;
use crate::report;
use crate::settings::{self, Settings, SETTINGS_FILE_NAMES};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_INCOMPLETE: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Format accepted by `--timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Inspect a subtree of an HTML document.
///
/// For every element below the chosen root, domlens reports the style rules
/// that match it, the properties it inherits, and the script text that
/// refers to it, then exports the findings as Markdown, CSS and HTML files.
#[derive(Parser)]
#[command(name = "domlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a subtree of an HTML file
    #[command(visible_alias = "inspect")]
    Analyze(AnalyzeArgs),
    /// Write a settings file with the default values
    Init(InitArgs),
    /// Print the effective settings
    Settings(SettingsArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// HTML file to analyze
    pub file: PathBuf,

    /// Selector of the root element (default: the document element)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Recursion depth: none, 1, 2, 3 or all
    #[arg(short, long, default_value = "all")]
    pub depth: String,

    /// Analysis mode: full, structure, style, behavior, structure-style or architecture
    #[arg(short, long, default_value = "full")]
    pub mode: String,

    /// Selector of the element whose computed styles are reported
    #[arg(long)]
    pub select: Option<String>,

    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override a setting, as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Directory to write export documents into
    #[arg(short, long)]
    pub export_dir: Option<PathBuf>,

    /// Timestamp used in export names and headers (YYYY-MM-DDTHH:MM:SS, default: now)
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Elements analyzed between two progress updates
    #[arg(long, default_value_t = crate::analyze::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Stop the run once it has taken this many seconds
    #[arg(long)]
    pub max_duration_secs: Option<u64>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "domlens.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the settings command.
#[derive(Parser)]
pub struct SettingsArgs {
    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override a setting, as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// List the accepted keys instead
    #[arg(long)]
    pub keys: bool,
}

const SETTINGS_TEMPLATE: &str = include_str!("templates/domlens.yaml");

/// Load settings from an explicit file, else the first file found in
/// `search_dirs`, else defaults. Overrides apply last.
pub fn load_settings(
    config: Option<&Path>,
    search_dirs: &[&Path],
    overrides: &[String],
) -> anyhow::Result<Settings> {
    let path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => search_dirs.iter().find_map(|dir| Settings::discover(dir)),
    };
    let mut loaded = match &path {
        Some(path) => Settings::parse_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    loaded
        .apply_overrides(overrides)
        .context("applying --set overrides")?;
    settings::validate(&loaded).context("invalid settings")?;
    Ok(loaded)
}

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let depth: Depth = match args.depth.parse() {
        Ok(depth) => depth,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let mode: AnalysisMode = match args.mode.parse() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let timestamp = match &args.timestamp {
        Some(text) => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .with_context(|| format!("invalid --timestamp {:?}", text))?,
        None => Local::now().naive_local(),
    };

    let doc = Document::load(&args.file)?;
    let doc_dir = doc.base_dir().map(Path::to_path_buf).unwrap_or_default();
    let settings = load_settings(
        args.config.as_deref(),
        &[doc_dir.as_path(), Path::new(".")],
        &args.overrides,
    )?;

    let root = match &args.root {
        Some(query) => RootSpec::Query(query.clone()),
        None => RootSpec::Node(doc.root()),
    };
    let request = RunRequest::new(root).depth(depth).mode(mode);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;

    let mut inspector = Inspector::new(doc).with_settings(settings);
    let token = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new()
        .batch_size(args.batch_size)
        .cancellation(token.clone())
        .max_duration(args.max_duration_secs.map(Duration::from_secs))
        .progress(tx);

    let bar = if args.format == "pretty" {
        let bar = ProgressBar::new(0);
        bar.set_style(create_bar_style());
        bar.set_message("analyzing");
        bar
    } else {
        ProgressBar::hidden()
    };

    let outcome = runtime.block_on(async {
        let run = inspector.run(&request, &scheduler);
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => break result.map(|_| ()),
                Some(progress) = rx.recv() => {
                    bar.set_length(progress.total as u64);
                    bar.set_position(progress.processed as u64);
                }
                _ = tokio::signal::ctrl_c(), if !token.is_cancelled() => {
                    token.cancel();
                }
            }
        }
    });

    if let Err(e) = outcome {
        bar.abandon_with_message("stopped");
        eprintln!("Error: {}", e);
        return Ok(if e.is_interrupted() {
            EXIT_INCOMPLETE
        } else {
            EXIT_ERROR
        });
    }
    bar.finish_and_clear();

    if let Some(query) = &args.select {
        let node = inspector.document().query(query)?;
        if !inspector.select(node).is_analyzed() {
            eprintln!(
                "Warning: {} was not part of the analyzed subtree; keeping the root selected",
                query
            );
        }
    }

    let mut exported: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &args.export_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        let mut documents: Vec<ExportDocument> = inspector.export(timestamp)?;
        if args.select.is_some() && !mode.is_architecture() {
            documents.push(inspector.export_selected(timestamp)?);
        }
        for document in &documents {
            exported.push(document.write_to(dir)?);
        }
    }

    let context = inspector
        .context()
        .context("run finished without a context")?;
    let file = args.file.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&file, inspector.document(), context, &exported)?,
        _ => report::write_pretty(&file, inspector.document(), context, &exported),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it, pass --force, or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, SETTINGS_TEMPLATE) {
        eprintln!("Error: failed to write settings: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to adjust limits and toggles", args.output.display());
    println!("  2. Run: domlens analyze page.html --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// Run the settings command.
pub fn run_settings(args: &SettingsArgs) -> anyhow::Result<i32> {
    if args.keys {
        for key in settings::SETTING_KEYS {
            println!("{}", key);
        }
        return Ok(EXIT_SUCCESS);
    }

    let effective = load_settings(args.config.as_deref(), &[Path::new(".")], &args.overrides)?;
    if args.config.is_none() {
        if let Some(found) = Settings::discover(".") {
            println!("# from {}", found.display());
        } else {
            println!("# defaults (no {} found)", SETTINGS_FILE_NAMES.join(" or "));
        }
    }
    print!("{}", effective);
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_template_parses_to_defaults() {
        let parsed: Settings = serde_yaml::from_str(SETTINGS_TEMPLATE).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn test_load_settings_precedence() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("domlens.yaml"),
            "max_text_length: 80\njs_context_size: 20\n",
        )
        .unwrap();

        let loaded = load_settings(None, &[temp.path()], &["jsContextSize=5".to_string()]).unwrap();
        assert_eq!(loaded.max_text_length, 80);
        assert_eq!(loaded.js_context_size, 5);
        assert_eq!(loaded.max_export_size, 1_000_000);

        let defaults = load_settings(None, &[], &[]).unwrap();
        assert_eq!(defaults, Settings::default());

        assert!(load_settings(None, &[], &["max_export_size=0".to_string()]).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("domlens.yaml");
        let args = InitArgs {
            output: output.clone(),
            force: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
        assert_eq!(
            run_init(&InitArgs {
                output,
                force: true
            })
            .unwrap(),
            EXIT_SUCCESS
        );
    }
}
