/*!
# BSL Analyzer CLI

Command-line interface for the BSL (1C:Enterprise) analyzer core.
*/

use anyhow::{Context, Result};
use bsl_analyzer_core::analyzer::{AnalysisEngine, AnalysisOptions};
use bsl_analyzer_core::cli_common::{
    self, format_duration, print_error, print_header, print_success, print_warning,
};
use bsl_analyzer_core::fingerprint::{code_blocks, Fingerprint};
use bsl_analyzer_core::parser::BslParser;
use bsl_analyzer_core::reports::{parse_reporters, ReportManager};
use bsl_analyzer_core::rules::{RulesConfig, RulesManager};
use bsl_analyzer_core::AnalyzerError;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "bsl-analyzer",
    version = env!("CARGO_PKG_VERSION"),
    author = "BSL Analyzer Team",
    about = "BSL (1C:Enterprise) analyzer: redundant expressions and block fingerprints"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source tree
    Analyze {
        /// Workspace (project root) directory
        #[arg(short, long, default_value = ".")]
        workspace_dir: PathBuf,

        /// Source directory relative to the workspace
        #[arg(short, long, default_value = "src")]
        src_dir: String,

        /// Output directory for file reports
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Path to rules configuration file (toml, yaml, json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reporter keys: console, json
        #[arg(short, long = "reporter", default_value = "console", value_delimiter = ',')]
        reporters: Vec<String>,

        /// Hide the progress bar
        #[arg(short = 'q', long)]
        silent: bool,

        /// Group findings by code block fingerprints
        #[arg(long, visible_alias = "1C")]
        fingerprint: bool,

        /// Report per-file failures as errors
        #[arg(long)]
        logs: bool,

        /// Analyze `.txt` templates too
        #[arg(long)]
        templates: bool,

        /// Stop after the first failed file
        #[arg(long)]
        fail_fast: bool,

        /// Number of parallel workers
        #[arg(short = 'j', long)]
        workers: Option<usize>,
    },

    /// Print fingerprints of the code blocks of one file
    Fingerprint {
        /// BSL file
        file: PathBuf,

        /// Also print canonical forms
        #[arg(long)]
        canonical: bool,
    },

    /// Write an example rules configuration
    InitConfig {
        /// Target file
        #[arg(default_value = "bsl-rules.toml")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = cli_common::init_logging(cli.verbose) {
        eprintln!("{}", e);
    }

    let outcome = match cli.command {
        Commands::Analyze {
            workspace_dir,
            src_dir,
            output_dir,
            config,
            reporters,
            silent,
            fingerprint,
            logs,
            templates,
            fail_fast,
            workers,
        } => {
            let options = AnalysisOptions {
                workspace_dir,
                source_dir: src_dir,
                workers,
                fail_fast,
                templates,
                fingerprint,
                silent,
                show_logs: logs,
            };
            analyze_command(options, config, reporters, output_dir)
        }
        Commands::Fingerprint { file, canonical } => fingerprint_command(file, canonical),
        Commands::InitConfig { path } => init_config_command(path),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::from(1)
        }
    }
}

fn analyze_command(
    options: AnalysisOptions,
    config: Option<PathBuf>,
    reporters: Vec<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let start = Instant::now();

    // все фатальные проверки до начала анализа
    let formats = parse_reporters(&reporters)?;
    // предупреждения валидации from_file пишет в лог
    let rules = match config {
        Some(path) => RulesManager::from_file(&path)
            .map_err(|e| AnalyzerError::Config(format!("{:#}", e)))?,
        None => RulesManager::new(),
    };

    let engine = AnalysisEngine::new(options, &rules)?;
    let source = engine.check_inputs()?;
    if !engine.options().silent {
        print_header(
            "BSL Analyzer",
            env!("CARGO_PKG_VERSION"),
            "Redundant expressions and block fingerprints",
        );
    }
    info!(
        "Analyzing {} with reporters [{}]",
        source.display(),
        formats.iter().map(|f| f.key()).collect::<Vec<_>>().join(", ")
    );

    let analysis = engine.run()?;

    ReportManager::new(output_dir).write_reports(&analysis, &formats, &mut std::io::stdout())?;

    if !engine.options().silent {
        print_success(&format!(
            "Analyzed {} files in {}",
            analysis.file_info.len(),
            format_duration(start.elapsed())
        ));
    }
    Ok(())
}

fn fingerprint_command(file: PathBuf, canonical: bool) -> Result<()> {
    cli_common::validate_path(&file, "File")?;
    let parsed = BslParser::new()
        .parse_file(&file)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    for error in &parsed.errors {
        print_warning(&format!("{}: {}", error.range.start, error.message));
    }

    for block in code_blocks(&parsed.tree) {
        let fingerprint = Fingerprint::of(&parsed.tree, block.node);
        println!(
            "{} {} lines {}-{}",
            style(&fingerprint.hash).green(),
            style(block.kind.canonical_name()).cyan(),
            block.first_line,
            block.last_line
        );
        if canonical {
            println!("{}", style(&fingerprint.canonical_form).dim());
        }
    }
    Ok(())
}

fn init_config_command(path: PathBuf) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    RulesConfig::create_example_config(&path)?;
    print_success(&format!("Example configuration written to {}", path.display()));
    Ok(())
}
