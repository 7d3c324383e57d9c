//! CLI утилита для проверки синтаксиса BSL файлов

use anyhow::Result;
use bsl_analyzer_core::ast_core::SyntaxError;
use bsl_analyzer_core::core::fs_utils::collect_source_files;
use bsl_analyzer_core::parser::BslParser;
use clap::Parser as ClapParser;
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(ClapParser, Debug)]
#[command(
    name = "syntaxcheck",
    about = "Проверяет синтаксис BSL файлов",
    long_about = "Утилита для быстрой проверки синтаксиса BSL файлов встроенным парсером"
)]
struct Args {
    /// Путь к файлу или директории для проверки
    #[arg(help = "Файл .bsl/.os или директория с файлами")]
    path: PathBuf,

    /// Формат вывода
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Показать статистику
    #[arg(short, long)]
    stats: bool,

    /// Тихий режим (только код возврата)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Default)]
struct CheckStats {
    files_checked: usize,
    files_with_errors: usize,
    total_errors: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(stats) => {
            if args.stats && !args.quiet {
                print_stats(&stats);
            }
            // ненулевой код, если были ошибки
            if stats.files_with_errors > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", style("Ошибка:").red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<CheckStats> {
    let files = if args.path.is_file() {
        vec![args.path.clone()]
    } else if args.path.is_dir() {
        collect_source_files(&args.path, &["bsl".to_string(), "os".to_string()])
    } else {
        anyhow::bail!("{} не является файлом или директорией", args.path.display());
    };

    let parser = BslParser::new();
    let mut stats = CheckStats::default();

    for path in &files {
        let result = parser.parse_file(path)?;
        stats.files_checked += 1;
        stats.total_errors += result.errors.len();
        if result.has_errors() {
            stats.files_with_errors += 1;
        }

        if args.quiet {
            continue;
        }
        match args.format {
            OutputFormat::Human => print_human_format(&result.errors, path),
            OutputFormat::Json => print_json_format(&result.errors, path)?,
        }
    }

    Ok(stats)
}

fn print_human_format(errors: &[SyntaxError], path: &Path) {
    for error in errors {
        println!("{}: {}", style("error").red().bold(), error.message);
        println!(
            "  --> {}:{}:{}",
            path.display(),
            error.range.start.line,
            error.range.start.column
        );
        println!();
    }
}

fn print_json_format(errors: &[SyntaxError], path: &Path) -> Result<()> {
    let diagnostics: Vec<_> = errors
        .iter()
        .map(|error| {
            serde_json::json!({
                "message": error.message,
                "line": error.range.start.line,
                "column": error.range.start.column,
            })
        })
        .collect();

    let output = serde_json::json!({
        "file": path.display().to_string(),
        "diagnostics": diagnostics,
        "hasErrors": !errors.is_empty(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_stats(stats: &CheckStats) {
    println!();
    println!("{}", style("=== Статистика проверки ===").bold());
    println!("Проверено файлов: {}", stats.files_checked);
    println!("Файлов с ошибками: {}", stats.files_with_errors);
    println!(
        "Всего ошибок: {}",
        if stats.total_errors > 0 {
            style(stats.total_errors).red()
        } else {
            style(stats.total_errors).green()
        }
    );
}
