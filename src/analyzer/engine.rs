/*!
# Analysis Engine

Пакетный анализ каталога исходников: проверка входных путей, поиск файлов,
параллельный разбор и прогон диагностик на выделенном пуле `rayon`.

Файлы обрабатываются независимо; внутри файла все последовательно. После
извлечения `FileInfo` дерево файла освобождается.
*/

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::cli_common::progress;
use crate::core::errors::{AnalyzerError, AnalyzerResult};
use crate::core::fs_utils::{collect_source_files, read_bsl_file};
use crate::core::results::{AnalysisInfo, FileInfo, FileMetrics};
use crate::diagnostics::parse_error::PARSE_ERROR_CODE;
use crate::diagnostics::DiagnosticRunner;
use crate::fingerprint::block_findings;
use crate::parser::BslParser;
use crate::rules::{RulesConfig, RulesManager};

static PARENT_REF: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\.\.[/\\]").ok());

const TEMPLATE_FILE: &str = "Template.txt";

/// Параметры пакетного запуска
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub workspace_dir: PathBuf,
    /// Каталог исходников как передан пользователем (относительно workspace)
    pub source_dir: String,
    /// Количество рабочих потоков; по умолчанию число CPU
    pub workers: Option<usize>,
    pub fail_fast: bool,
    /// Анализировать `.txt` шаблоны
    pub templates: bool,
    /// Считать отпечатки блоков
    pub fingerprint: bool,
    /// Без индикатора прогресса
    pub silent: bool,
    /// Отказы отдельных файлов в лог уровня error
    pub show_logs: bool,
}

impl AnalysisOptions {
    pub fn new(workspace_dir: impl Into<PathBuf>, source_dir: impl Into<String>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    /// Настройки из файла конфигурации; флаги командной строки имеют приоритет
    pub fn merge_settings(mut self, config: &RulesConfig) -> Self {
        self.workers = self.workers.or(config.settings.threads.filter(|t| *t > 0));
        self.fail_fast |= config.settings.fail_fast;
        self.templates |= config.settings.templates;
        self.fingerprint |= config.fingerprint.enabled;
        self
    }
}

pub struct AnalysisEngine {
    options: AnalysisOptions,
    config: Arc<RulesConfig>,
    runner: DiagnosticRunner,
    parser: BslParser,
}

impl AnalysisEngine {
    /// Движок с настроенными диагностиками; ошибка параметров правил фатальна
    pub fn new(options: AnalysisOptions, rules: &RulesManager) -> AnalyzerResult<Self> {
        let runner = rules
            .build_runner()
            .map_err(|e| AnalyzerError::Config(format!("{:#}", e)))?;
        let options = options.merge_settings(rules.config());
        Ok(Self {
            options,
            config: rules.shared_config(),
            runner,
            parser: BslParser::new(),
        })
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Фатальные проверки до начала анализа; возвращает каталог исходников
    pub fn check_inputs(&self) -> AnalyzerResult<PathBuf> {
        let workspace = &self.options.workspace_dir;
        if !workspace.is_dir() {
            return Err(AnalyzerError::WorkspaceNotFound(workspace.clone()));
        }

        // разрешен один выход вверх из workspace
        let parent_refs = PARENT_REF
            .as_ref()
            .map(|re| re.find_iter(&self.options.source_dir).count())
            .unwrap_or(0);
        if parent_refs > 1 {
            return Err(AnalyzerError::TooManyParentRefs(self.options.source_dir.clone()));
        }

        let source = workspace.join(&self.options.source_dir);
        if !source.is_dir() {
            return Err(AnalyzerError::SourceNotFound(source));
        }
        Ok(source)
    }

    fn extensions(&self) -> Vec<String> {
        let mut extensions = self.config.settings.extensions.clone();
        if self.options.templates && !extensions.iter().any(|e| e.eq_ignore_ascii_case("txt")) {
            extensions.push("txt".to_string());
        }
        extensions
    }

    /// Анализ всего каталога
    pub fn run(&self) -> AnalyzerResult<AnalysisInfo> {
        let source = self.check_inputs()?;
        let files = collect_source_files(&source, &self.extensions());
        info!("Found {} source files in {}", files.len(), source.display());

        let workers = self.options.workers.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| AnalyzerError::ThreadPool(e.to_string()))?;
        debug!("Configured {} worker threads for parallel analysis", workers);

        let cancelled = AtomicBool::new(false);
        let bar = progress::file_progress(files.len() as u64, self.options.silent);

        let outcomes: Vec<Option<AnalyzerResult<FileInfo>>> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if cancelled.load(Ordering::SeqCst) {
                        return None;
                    }
                    let outcome = self.process_file(path);
                    if outcome.is_err() {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                    bar.inc(1);
                    Some(outcome)
                })
                .collect()
        });
        bar.finish_and_clear();

        let mut file_info = Vec::with_capacity(outcomes.len());
        for outcome in outcomes.into_iter().flatten() {
            file_info.push(outcome?);
        }

        info!("Analyzed {} files", file_info.len());
        Ok(AnalysisInfo::new(file_info, source.display().to_string()))
    }

    /// Один файл пакета: отказ дает пустой результат, либо ошибку при fail-fast
    fn process_file(&self, path: &Path) -> AnalyzerResult<FileInfo> {
        let relative = path
            .strip_prefix(&self.options.workspace_dir)
            .unwrap_or(path)
            .to_path_buf();

        let outcome = read_bsl_file(path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                catch_unwind(AssertUnwindSafe(|| self.analyze_text(&text, relative.clone())))
                    .map_err(|_| "panic during analysis".to_string())
            });

        match outcome {
            Ok(info) => Ok(info),
            Err(reason) if self.options.fail_fast => Err(AnalyzerError::FileFailed {
                path: path.to_path_buf(),
                reason,
            }),
            Err(reason) => {
                if self.options.show_logs {
                    error!("Failed to analyze {}: {}", path.display(), reason);
                } else {
                    debug!("Failed to analyze {}: {}", path.display(), reason);
                }
                Ok(FileInfo::empty(relative))
            }
        }
    }

    /// Анализ текста одного файла; `path` попадает в результат как есть
    pub fn analyze_text(&self, text: &str, path: PathBuf) -> FileInfo {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);

        if is_txt && file_name != TEMPLATE_FILE {
            return FileInfo::empty(path);
        }

        let parsed = self.parser.parse(text);
        let label = path.display().to_string();
        let mut diagnostics = self.runner.run(&parsed.tree, &label);

        // первая строка макета не является кодом
        if file_name == TEMPLATE_FILE {
            if let Some(index) = diagnostics.iter().position(|d| d.code == PARSE_ERROR_CODE) {
                diagnostics.remove(index);
            }
        }

        let blocks = self
            .options
            .fingerprint
            .then(|| block_findings(&parsed.tree, &diagnostics, &self.config.fingerprint.codes));

        let metrics = FileMetrics::from_tree(&parsed.tree);
        debug!("{}: {} diagnostics", label, diagnostics.len());

        FileInfo { path, diagnostics, metrics, blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(options: AnalysisOptions) -> AnalysisEngine {
        AnalysisEngine::new(options, &RulesManager::new()).unwrap()
    }

    #[test]
    fn parent_refs_are_limited() {
        let dir = TempDir::new().unwrap();
        let e = engine(AnalysisOptions::new(dir.path(), "../../src"));
        assert!(matches!(e.check_inputs(), Err(AnalyzerError::TooManyParentRefs(_))));

        let e = engine(AnalysisOptions::new(dir.path(), "missing"));
        assert!(matches!(e.check_inputs(), Err(AnalyzerError::SourceNotFound(_))));

        let e = engine(AnalysisOptions::new(dir.path().join("nope"), "."));
        assert!(matches!(e.check_inputs(), Err(AnalyzerError::WorkspaceNotFound(_))));
    }

    #[test]
    fn templates_mode() {
        let mut options = AnalysisOptions::new(".", ".");
        options.templates = true;
        let e = engine(options);

        let info = e.analyze_text("Текст = а = а;", PathBuf::from("Form/Help.txt"));
        assert!(info.diagnostics.is_empty());

        let info = e.analyze_text("{1,\nА = б = б;", PathBuf::from("Ext/Template.txt"));
        let codes: Vec<&str> = info.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert!(!codes.is_empty());
        assert_eq!(
            codes.iter().filter(|c| **c == PARSE_ERROR_CODE).count() + 1,
            e.parser.parse("{1,\nА = б = б;").errors.len()
        );
    }

    #[test]
    fn fingerprint_flag_adds_blocks() {
        let mut options = AnalysisOptions::new(".", ".");
        let source = "Процедура А()\n\tБ = в = в;\nКонецПроцедуры";
        let plain = engine(options.clone()).analyze_text(source, PathBuf::from("a.bsl"));
        assert!(plain.blocks.is_none());

        options.fingerprint = true;
        let info = engine(options).analyze_text(source, PathBuf::from("a.bsl"));
        let blocks = info.blocks.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code_diagnostics[0].code, "IdenticalExpressions");
    }

    #[test]
    fn settings_from_config() {
        let mut config = RulesConfig::default();
        config.settings.threads = Some(3);
        config.settings.fail_fast = true;
        config.fingerprint.enabled = true;
        let options = AnalysisOptions::new(".", ".").merge_settings(&config);
        assert_eq!(options.workers, Some(3));
        assert!(options.fail_fast && options.fingerprint && !options.templates);

        let mut cli = AnalysisOptions::new(".", ".");
        cli.workers = Some(1);
        assert_eq!(cli.merge_settings(&config).workers, Some(1));
    }
}
