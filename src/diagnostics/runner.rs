//! Запуск набора диагностик по одному дереву за один обход.
//!
//! Каждая диагностика изолирована: ошибка или паника внутри неё отключает
//! только её до конца файла, уже собранные замечания сохраняются.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::Result;
use tracing::{debug, error};

use crate::ast_core::{walk, NodeId, SyntaxKind, SyntaxNode, SyntaxTree, VisitControl, Visitor};

use super::{BslDiagnostic, Diagnostic, DiagnosticContext, DiagnosticSeverity, DiagnosticStorage};

struct RegisteredPass {
    pass: Box<dyn BslDiagnostic>,
    severity: DiagnosticSeverity,
}

/// Настроенный набор диагностик; разделяется между потоками только для чтения
pub struct DiagnosticRunner {
    passes: Vec<RegisteredPass>,
    dispatch: HashMap<SyntaxKind, Vec<usize>>,
}

impl DiagnosticRunner {
    /// Диагностики с серьезностью по умолчанию
    pub fn from_passes(passes: Vec<Box<dyn BslDiagnostic>>) -> Self {
        Self::with_severities(
            passes
                .into_iter()
                .map(|pass| {
                    let severity = pass.info().severity();
                    (pass, severity)
                })
                .collect(),
        )
    }

    pub fn with_severities(passes: Vec<(Box<dyn BslDiagnostic>, DiagnosticSeverity)>) -> Self {
        let mut dispatch: HashMap<SyntaxKind, Vec<usize>> = HashMap::new();
        let passes: Vec<RegisteredPass> = passes
            .into_iter()
            .enumerate()
            .map(|(index, (pass, severity))| {
                for kind in pass.node_kinds() {
                    dispatch.entry(*kind).or_default().push(index);
                }
                RegisteredPass { pass, severity }
            })
            .collect();
        Self { passes, dispatch }
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Коды подключенных диагностик в порядке регистрации
    pub fn codes(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.pass.info().code).collect()
    }

    /// Все замечания по файлу, упорядоченные по позиции
    pub fn run(&self, tree: &SyntaxTree, file: &str) -> Vec<Diagnostic> {
        let mut states: Vec<PassState> = self
            .passes
            .iter()
            .map(|p| PassState {
                storage: DiagnosticStorage::new(p.pass.info().code, p.severity),
                skipped_at: None,
                disabled: false,
            })
            .collect();

        for (registered, state) in self.passes.iter().zip(states.iter_mut()) {
            let pass = registered.pass.as_ref();
            let outcome = guarded(|| {
                let mut ctx = DiagnosticContext { tree, storage: &mut state.storage };
                pass.check_file(&mut ctx)
            });
            if let Err(reason) = outcome {
                disable(state, pass, file, &reason);
            }
        }

        if !self.dispatch.is_empty() {
            let mut visitor = RunnerVisitor { runner: self, states: &mut states, file };
            walk(tree, tree.root(), &mut visitor);
        }

        let mut diagnostics: Vec<Diagnostic> = states
            .into_iter()
            .flat_map(|state| state.storage.into_diagnostics())
            .collect();
        diagnostics.sort_by_key(|d| (d.line(), d.column()));
        debug!("{}: {} diagnostics", file, diagnostics.len());
        diagnostics
    }
}

struct PassState {
    storage: DiagnosticStorage,
    /// Узел, потомки которого пропускаются этой диагностикой
    skipped_at: Option<NodeId>,
    disabled: bool,
}

struct RunnerVisitor<'r> {
    runner: &'r DiagnosticRunner,
    states: &'r mut [PassState],
    file: &'r str,
}

impl Visitor for RunnerVisitor<'_> {
    fn enter(&mut self, id: NodeId, node: &SyntaxNode, tree: &SyntaxTree) -> VisitControl {
        let Some(indexes) = self.runner.dispatch.get(&node.kind) else {
            return VisitControl::Continue;
        };

        for &index in indexes {
            let state = &mut self.states[index];
            if state.disabled || state.skipped_at.is_some() {
                continue;
            }
            let pass = self.runner.passes[index].pass.as_ref();
            let outcome = guarded(|| {
                let mut ctx = DiagnosticContext { tree, storage: &mut state.storage };
                pass.visit(&mut ctx, id)
            });
            match outcome {
                Ok(VisitControl::Continue) => {}
                Ok(VisitControl::SkipChildren) => state.skipped_at = Some(id),
                Ok(VisitControl::Stop) => state.disabled = true,
                Err(reason) => disable(state, pass, self.file, &reason),
            }
        }

        if self.states.iter().all(|s| s.disabled) {
            VisitControl::Stop
        } else {
            VisitControl::Continue
        }
    }

    fn leave(&mut self, id: NodeId, _node: &SyntaxNode, _tree: &SyntaxTree) {
        for state in self.states.iter_mut() {
            if state.skipped_at == Some(id) {
                state.skipped_at = None;
            }
        }
    }
}

fn guarded<T>(call: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(payload) => Err(format!("panic: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn disable(state: &mut PassState, pass: &dyn BslDiagnostic, file: &str, reason: &str) {
    error!(diagnostic = pass.info().code, file, "Diagnostic failed and is disabled for this file: {}", reason);
    state.disabled = true;
}


impl std::fmt::Debug for DiagnosticRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticRunner")
            .field("codes", &self.codes())
            .finish_non_exhaustive()
    }
}
