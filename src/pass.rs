//! Pass pipeline interface.
//!
//! A driver runs passes in plan order over one [`FrontendContext`]. Each
//! pass has a stable [`PassId`], declares the passes it depends on as a
//! [`PassMask`], and goes through `init`, `run` and `dispose`. This crate
//! provides the `preprocess` and `parse` passes; `semantic` and `ir-gen`
//! are identities reserved for later stages.

use crate::config::FrontendConfig;
use crate::diagnostics::Diagnostics;
use crate::error::FrontendError;
use crate::parser::ast::Ast;
use crate::parser::Parser;
use crate::preprocess::include::{FsSourceReader, SourceReader};
use crate::preprocess::Preprocessor;
use crate::source::SourceLocation;
use crate::unit::CompileUnit;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassId {
    Preprocess = 0,
    Parse = 1,
    Semantic = 2,
    IrGen = 3,
}

impl PassId {
    pub const ALL: [PassId; 4] = [PassId::Preprocess, PassId::Parse, PassId::Semantic, PassId::IrGen];

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            PassId::Preprocess => "preprocess",
            PassId::Parse => "parse",
            PassId::Semantic => "semantic",
            PassId::IrGen => "ir-gen",
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of passes, one bit per [`PassId`] ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PassMask(u32);

impl PassMask {
    pub const EMPTY: PassMask = PassMask(0);

    pub const fn of(id: PassId) -> Self {
        PassMask(1 << id as u32)
    }

    pub const fn with(self, id: PassId) -> Self {
        PassMask(self.0 | 1 << id as u32)
    }

    pub fn insert(&mut self, id: PassId) {
        *self = self.with(id);
    }

    pub fn contains(self, id: PassId) -> bool {
        self.0 & PassMask::of(id).0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = PassId> {
        PassId::ALL.into_iter().filter(move |&id| self.contains(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDesc {
    pub name: &'static str,
    pub doc: &'static str,
    pub id: PassId,
    pub deps: PassMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Ok,
    /// The pass ran but reported errors
    Failed,
    Skipped,
}

pub trait Pass {
    type State;

    fn desc(&self) -> &'static PassDesc;

    fn init(&self, ctx: &mut FrontendContext) -> Result<Self::State, FrontendError>;

    fn run(&self, ctx: &mut FrontendContext, config: &FrontendConfig, state: &mut Self::State) -> PassStatus;

    fn dispose(&self, ctx: &mut FrontendContext, state: Self::State);
}

/// What the preprocess pass reads.
#[derive(Debug, Clone)]
pub enum SourceInput {
    File(PathBuf),
    Memory { name: String, text: Vec<u8> },
}

/// State shared by the passes of one translation unit.
pub struct FrontendContext {
    input: SourceInput,
    reader: Option<Box<dyn SourceReader>>,
    pub preprocessor: Option<Preprocessor>,
    pub ast: Option<Ast>,
    pub unit: Option<CompileUnit>,
    completed: PassMask,
    fatal: Option<FrontendError>,
}

impl FrontendContext {
    pub fn new(input: SourceInput, reader: Box<dyn SourceReader>) -> Self {
        Self {
            input,
            reader: Some(reader),
            preprocessor: None,
            ast: None,
            unit: None,
            completed: PassMask::EMPTY,
            fatal: None,
        }
    }

    /// Context reading `path` and its includes from the file system.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceInput::File(path.into()), Box::new(FsSourceReader))
    }

    pub fn for_source(name: &str, text: &str, reader: Box<dyn SourceReader>) -> Self {
        let input = SourceInput::Memory {
            name: name.to_string(),
            text: text.as_bytes().to_vec(),
        };
        Self::new(input, reader)
    }

    pub fn completed(&self) -> PassMask {
        self.completed
    }

    /// Diagnostics of the furthest stage that has run.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match (&self.unit, &self.preprocessor) {
            (Some(unit), _) => Some(&unit.diagnostics),
            (None, Some(pp)) => Some(&pp.unit().diagnostics),
            (None, None) => None,
        }
    }

    fn take_reader(&mut self) -> Box<dyn SourceReader> {
        self.reader.take().unwrap_or_else(|| Box::new(FsSourceReader))
    }
}

static PREPROCESS_DESC: PassDesc = PassDesc {
    name: "preprocess",
    doc: "Open the input and set up macro expansion, conditionals and includes",
    id: PassId::Preprocess,
    deps: PassMask::EMPTY,
};

static PARSE_DESC: PassDesc = PassDesc {
    name: "parse",
    doc: "Build the AST of the translation unit",
    id: PassId::Parse,
    deps: PassMask::of(PassId::Preprocess),
};

/// Creates the [`Preprocessor`] over the context's input. Tokens are pulled
/// lazily by whichever stage consumes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreprocessPass;

impl Pass for PreprocessPass {
    type State = ();

    fn desc(&self) -> &'static PassDesc {
        &PREPROCESS_DESC
    }

    fn init(&self, _ctx: &mut FrontendContext) -> Result<(), FrontendError> {
        Ok(())
    }

    fn run(&self, ctx: &mut FrontendContext, config: &FrontendConfig, _state: &mut ()) -> PassStatus {
        let mut pp = Preprocessor::new(config, ctx.take_reader());
        let pushed = match &ctx.input {
            SourceInput::File(path) => pp.push_file(path),
            SourceInput::Memory { name, text } => pp.push_source(name, text).map_err(FrontendError::from),
        };

        let status = match pushed {
            Ok(()) => PassStatus::Ok,
            Err(FrontendError::Lex(err)) => {
                pp.unit_mut().error(err.location, err.kind.to_string());
                PassStatus::Failed
            }
            Err(err) => {
                pp.unit_mut().error(SourceLocation::default(), err.to_string());
                ctx.fatal = Some(err);
                PassStatus::Failed
            }
        };
        ctx.preprocessor = Some(pp);
        status
    }

    fn dispose(&self, _ctx: &mut FrontendContext, _state: ()) {}
}

/// Parses the preprocessed token stream into the context's AST.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsePass;

impl Pass for ParsePass {
    type State = Option<Preprocessor>;

    fn desc(&self) -> &'static PassDesc {
        &PARSE_DESC
    }

    fn init(&self, ctx: &mut FrontendContext) -> Result<Self::State, FrontendError> {
        match ctx.preprocessor.take() {
            Some(pp) => Ok(Some(pp)),
            None => Err(FrontendError::MissingDependency {
                pass: PARSE_DESC.name,
                missing: PREPROCESS_DESC.name,
            }),
        }
    }

    fn run(&self, ctx: &mut FrontendContext, config: &FrontendConfig, state: &mut Self::State) -> PassStatus {
        let Some(pp) = state.take() else {
            return PassStatus::Skipped;
        };
        let outcome = Parser::new(pp, &config.limits).parse_translation_unit();
        let status = if outcome.has_errors() {
            PassStatus::Failed
        } else {
            PassStatus::Ok
        };
        ctx.ast = Some(outcome.ast);
        ctx.unit = Some(outcome.unit);
        status
    }

    fn dispose(&self, ctx: &mut FrontendContext, state: Self::State) {
        // An unconsumed preprocessor goes back to the context
        if let Some(pp) = state {
            ctx.preprocessor = Some(pp);
        }
    }
}

/// Run one pass through its whole lifecycle.
pub fn run_pass<P: Pass>(
    pass: &P,
    ctx: &mut FrontendContext,
    config: &FrontendConfig,
) -> Result<PassStatus, FrontendError> {
    let desc = pass.desc();
    if let Some(missing) = desc.deps.iter().find(|&dep| !ctx.completed.contains(dep)) {
        return Err(FrontendError::MissingDependency {
            pass: desc.name,
            missing: missing.name(),
        });
    }

    let _span = tracing::info_span!("pass", name = desc.name).entered();
    let mut state = pass.init(ctx)?;
    let status = pass.run(ctx, config, &mut state);
    pass.dispose(ctx, state);
    tracing::debug!(?status, "pass finished");

    if let Some(err) = ctx.fatal.take() {
        return Err(err);
    }
    if status != PassStatus::Skipped {
        ctx.completed.insert(desc.id);
    }
    Ok(status)
}

/// Run every pass of `config.plan` in order. Stops after the first pass
/// that reports errors.
pub fn run_plan(ctx: &mut FrontendContext, config: &FrontendConfig) -> Result<PassStatus, FrontendError> {
    let mut last = PassStatus::Skipped;
    for &id in &config.plan.passes {
        last = match id {
            PassId::Preprocess => run_pass(&PreprocessPass, ctx, config)?,
            PassId::Parse => run_pass(&ParsePass, ctx, config)?,
            PassId::Semantic | PassId::IrGen => {
                tracing::warn!(pass = %id, "pass is not provided by this front-end; skipped");
                PassStatus::Skipped
            }
        };
        if last == PassStatus::Failed {
            break;
        }
    }
    Ok(last)
}
