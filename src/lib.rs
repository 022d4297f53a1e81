//! ilify — the code-generation core of a source-to-source translator.
//!
//! The crate consumes a fully resolved syntax tree plus a queryable
//! semantic model (both produced by an external front-end) and emits a
//! textual program that, when executed against a metadata-construction
//! library, assembles an equivalent stack-machine encoded module.
//!
//! Generation is a bounded, deterministic, single-threaded pass: identical
//! input yields identical output or an identical fatal abort.

pub mod ast;
pub mod diagnostic;
pub mod gen;
pub mod naming;
pub mod op;
pub mod sem;
pub mod span;
pub mod spelling;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ast::Module;
use diagnostic::Diagnostic;
use gen::Generator;
use sem::{SemanticModel, SymbolId, TypeId};

/// A fatal generation failure. Every variant indicates a violated input
/// contract or an internal invariant, never a policy choice: generation
/// aborts, there is nothing to retry.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("unresolved symbol for expression at {line},{col}")]
    UnresolvedSymbol { line: u32, col: u32 },
    #[error("unknown type id {0}")]
    UnknownType(TypeId),
    #[error("unknown symbol id {0}")]
    UnknownSymbol(SymbolId),
    #[error("no definition registered for '{name}'")]
    MissingDefinition { name: String },
    #[error("unsupported construct '{name}' at {line},{col}")]
    UnsupportedConstruct { name: String, line: u32, col: u32 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Options controlling generation.
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Reject unsupported constructs instead of degrading them to a
    /// comment record.
    pub strict: bool,
    /// Interleave comments echoing the originating source constructs.
    pub source_comments: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            strict: false,
            source_comments: true,
        }
    }
}

impl GenOptions {
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_source_comments(mut self, source_comments: bool) -> Self {
        self.source_comments = source_comments;
        self
    }
}

/// Everything the front-end hands over for one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilationInput {
    /// Name of the originating source, echoed in diagnostics.
    pub source_name: String,
    /// Source text, if the front-end shares it; used only to render
    /// diagnostics with context.
    #[serde(default)]
    pub source: Option<String>,
    pub module: Module,
    pub model: SemanticModel,
}

/// The emitted program plus the diagnostics gathered while generating it.
#[derive(Clone, Debug)]
pub struct GenOutput {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generate the builder program for `input` with default options.
pub fn generate(input: &CompilationInput) -> Result<GenOutput, GenError> {
    generate_with_options(input, &GenOptions::default())
}

/// Generate the builder program for `input`.
pub fn generate_with_options(
    input: &CompilationInput,
    options: &GenOptions,
) -> Result<GenOutput, GenError> {
    let generator = Generator::new(&input.module, &input.model, options.clone());
    let (text, diagnostics) = generator.run()?;
    Ok(GenOutput { text, diagnostics })
}
