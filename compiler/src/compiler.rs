//! Main compiler implementation.

use crate::actions::Renderer;
use crate::declare::Declarations;
use crate::CompileResult;
use rulec_core::{Capability, Policy};
use rulec_parser::{build_blocks, Lexer};

/// Progress of a [`Compiler`] through one source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Nothing compiled yet.
    Idle,
    Lexing,
    BlockBuilding,
    ResolvingDeclarations,
    RenderingCapabilities,
    RenderingBase,
    Done,
    /// Compilation stopped at the first error.
    Failed(crate::CompileError),
}

/// The Compiler transforms rule source into a [`Policy`].
pub struct Compiler {
    stage: Stage,
}

impl Compiler {
    /// Create a new compiler.
    pub fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    /// The stage reached by the last call to [`Compiler::compile`].
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Compile rule source into a Policy.
    pub fn compile(&mut self, source: &str) -> CompileResult<Policy> {
        match self.run(source) {
            Ok(policy) => {
                self.advance(Stage::Done);
                Ok(policy)
            }
            Err(err) => {
                tracing::debug!(line = err.line(), column = err.column(), %err, "compilation failed");
                self.stage = Stage::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn run(&mut self, source: &str) -> CompileResult<Policy> {
        self.advance(Stage::Lexing);
        let tokens = Lexer::new(source).tokenize();

        self.advance(Stage::BlockBuilding);
        let root = build_blocks(tokens);

        self.advance(Stage::ResolvingDeclarations);
        let decls = Declarations::resolve(root)?;
        let renderer = Renderer::new(&decls);

        self.advance(Stage::RenderingCapabilities);
        let mut capabilities = Vec::with_capacity(decls.capabilities.len());
        for def in &decls.capabilities {
            let mut capability = Capability::new(&def.name, def.id, def.default);
            capability.rules = renderer.render(&def.body)?;
            tracing::debug!(
                capability = %capability.name,
                id = capability.id,
                rules = capability.rules.len(),
                "rendered capability"
            );
            capabilities.push(capability);
        }

        self.advance(Stage::RenderingBase);
        let rules = renderer.render(&decls.base)?;
        tracing::debug!(rules = rules.len(), "rendered base rule set");

        Ok(Policy {
            rules,
            capabilities,
            tags: decls.tags.clone(),
        })
    }

    fn advance(&mut self, stage: Stage) {
        tracing::trace!(?stage, "compiler stage");
        self.stage = stage;
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to compile rule source.
pub fn compile(source: &str) -> CompileResult<Policy> {
    Compiler::new().compile(source)
}
