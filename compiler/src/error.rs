//! Compiler error types.

use rulec_parser::Span;
use thiserror::Error;

/// Errors that can occur during compilation.
///
/// Every variant carries the line and column of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Name does not satisfy the identifier grammar.
    #[error("Invalid {kind} name '{name}'")]
    InvalidName {
        kind: &'static str,
        name: String,
        line: usize,
        column: usize,
    },

    /// Name collides with a reserved word.
    #[error("The {kind} name '{name}' is a reserved word")]
    ReservedWord {
        kind: &'static str,
        name: String,
        line: usize,
        column: usize,
    },

    /// Name declared twice in the same namespace.
    #[error("Multiple definition of {kind} name '{name}'")]
    DuplicateDeclaration {
        kind: &'static str,
        name: String,
        line: usize,
        column: usize,
    },

    /// Numeric ID already used by another declaration.
    #[error("Duplicate {kind} ID {id}")]
    DuplicateId {
        kind: &'static str,
        id: u32,
        line: usize,
        column: usize,
    },

    /// Single-use directive repeated inside one declaration.
    #[error("Duplicate '{directive}' directive in {kind} definition")]
    DuplicateDirective {
        kind: &'static str,
        directive: &'static str,
        line: usize,
        column: usize,
    },

    /// Declaration keyword not followed by a name.
    #[error("The {kind} definition is missing a name")]
    MissingDeclarationName {
        kind: &'static str,
        line: usize,
        column: usize,
    },

    /// Required directive absent from a declaration.
    #[error("The {kind} definition is missing the '{directive}' directive")]
    MissingDirective {
        kind: &'static str,
        directive: &'static str,
        line: usize,
        column: usize,
    },

    /// Too few arguments for a match, action, or directive.
    #[error("{message}")]
    MissingArgument {
        message: String,
        line: usize,
        column: usize,
    },

    /// Malformed or out-of-range literal.
    #[error("{message}")]
    InvalidValue {
        message: String,
        line: usize,
        column: usize,
    },

    /// `include` of a macro that was never declared.
    #[error("Macro '{name}' is not defined")]
    UndefinedMacro {
        name: String,
        line: usize,
        column: usize,
    },

    /// `$variable` with no binding in the current macro expansion.
    #[error("Undefined variable '{name}'")]
    UndefinedVariable {
        name: String,
        line: usize,
        column: usize,
    },

    /// Unknown word where a match keyword was expected.
    #[error("Unrecognized match type '{keyword}'")]
    UnrecognizedMatch {
        keyword: String,
        line: usize,
        column: usize,
    },

    /// Unknown word where an action, directive, or declaration keyword was expected.
    #[error("Unrecognized {context} '{keyword}'")]
    UnrecognizedDirective {
        context: &'static str,
        keyword: String,
        line: usize,
        column: usize,
    },

    /// Nested block where a word was expected.
    #[error("Unexpected block; expected a keyword")]
    UnexpectedBlock { line: usize, column: usize },

    /// A macro includes itself, directly or through other macros.
    #[error("Macro '{name}' includes itself ({chain})")]
    MacroRecursionLimitExceeded {
        name: String,
        chain: String,
        line: usize,
        column: usize,
    },
}

impl CompileError {
    pub fn invalid_name(kind: &'static str, name: impl Into<String>, span: Span) -> Self {
        Self::InvalidName {
            kind,
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn reserved_word(kind: &'static str, name: impl Into<String>, span: Span) -> Self {
        Self::ReservedWord {
            kind,
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn duplicate_declaration(kind: &'static str, name: impl Into<String>, span: Span) -> Self {
        Self::DuplicateDeclaration {
            kind,
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn duplicate_id(kind: &'static str, id: u32, span: Span) -> Self {
        Self::DuplicateId {
            kind,
            id,
            line: span.line,
            column: span.column,
        }
    }

    pub fn duplicate_directive(kind: &'static str, directive: &'static str, span: Span) -> Self {
        Self::DuplicateDirective {
            kind,
            directive,
            line: span.line,
            column: span.column,
        }
    }

    pub fn missing_declaration_name(kind: &'static str, span: Span) -> Self {
        Self::MissingDeclarationName {
            kind,
            line: span.line,
            column: span.column,
        }
    }

    pub fn missing_directive(kind: &'static str, directive: &'static str, span: Span) -> Self {
        Self::MissingDirective {
            kind,
            directive,
            line: span.line,
            column: span.column,
        }
    }

    pub fn missing_argument(message: impl Into<String>, span: Span) -> Self {
        Self::MissingArgument {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn invalid_value(message: impl Into<String>, span: Span) -> Self {
        Self::InvalidValue {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn undefined_macro(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedMacro {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn undefined_variable(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unrecognized_match(keyword: impl Into<String>, span: Span) -> Self {
        Self::UnrecognizedMatch {
            keyword: keyword.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unrecognized_directive(
        context: &'static str,
        keyword: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnrecognizedDirective {
            context,
            keyword: keyword.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn unexpected_block(span: Span) -> Self {
        Self::UnexpectedBlock {
            line: span.line,
            column: span.column,
        }
    }

    pub fn macro_recursion(name: impl Into<String>, chain: &[String], span: Span) -> Self {
        let name = name.into();
        let mut path = chain.to_vec();
        path.push(name.clone());
        Self::MacroRecursionLimitExceeded {
            name,
            chain: path.join(" -> "),
            line: span.line,
            column: span.column,
        }
    }

    /// Line and column of the offending token.
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::InvalidName { line, column, .. }
            | Self::ReservedWord { line, column, .. }
            | Self::DuplicateDeclaration { line, column, .. }
            | Self::DuplicateId { line, column, .. }
            | Self::DuplicateDirective { line, column, .. }
            | Self::MissingDeclarationName { line, column, .. }
            | Self::MissingDirective { line, column, .. }
            | Self::MissingArgument { line, column, .. }
            | Self::InvalidValue { line, column, .. }
            | Self::UndefinedMacro { line, column, .. }
            | Self::UndefinedVariable { line, column, .. }
            | Self::UnrecognizedMatch { line, column, .. }
            | Self::UnrecognizedDirective { line, column, .. }
            | Self::UnexpectedBlock { line, column }
            | Self::MacroRecursionLimitExceeded { line, column, .. } => (*line, *column),
        }
    }

    pub fn line(&self) -> usize {
        self.position().0
    }

    pub fn column(&self) -> usize {
        self.position().1
    }
}

/// Result type for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
