use crate::language::{ast::GroupKind, span::Span};
use miette::SourceSpan;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        (self.span.start, self.span.len()).into()
    }
}

#[derive(Clone, Debug)]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }
}

/// A parameter list that cannot be lowered. Raised once, at definition time.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{group} `{parameter}` cannot follow a {after}")]
    OutOfOrder {
        parameter: String,
        group: GroupKind,
        after: GroupKind,
        span: Span,
    },
    #[error("{group} `{parameter}` is recorded at position {recorded} but declared at {declared}")]
    PositionMismatch {
        parameter: String,
        group: GroupKind,
        recorded: usize,
        declared: usize,
        span: Span,
    },
    #[error("duplicated argument name `{name}`")]
    DuplicateParameter { name: String, span: Span },
    #[error("{group} `{parameter}` cannot be a destructuring group")]
    DestructuringNotAllowed {
        parameter: String,
        group: GroupKind,
        span: Span,
    },
    #[error("destructuring `{parameter}` is only allowed in block parameters")]
    DestructuringInMethod { parameter: String, span: Span },
    #[error("default value of `{parameter}` refers to `{name}`, which is not bound before it")]
    UnresolvedName {
        parameter: String,
        name: String,
        span: Span,
    },
}

impl ConfigurationError {
    pub fn span(&self) -> Span {
        match self {
            ConfigurationError::OutOfOrder { span, .. }
            | ConfigurationError::PositionMismatch { span, .. }
            | ConfigurationError::DuplicateParameter { span, .. }
            | ConfigurationError::DestructuringNotAllowed { span, .. }
            | ConfigurationError::DestructuringInMethod { span, .. }
            | ConfigurationError::UnresolvedName { span, .. } => *span,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfigurationError::OutOfOrder { .. } => "declared out of order",
            ConfigurationError::PositionMismatch { .. } => "inconsistent position",
            ConfigurationError::DuplicateParameter { .. } => "bound again here",
            ConfigurationError::DestructuringNotAllowed { .. } => "destructuring group",
            ConfigurationError::DestructuringInMethod { .. } => "destructuring group",
            ConfigurationError::UnresolvedName { .. } => "not yet bound",
        }
    }

    pub fn help(&self) -> Option<String> {
        match self {
            ConfigurationError::OutOfOrder { .. } => Some(
                "Parameters go in the order: required, optional, *rest, required, &block".into(),
            ),
            ConfigurationError::DuplicateParameter { name, .. } => Some(format!(
                "Rename one of the `{name}` parameters, or prefix it with `_`"
            )),
            ConfigurationError::DestructuringInMethod { .. } => {
                Some("Use block syntax `|...|` to destructure arguments".into())
            }
            ConfigurationError::UnresolvedName { name, .. } => Some(format!(
                "Declare `{name}` before this parameter, or use a literal default"
            )),
            ConfigurationError::PositionMismatch { .. }
            | ConfigurationError::DestructuringNotAllowed { .. } => None,
        }
    }
}
