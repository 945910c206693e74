use crate::{
    language::errors::{ConfigurationError, SyntaxError, SyntaxErrors},
    runtime::error::RuntimeError,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help,
            message: err.message,
            label: "here".into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(bindplan::configuration))]
pub struct ConfigurationDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl ConfigurationDiagnostic {
    pub fn from_error(src: NamedSource, err: &ConfigurationError) -> Self {
        let span = err.span();
        Self {
            src,
            span: (span.start, span.len()).into(),
            help: err.help(),
            message: err.to_string(),
            label: err.label().into(),
        }
    }
}

pub fn emit_syntax_errors(name: &str, source: &str, errors: &SyntaxErrors) {
    for err in &errors.errors {
        let src = NamedSource::new(name, source.to_string());
        let diagnostic = SyntaxDiagnostic::from_error(src, err.clone());
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn emit_configuration_error(name: &str, source: &str, error: &ConfigurationError) {
    let src = NamedSource::new(name, source.to_string());
    let diagnostic = ConfigurationDiagnostic::from_error(src, error);
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::Span;

    #[test]
    fn configuration_diagnostic_points_at_the_parameter() {
        let error = ConfigurationError::DuplicateParameter {
            name: "a".into(),
            span: Span::new(4, 5),
        };
        let src = NamedSource::new("params", "(a, a)".to_string());
        let diagnostic = ConfigurationDiagnostic::from_error(src, &error);
        assert_eq!(diagnostic.span, SourceSpan::from((4, 1)));
        assert_eq!(diagnostic.label, "bound again here");
        assert_eq!(diagnostic.to_string(), "duplicated argument name `a`");
        assert!(diagnostic
            .help
            .as_deref()
            .is_some_and(|help| help.contains('_')));
    }

    #[test]
    fn syntax_diagnostic_keeps_help() {
        let err = SyntaxError::new("Expected ')'", Span::new(2, 3)).with_help("close it");
        let src = NamedSource::new("params", "(a".to_string());
        let diagnostic = SyntaxDiagnostic::from_error(src, err);
        assert_eq!(diagnostic.help.as_deref(), Some("close it"));
        assert_eq!(diagnostic.span, SourceSpan::from((2, 1)));
    }
}
