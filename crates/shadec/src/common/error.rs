//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic as Report, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use super::Span;
use crate::frontend::sema::{Diagnostic, SemanticError};

/// Fatal compile error
///
/// Checker findings are not fatal and travel as [`Diagnostic`]s instead; they
/// only surface here when code generation is requested for a program that
/// still has some.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    #[error("Code generation error: {message}")]
    Codegen { message: String },

    #[error("refusing to generate code: program has {} unresolved diagnostic(s)", .diagnostics.len())]
    UncheckedProgram { diagnostics: Vec<Diagnostic> },

    #[error("Malformed container: {message}")]
    Container { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::Codegen {
            message: message.into(),
        }
    }

    pub fn container(message: impl Into<String>) -> Self {
        Self::Container {
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Renders errors and checker diagnostics against their source text
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::with_color(ColorChoice::Auto)
    }

    pub fn with_color(color: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(color),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        match error {
            CompileError::Lexer { message, span } => self.emit(
                Report::error()
                    .with_message("Lexer error")
                    .with_labels(vec![Label::primary(file_id, span.range()).with_message(message)]),
            ),

            CompileError::Parser { message, span } => self.emit(
                Report::error()
                    .with_message("Syntax error")
                    .with_labels(vec![Label::primary(file_id, span.range()).with_message(message)]),
            ),

            CompileError::UncheckedProgram { diagnostics } => {
                for diagnostic in diagnostics {
                    self.report_diagnostic(file_id, diagnostic);
                }
            }

            other => self.emit(Report::error().with_message(other.to_string())),
        }
    }

    pub fn report_diagnostic(&self, file_id: usize, diagnostic: &Diagnostic) {
        let mut labels = vec![Label::primary(file_id, diagnostic.span.range())];
        if let SemanticError::DeclConflict { previous, .. } = &diagnostic.error {
            labels.push(
                Label::secondary(file_id, previous.range()).with_message("previously declared here"),
            );
        }

        self.emit(
            Report::error()
                .with_message(diagnostic.error.to_string())
                .with_labels(labels),
        );
    }

    fn emit(&self, report: Report<usize>) {
        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &report);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
