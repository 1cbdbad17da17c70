//! Reported diagnostics: an error plus where it happened.

use crate::error::VerifyError;
use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use miette::Diagnostic as _;
use rg_ops::{ErrorKind, Instantiation};
use rg_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One template instantiation enclosing a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstantiationFrame {
    /// Template name with its argument bindings
    pub description: String,
    /// Point of instantiation
    pub span: Span,
}

impl InstantiationFrame {
    /// Frames of `inst`, innermost first.
    pub fn trail(inst: &Instantiation) -> Vec<Self> {
        inst.chain()
            .map(|frame| Self {
                description: frame.to_string(),
                span: frame.span,
            })
            .collect()
    }
}

impl fmt::Display for InstantiationFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in instantiation of {} (at {})", self.description, self.span)
    }
}

/// A violation with its function and instantiation context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// The violation
    pub error: VerifyError,
    /// Function being verified; `None` for errors in composite declarations
    pub function: Option<String>,
    /// Enclosing template instantiations, innermost first
    pub trail: Vec<InstantiationFrame>,
}

impl Diagnostic {
    /// Diagnostic outside of any function.
    pub fn new(error: VerifyError) -> Self {
        Self {
            error,
            function: None,
            trail: Vec::new(),
        }
    }

    /// Attaches the function being verified.
    #[must_use]
    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Attaches an instantiation trail.
    #[must_use]
    pub fn with_trail(mut self, trail: Vec<InstantiationFrame>) -> Self {
        self.trail = trail;
        self
    }

    /// Diagnostic kind.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Primary location.
    pub fn span(&self) -> Span {
        self.error.span().span
    }

    /// Convert to codespan diagnostic for rendering.
    pub fn to_codespan_diagnostic(&self, file_id: usize) -> CodespanDiagnostic<usize> {
        let mut message = self.error.to_string();
        if let Some(function) = &self.function {
            message = format!("{message} (in `{function}`)");
        }
        let mut notes: Vec<String> = self.trail.iter().map(ToString::to_string).collect();
        if let Some(help) = self.error.help() {
            notes.push(format!("help: {help}"));
        }
        CodespanDiagnostic::error()
            .with_message(message)
            .with_code(self.kind().to_string())
            .with_labels(vec![
                Label::primary(file_id, self.span().range()).with_message(self.kind().to_string()),
            ])
            .with_notes(notes)
    }

    /// Flat record for machine-readable output.
    pub fn to_record(&self) -> DiagnosticRecord {
        DiagnosticRecord {
            kind: self.kind(),
            function: self.function.clone(),
            start: self.span().start,
            end: self.span().end,
            message: self.error.to_string(),
            trail: self.trail.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}] at {}", self.kind(), self.span())?;
        if let Some(function) = &self.function {
            write!(f, " in `{function}`")?;
        }
        write!(f, ": {}", self.error)?;
        for frame in &self.trail {
            write!(f, "\n  note: {frame}")?;
        }
        Ok(())
    }
}

/// JSON form of a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// Diagnostic kind
    pub kind: ErrorKind,
    /// Function being verified
    pub function: Option<String>,
    /// Start offset
    pub start: u32,
    /// End offset
    pub end: u32,
    /// Message
    pub message: String,
    /// Instantiation trail, innermost first
    pub trail: Vec<InstantiationFrame>,
}

/// Renders diagnostics against their source text with codespan.
///
/// Falls back to the plain [`Display`](fmt::Display) form for a diagnostic
/// whose location does not fit `source`.
pub fn render_diagnostics(file_name: &str, source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut files = SimpleFiles::new();
    let file_id = files.add(file_name, source);
    let config = term::Config::default();
    let mut output = String::new();
    for diagnostic in diagnostics {
        let mut buffer = Vec::new();
        let codespan = diagnostic.to_codespan_diagnostic(file_id);
        #[allow(deprecated, reason = "`term::emit` is the writer entry point of this codespan-reporting release")]
        let result = term::emit(&mut buffer, &config, &files, &codespan);
        match result {
            Ok(()) => output.push_str(&String::from_utf8_lossy(&buffer)),
            Err(err) => {
                log::warn!("cannot render diagnostic against {file_name}: {err}");
                output.push_str(&diagnostic.to_string());
                output.push('\n');
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_ops::TemplateArg;
    use rg_span::{FileId, FileSpan};

    fn make_moved(start: u32, end: u32) -> Diagnostic {
        Diagnostic::new(VerifyError::AccessingMovedVariable {
            name: "x".to_string(),
            span: FileSpan::new(FileId(0), Span::new(start, end)),
        })
        .in_function("main")
    }

    fn make_instantiation() -> Instantiation {
        Instantiation {
            template: "swap".to_string(),
            args: vec![TemplateArg {
                param: "T".to_string(),
                value: "Point".to_string(),
            }],
            span: Span::new(40, 52),
            parent: Some(Box::new(Instantiation {
                template: "sort".to_string(),
                args: vec![TemplateArg {
                    param: "T".to_string(),
                    value: "Point".to_string(),
                }],
                span: Span::new(7, 20),
                parent: None,
            })),
        }
    }

    #[test]
    fn test_display() {
        let diagnostic = make_moved(3, 4);
        assert_eq!(
            diagnostic.to_string(),
            "error[AccessingMovedVariable] at 3..4 in `main`: accessing moved variable `x`"
        );
    }

    #[test]
    fn test_display_with_trail() {
        let diagnostic = make_moved(3, 4).with_trail(InstantiationFrame::trail(&make_instantiation()));
        assert_eq!(
            diagnostic.to_string(),
            "error[AccessingMovedVariable] at 3..4 in `main`: accessing moved variable `x`\n  \
             note: in instantiation of `swap` with T = Point (at 40..52)\n  \
             note: in instantiation of `sort` with T = Point (at 7..20)"
        );
    }

    #[test]
    fn test_codespan_diagnostic() {
        let diagnostic = make_moved(3, 4).with_trail(InstantiationFrame::trail(&make_instantiation()));
        let codespan = diagnostic.to_codespan_diagnostic(0);
        assert_eq!(codespan.labels.len(), 1);
        assert_eq!(codespan.labels[0].range, 3..4);
        assert_eq!(codespan.notes.len(), 2);
        assert!(codespan.message.contains("`x`"));
    }

    #[test]
    fn test_render() {
        let source = "let y = x;\n";
        let output = render_diagnostics("main.rg", source, &[make_moved(8, 9)]);
        assert!(output.contains("accessing moved variable `x`"));
        assert!(output.contains("main.rg"));
    }

    #[test]
    fn test_record() {
        let record = make_moved(3, 4).to_record();
        assert_eq!(record.kind, ErrorKind::AccessingMovedVariable);
        assert_eq!((record.start, record.end), (3, 4));
        assert_eq!(record.function.as_deref(), Some("main"));
    }
}
