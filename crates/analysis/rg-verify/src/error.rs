//! Violations found while verifying a function body.

use miette::Diagnostic;
use rg_notation::NotationError;
use rg_ops::ErrorKind;
use rg_span::FileSpan;
use thiserror::Error;

/// A reference-safety violation.
///
/// `name` fields hold the source-level name of the storage involved, as
/// printed in messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Diagnostic)]
pub enum VerifyError {
    /// A reference conflicts with a live reference to the same storage.
    #[error("cannot reference `{name}`: it is already referenced in a conflicting way")]
    #[diagnostic(
        code(refgraph::reference_protection),
        help("a mutable reference excludes every other reference to the same storage")
    )]
    ReferenceProtection {
        /// Referenced storage
        name: String,
        /// Location of the new reference
        span: FileSpan,
    },

    /// A mutable reference would be stored inside what it references.
    #[error("storing a mutable reference to `{name}` inside itself")]
    #[diagnostic(code(refgraph::mutable_references_loop))]
    MutableReferencesLoop {
        /// Referenced storage
        name: String,
        /// Location
        span: FileSpan,
    },

    /// References were linked where the signature does not allow it.
    #[error("unallowed reference pollution of `{name}`")]
    #[diagnostic(
        code(refgraph::unallowed_reference_pollution),
        help("declare the pollution in the function signature")
    )]
    UnallowedReferencePollution {
        /// Polluted storage
        name: String,
        /// Location
        span: FileSpan,
    },

    /// A value declared before a loop got new references inside it.
    #[error("reference pollution of `{name}`, declared outside of the loop")]
    #[diagnostic(code(refgraph::outer_loop_pollution))]
    OuterLoopPollution {
        /// Polluted storage
        name: String,
        /// Location of the loop
        span: FileSpan,
    },

    /// Returned value references storage the signature does not allow.
    #[error("returning a reference to `{name}` is not allowed by the signature")]
    #[diagnostic(
        code(refgraph::returning_unallowed_reference),
        help("add the parameter's reference tag to the return notation")
    )]
    ReturningUnallowedReference {
        /// Storage the returned value references
        name: String,
        /// Location of the return
        span: FileSpan,
    },

    /// A destructor observes a mutable reference of the destroyed value.
    #[error("accessing field `{field}` with mutable references inside a destructor")]
    #[diagnostic(code(refgraph::destructor_field_access))]
    DestructorFieldAccess {
        /// Field accessed
        field: String,
        /// Location
        span: FileSpan,
    },

    /// Use of a moved value.
    #[error("accessing moved variable `{name}`")]
    #[diagnostic(code(refgraph::accessing_moved_variable))]
    AccessingMovedVariable {
        /// Moved variable
        name: String,
        /// Location of the access
        span: FileSpan,
    },

    /// A variable was moved in some branches only.
    #[error("variable `{name}` is moved in some branches but not in others")]
    #[diagnostic(
        code(refgraph::conditional_move),
        help("move the variable in every branch or in none")
    )]
    ConditionalMove {
        /// Conditionally moved variable
        name: String,
        /// Location of the branching statement
        span: FileSpan,
    },

    /// A variable declared outside a loop was moved inside it.
    #[error("moving variable `{name}`, declared outside of the loop")]
    #[diagnostic(code(refgraph::outer_variable_move_inside_loop))]
    OuterVariableMoveInsideLoop {
        /// Moved variable
        name: String,
        /// Location of the loop
        span: FileSpan,
    },

    /// Moving a value that is still referenced.
    #[error("moving variable `{name}`, which still has references")]
    #[diagnostic(code(refgraph::moved_variable_has_references))]
    MovedVariableHasReferences {
        /// Moved variable
        name: String,
        /// Location of the move
        span: FileSpan,
    },

    /// Storage destroyed while still referenced.
    #[error("destroyed variable `{name}` still has references")]
    #[diagnostic(code(refgraph::destroyed_variable_still_has_references))]
    DestroyedVariableStillHasReferences {
        /// Destroyed storage
        name: String,
        /// Location where it is destroyed
        span: FileSpan,
    },

    /// Operation requires a named local variable.
    #[error("expected a local variable")]
    #[diagnostic(code(refgraph::expected_variable))]
    ExpectedVariable {
        /// Location of the operand
        span: FileSpan,
    },

    /// Operation requires a mutable value.
    #[error("expected a mutable value")]
    #[diagnostic(code(refgraph::expected_reference_value))]
    ExpectedReferenceValue {
        /// Location of the operand
        span: FileSpan,
    },

    /// Decomposition of a named value.
    #[error("expected an immediate value in decompose declaration")]
    #[diagnostic(
        code(refgraph::immediate_value_expected),
        help("move the value out first")
    )]
    ImmediateValueExpected {
        /// Location of the initializer
        span: FileSpan,
    },

    /// Statement after a terminal statement.
    #[error("unreachable code")]
    #[diagnostic(code(refgraph::unreachable_code))]
    UnreachableCode {
        /// First unreachable statement
        span: FileSpan,
    },

    /// `break` or `continue` outside a loop.
    #[error("`break` or `continue` outside of a loop")]
    #[diagnostic(code(refgraph::break_outside_loop))]
    BreakOutsideLoop {
        /// Location
        span: FileSpan,
    },

    /// Unknown variable, function, field or type.
    #[error("{what} `{name}` not found")]
    #[diagnostic(code(refgraph::name_not_found))]
    NameNotFound {
        /// What was looked up
        what: &'static str,
        /// Name looked up
        name: String,
        /// Location of the use
        span: FileSpan,
    },

    /// Invalid reference notation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Notation(#[from] NotationError),
}

impl VerifyError {
    /// Diagnostic kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReferenceProtection { .. } => ErrorKind::ReferenceProtectionError,
            Self::MutableReferencesLoop { .. } => ErrorKind::CreatingMutableReferencesLoop,
            Self::UnallowedReferencePollution { .. } => ErrorKind::UnallowedReferencePollution,
            Self::OuterLoopPollution { .. } => ErrorKind::ReferencePollutionOfOuterLoopVariable,
            Self::ReturningUnallowedReference { .. } => ErrorKind::ReturningUnallowedReference,
            Self::DestructorFieldAccess { .. } => {
                ErrorKind::AccessingFieldWithMutableReferencesInsideInDestructor
            }
            Self::AccessingMovedVariable { .. } => ErrorKind::AccessingMovedVariable,
            Self::ConditionalMove { .. } => ErrorKind::ConditionalMove,
            Self::OuterVariableMoveInsideLoop { .. } => ErrorKind::OuterVariableMoveInsideLoop,
            Self::MovedVariableHasReferences { .. } => ErrorKind::MovedVariableHasReferences,
            Self::DestroyedVariableStillHasReferences { .. } => {
                ErrorKind::DestroyedVariableStillHasReferences
            }
            Self::ExpectedVariable { .. } => ErrorKind::ExpectedVariable,
            Self::ExpectedReferenceValue { .. } => ErrorKind::ExpectedReferenceValue,
            Self::ImmediateValueExpected { .. } => {
                ErrorKind::ImmediateValueExpectedInDecomposeDeclaration
            }
            Self::UnreachableCode { .. } => ErrorKind::UnreachableCode,
            Self::BreakOutsideLoop { .. } => ErrorKind::BreakOutsideLoop,
            Self::NameNotFound { .. } => ErrorKind::NameNotFound,
            Self::Notation(error) => error.kind(),
        }
    }

    /// Returns the primary source location for this error.
    pub fn span(&self) -> FileSpan {
        match self {
            Self::ReferenceProtection { span, .. }
            | Self::MutableReferencesLoop { span, .. }
            | Self::UnallowedReferencePollution { span, .. }
            | Self::OuterLoopPollution { span, .. }
            | Self::ReturningUnallowedReference { span, .. }
            | Self::DestructorFieldAccess { span, .. }
            | Self::AccessingMovedVariable { span, .. }
            | Self::ConditionalMove { span, .. }
            | Self::OuterVariableMoveInsideLoop { span, .. }
            | Self::MovedVariableHasReferences { span, .. }
            | Self::DestroyedVariableStillHasReferences { span, .. }
            | Self::ExpectedVariable { span }
            | Self::ExpectedReferenceValue { span }
            | Self::ImmediateValueExpected { span }
            | Self::UnreachableCode { span }
            | Self::BreakOutsideLoop { span }
            | Self::NameNotFound { span, .. } => *span,
            Self::Notation(error) => error.span(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_span::{FileId, Span};

    #[test]
    fn test_kind_and_span() {
        let span = FileSpan::new(FileId(0), Span::new(4, 9));
        let error = VerifyError::ReferenceProtection {
            name: "x".to_string(),
            span,
        };
        assert_eq!(error.kind(), ErrorKind::ReferenceProtectionError);
        assert_eq!(error.span(), span);
        assert_eq!(
            error.to_string(),
            "cannot reference `x`: it is already referenced in a conflicting way"
        );
    }

    #[test]
    fn test_notation_errors_keep_their_kind() {
        let span = FileSpan::new(FileId(0), Span::new(0, 3));
        let error = VerifyError::from(NotationError::SelfPollution {
            function: "f".to_string(),
            tag: "a".to_string(),
            span,
        });
        assert_eq!(error.kind(), ErrorKind::SelfReferencePollution);
        assert_eq!(error.span(), span);
    }
}
