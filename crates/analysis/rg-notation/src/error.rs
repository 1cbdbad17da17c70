//! Errors in declared reference notation.

use miette::Diagnostic;
use rg_ops::ErrorKind;
use rg_span::FileSpan;
use thiserror::Error;

/// Result type for notation lookups.
pub type NotationResult<T> = Result<T, NotationError>;

/// Invalid reference notation in a composite or signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Diagnostic)]
pub enum NotationError {
    /// Mutable and immutable references merged into one tag.
    #[error("reference tag `{tag}` of `{owner}` mixes mutable and immutable references")]
    #[diagnostic(code(refgraph::mixing_mutability))]
    MixingMutability {
        /// Composite declaring the tag
        owner: String,
        /// Offending tag
        tag: String,
        /// Field that introduced the conflict
        span: FileSpan,
    },

    /// Second-order references of different mutability merged into one tag.
    #[error(
        "second-order references under tag `{tag}` of `{owner}` mix mutable and immutable references"
    )]
    #[diagnostic(code(refgraph::mixing_second_order_mutability))]
    MixingSecondOrderMutability {
        /// Composite declaring the tag
        owner: String,
        /// Offending tag
        tag: String,
        /// Field that introduced the conflict
        span: FileSpan,
    },

    /// A reference field points to a type with several inner tags.
    #[error("reference field `{field}` of `{owner}` needs more than one inner reference tag")]
    #[diagnostic(
        code(refgraph::second_order_tag_count),
        help("a type referenced by a field may contain at most one inner reference tag")
    )]
    MoreThanOneInnerTag {
        /// Composite declaring the field
        owner: String,
        /// Reference field
        field: String,
        /// Field location
        span: FileSpan,
    },

    /// Reference chain deeper than two levels.
    #[error("reference field `{field}` of `{owner}` exceeds the reference indirection depth")]
    #[diagnostic(
        code(refgraph::indirection_depth),
        help("a referenced type may only contain first-order references")
    )]
    IndirectionDepthExceeded {
        /// Composite declaring the field
        owner: String,
        /// Reference field
        field: String,
        /// Field location
        span: FileSpan,
    },

    /// Inner tag list has the wrong length.
    #[error("expected {expected} inner reference tags for `{name}`, found {found}")]
    #[diagnostic(code(refgraph::inner_tag_count))]
    InnerTagCountMismatch {
        /// Field or parameter
        name: String,
        /// Tags of its type
        expected: usize,
        /// Tags declared
        found: usize,
        /// Declaration location
        span: FileSpan,
    },

    /// Reference field without a tag.
    #[error("reference field `{field}` of `{owner}` has no reference tag")]
    #[diagnostic(code(refgraph::missing_reference_tag))]
    MissingReferenceTag {
        /// Composite declaring the field
        owner: String,
        /// Reference field
        field: String,
        /// Field location
        span: FileSpan,
    },

    /// Unknown composite or tag.
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

    /// `dst <- dst` pollution.
    #[error("function `{function}` declares pollution of tag `{tag}` by itself")]
    #[diagnostic(code(refgraph::self_pollution))]
    SelfPollution {
        /// Declaring function
        function: String,
        /// Tag
        tag: String,
        /// Function location
        span: FileSpan,
    },

    /// Pollution destination is a parameter reference rather than an inner tag.
    #[error("pollution destination `{tag}` of `{function}` is not an inner reference tag")]
    #[diagnostic(
        code(refgraph::arg_pollution),
        help("only references stored inside an argument can be polluted")
    )]
    ArgPollution {
        /// Declaring function
        function: String,
        /// Tag
        tag: String,
        /// Function location
        span: FileSpan,
    },
}

impl NotationError {
    /// Diagnostic kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MixingMutability { .. } => {
                ErrorKind::MixingMutableAndImmutableReferencesInSameReferenceTag
            }
            Self::MixingSecondOrderMutability { .. } => {
                ErrorKind::MixingMutableAndImmutableSecondOrderReferencesInSameReferenceTag
            }
            Self::MoreThanOneInnerTag { .. } => {
                ErrorKind::MoreThanOneInnerReferenceTagForSecondOrderReferenceField
            }
            Self::IndirectionDepthExceeded { .. } => ErrorKind::ReferenceIndirectionDepthExceeded,
            Self::InnerTagCountMismatch { .. } => ErrorKind::InnerReferenceTagCountMismatch,
            Self::MissingReferenceTag { .. } => ErrorKind::ExpectedReferenceNotation,
            Self::NameNotFound { .. } => ErrorKind::NameNotFound,
            Self::SelfPollution { .. } => ErrorKind::SelfReferencePollution,
            Self::ArgPollution { .. } => ErrorKind::ArgReferencePollution,
        }
    }

    /// Returns the primary source location for this error.
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::MixingMutability { span, .. }
            | Self::MixingSecondOrderMutability { span, .. }
            | Self::MoreThanOneInnerTag { span, .. }
            | Self::IndirectionDepthExceeded { span, .. }
            | Self::InnerTagCountMismatch { span, .. }
            | Self::MissingReferenceTag { span, .. }
            | Self::NameNotFound { span, .. }
            | Self::SelfPollution { span, .. }
            | Self::ArgPollution { span, .. } => *span,
        }
    }
}
