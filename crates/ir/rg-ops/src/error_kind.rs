//! Diagnostic kinds produced by the verifier.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Every kind of diagnostic the verifier reports.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs, reason = "variant names are the documented diagnostic kinds")]
pub enum ErrorKind {
    // Aliasing
    ReferenceProtectionError,
    CreatingMutableReferencesLoop,
    // Pollution
    UnallowedReferencePollution,
    ReferencePollutionOfOuterLoopVariable,
    SelfReferencePollution,
    ArgReferencePollution,
    // Escape
    ReturningUnallowedReference,
    AccessingFieldWithMutableReferencesInsideInDestructor,
    // Lifetime and moves
    AccessingMovedVariable,
    ConditionalMove,
    OuterVariableMoveInsideLoop,
    MovedVariableHasReferences,
    DestroyedVariableStillHasReferences,
    // Structural
    ReferenceIndirectionDepthExceeded,
    MoreThanOneInnerReferenceTagForSecondOrderReferenceField,
    MixingMutableAndImmutableSecondOrderReferencesInSameReferenceTag,
    MixingMutableAndImmutableReferencesInSameReferenceTag,
    InnerReferenceTagCountMismatch,
    ExpectedReferenceNotation,
    // Operand kind
    ExpectedVariable,
    ExpectedReferenceValue,
    ImmediateValueExpectedInDecomposeDeclaration,
    // Control flow
    UnreachableCode,
    BreakOutsideLoop,
    // Resolution
    NameNotFound,
}

/// Coarse classification of [`ErrorKind`]s.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs, reason = "group names mirror the headings of `ErrorKind`")]
pub enum ErrorGroup {
    Aliasing,
    Pollution,
    Escape,
    LifetimeMove,
    Structural,
    OperandKind,
    ControlFlow,
    Resolution,
}

impl ErrorKind {
    /// The group this kind belongs to.
    pub fn group(self) -> ErrorGroup {
        match self {
            Self::ReferenceProtectionError | Self::CreatingMutableReferencesLoop => {
                ErrorGroup::Aliasing
            }
            Self::UnallowedReferencePollution
            | Self::ReferencePollutionOfOuterLoopVariable
            | Self::SelfReferencePollution
            | Self::ArgReferencePollution => ErrorGroup::Pollution,
            Self::ReturningUnallowedReference
            | Self::AccessingFieldWithMutableReferencesInsideInDestructor => ErrorGroup::Escape,
            Self::AccessingMovedVariable
            | Self::ConditionalMove
            | Self::OuterVariableMoveInsideLoop
            | Self::MovedVariableHasReferences
            | Self::DestroyedVariableStillHasReferences => ErrorGroup::LifetimeMove,
            Self::ReferenceIndirectionDepthExceeded
            | Self::MoreThanOneInnerReferenceTagForSecondOrderReferenceField
            | Self::MixingMutableAndImmutableSecondOrderReferencesInSameReferenceTag
            | Self::MixingMutableAndImmutableReferencesInSameReferenceTag
            | Self::InnerReferenceTagCountMismatch
            | Self::ExpectedReferenceNotation => ErrorGroup::Structural,
            Self::ExpectedVariable
            | Self::ExpectedReferenceValue
            | Self::ImmediateValueExpectedInDecomposeDeclaration => ErrorGroup::OperandKind,
            Self::UnreachableCode | Self::BreakOutsideLoop => ErrorGroup::ControlFlow,
            Self::NameNotFound => ErrorGroup::Resolution,
        }
    }
}
