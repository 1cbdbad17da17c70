//! Program-wide facts shared by every function verification.

use crate::diagnostic::{Diagnostic, InstantiationFrame};
use crate::error::VerifyError;
use log::debug;
use rg_notation::{resolve_signature, ResolvedSignature, TypeTable};
use rg_ops::{FunctionDef, Program};
use rg_span::FileId;
use rustc_hash::FxHashMap;

/// Composite layouts and resolved signatures of a program.
pub(crate) struct ProgramContext<'p> {
    pub program: &'p Program,
    pub types: TypeTable,
    pub signatures: FxHashMap<&'p str, ResolvedSignature>,
    pub file: FileId,
    /// Notation errors in composite declarations
    pub composite_errors: Vec<Diagnostic>,
    /// Notation errors per function signature
    pub signature_errors: FxHashMap<&'p str, Vec<Diagnostic>>,
}

impl<'p> ProgramContext<'p> {
    pub fn new(program: &'p Program, file: FileId) -> Self {
        let (types, errors) = TypeTable::build(&program.composites, file);
        let composite_errors = errors
            .into_iter()
            .map(|error| Diagnostic::new(VerifyError::from(error)))
            .collect();

        let mut signatures = FxHashMap::default();
        let mut signature_errors: FxHashMap<&str, Vec<Diagnostic>> = FxHashMap::default();
        for func in &program.functions {
            let (signature, errors) = resolve_signature(&types, func, file);
            if !errors.is_empty() {
                let trail = instantiation_trail(func);
                signature_errors.entry(func.name.as_str()).or_default().extend(
                    errors.into_iter().map(|error| {
                        Diagnostic::new(VerifyError::from(error))
                            .in_function(func.name.clone())
                            .with_trail(trail.clone())
                    }),
                );
            }
            signatures.insert(func.name.as_str(), signature);
        }
        debug!(
            "resolved {} signatures, {} composite layouts",
            signatures.len(),
            types.layouts().count()
        );

        Self {
            program,
            types,
            signatures,
            file,
            composite_errors,
            signature_errors,
        }
    }

    pub fn signature(&self, name: &str) -> Option<&ResolvedSignature> {
        self.signatures.get(name)
    }

    pub fn signature_errors(&self, name: &str) -> &[Diagnostic] {
        self.signature_errors.get(name).map_or(&[], Vec::as_slice)
    }
}

pub(crate) fn instantiation_trail(func: &FunctionDef) -> Vec<InstantiationFrame> {
    func.instantiation
        .as_ref()
        .map(InstantiationFrame::trail)
        .unwrap_or_default()
}
