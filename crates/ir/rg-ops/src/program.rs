//! A whole program handed over for verification.

use crate::signature::FunctionDef;
use crate::types::{CompositeDef, Name, Type};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A global variable. Globals outlive every function activation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalDef {
    /// Global name
    pub name: Name,
    /// Global type
    #[serde(default)]
    pub ty: Type,
    /// Whether the global may be written
    #[serde(default)]
    pub mutable: bool,
}

/// Everything the verifier consumes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Composite type definitions
    #[serde(default)]
    pub composites: Vec<CompositeDef>,
    /// Global variables
    #[serde(default)]
    pub globals: Vec<GlobalDef>,
    /// Functions; only those with a body are verified
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

/// Failure to load a serialized program.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read `{path}`")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The contents are not a valid program.
    #[error("malformed program: {0}")]
    Json(#[from] serde_json::Error),
}

impl Program {
    /// Parses a program from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Json`] when the text does not describe a program.
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a JSON program file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the file cannot be read and
    /// [`LoadError::Json`] if it cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Looks up a function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|func| func.name == name)
    }

    /// Looks up a composite by name.
    pub fn composite(&self, name: &str) -> Option<&CompositeDef> {
        self.composites.iter().find(|def| def.name == name)
    }

    /// Looks up a global by name.
    pub fn global(&self, name: &str) -> Option<&GlobalDef> {
        self.globals.iter().find(|global| global.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_program() {
        let program = Program::from_json_str(
            r#"{
                "composites": [{"name": "A", "fields": [{"name": "x", "reference": "mut", "tag": "a"}]}],
                "functions": [{"name": "main", "body": {"stmts": []}}]
            }"#,
        )
        .unwrap();
        assert!(program.composite("A").is_some());
        assert!(program.function("main").unwrap().body.is_some());
        assert!(program.global("g").is_none());
    }

    #[test]
    fn test_malformed_program() {
        let err = Program::from_json_str(r#"{"functions": 3}"#).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
