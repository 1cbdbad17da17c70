//! Function signatures with reference notation.

use crate::body::Block;
use crate::types::{Mutability, Name, Type};
use rg_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a parameter or return value is passed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Passing {
    /// By value
    #[default]
    Value,
    /// By mutable reference
    RefMut,
    /// By immutable reference
    RefImut,
}

impl Passing {
    /// Mutability of the reference, `None` for by-value passing.
    pub fn reference(self) -> Option<Mutability> {
        match self {
            Self::Value => None,
            Self::RefMut => Some(Mutability::Mut),
            Self::RefImut => Some(Mutability::Imut),
        }
    }
}

/// One declared parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name
    pub name: Name,
    /// Parameter type (pointee type for by-reference parameters)
    #[serde(default)]
    pub ty: Type,
    /// Passing mode
    #[serde(default)]
    pub passing: Passing,
    /// Whether a by-value parameter is a mutable binding
    #[serde(default)]
    pub mutable: bool,
    /// Reference tag of a by-reference parameter
    #[serde(default)]
    pub tag: Option<Name>,
    /// Tags for the inner references of the parameter type, positional
    #[serde(default)]
    pub inner_tags: Vec<Name>,
}

impl ParamDecl {
    /// Parameter without any notation.
    pub fn new(name: impl Into<Name>, ty: Type, passing: Passing) -> Self {
        Self {
            name: name.into(),
            ty,
            passing,
            mutable: false,
            tag: None,
            inner_tags: Vec::new(),
        }
    }

    /// Sets the reference tag.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<Name>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the inner reference tags.
    #[must_use]
    pub fn with_inner_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Name>,
    {
        self.inner_tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Return value descriptor. The return-reference set is empty by default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnDecl {
    /// Returned type (pointee type for by-reference returns)
    #[serde(default)]
    pub ty: Type,
    /// Passing mode
    #[serde(default)]
    pub passing: Passing,
    /// Tags the returned reference may alias
    #[serde(default)]
    pub tags: Vec<Name>,
    /// Per inner tag of the returned type, the tags it may alias
    #[serde(default)]
    pub inner_tags: Vec<Vec<Name>>,
}

/// `dst <- src`: after the call the `dst` inner reference may also point to
/// whatever `src` points to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollutionDecl {
    /// Tag being polluted; must be an inner tag
    pub dst: Name,
    /// Tag whose referents flow into `dst`
    pub src: Name,
}

/// Fully resolved signature of a function.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in order
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    /// Return descriptor
    #[serde(default)]
    pub ret: ReturnDecl,
    /// Declared pollution
    #[serde(default)]
    pub pollution: Vec<PollutionDecl>,
}

/// Special roles of a function.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// Ordinary function
    #[default]
    Regular,
    /// Destructor; the first parameter is the destroyed object
    Destructor,
    /// Generator; calling it produces a coroutine object
    Generator,
}

/// One template argument binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateArg {
    /// Template parameter name
    pub param: Name,
    /// Printed concrete argument
    pub value: String,
}

/// Template instantiation a function body was produced by.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instantiation {
    /// Template name
    pub template: Name,
    /// Concrete argument bindings
    #[serde(default)]
    pub args: Vec<TemplateArg>,
    /// Point of instantiation
    #[serde(default)]
    pub span: Span,
    /// Enclosing instantiation that requested this one
    #[serde(default)]
    pub parent: Option<Box<Instantiation>>,
}

impl Instantiation {
    /// Iterates from this instantiation outwards to the outermost one.
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |inst| inst.parent.as_deref())
    }
}

impl fmt::Display for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.template)?;
        for (i, arg) in self.args.iter().enumerate() {
            let sep = if i == 0 { " with " } else { ", " };
            write!(f, "{sep}{} = {}", arg.param, arg.value)?;
        }
        Ok(())
    }
}

/// A function: signature plus optional body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name
    pub name: Name,
    /// Special role
    #[serde(default)]
    pub kind: FunctionKind,
    /// Signature with reference notation
    #[serde(default)]
    pub signature: Signature,
    /// Body; prototypes have none
    #[serde(default)]
    pub body: Option<Block>,
    /// Instantiation context for template functions
    #[serde(default)]
    pub instantiation: Option<Instantiation>,
    /// Location of the declaration
    #[serde(default)]
    pub span: Span,
}

impl FunctionDef {
    /// Function with a signature and no body.
    pub fn prototype(name: impl Into<Name>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Regular,
            signature,
            body: None,
            instantiation: None,
            span: Span::default(),
        }
    }

    /// Attaches a body.
    #[must_use]
    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }
}
