//! Type shapes relevant to reference tracking.

use rg_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved name of a local, global, field, composite, function or tag.
pub type Name = String;

/// Mutability of a reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// `&mut`
    Mut,
    /// `&imut`
    Imut,
}

impl Mutability {
    /// Whether this is a mutable reference.
    pub fn is_mut(self) -> bool {
        self == Self::Mut
    }

    /// Mutable if either side is mutable.
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        if self.is_mut() || other.is_mut() {
            Self::Mut
        } else {
            Self::Imut
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mut => write!(f, "mut"),
            Self::Imut => write!(f, "imut"),
        }
    }
}

/// The shape of a type as far as references are concerned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Any type without references inside (integers, floats, bools, ...).
    #[default]
    Scalar,
    /// A struct or class declared in [`crate::Program::composites`].
    Composite(Name),
    /// A tuple; tags of the elements are concatenated.
    Tuple(Vec<Type>),
    /// A fixed-size array; all elements share the element type's tags.
    Array {
        /// Element type
        element: Box<Type>,
        /// Number of elements
        len: u64,
    },
    /// A closure object with one reference tag per reference capture.
    Closure(Vec<Mutability>),
}

impl Type {
    /// Composite type by name.
    pub fn composite(name: impl Into<Name>) -> Self {
        Self::Composite(name.into())
    }

    /// Array of `len` elements.
    pub fn array(element: Self, len: u64) -> Self {
        Self::Array {
            element: Box::new(element),
            len,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Composite(name) => write!(f, "{name}"),
            Self::Tuple(elements) => {
                write!(f, "tup[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Self::Array { element, len } => write!(f, "[{element}, {len}]"),
            Self::Closure(captures) => write!(f, "closure/{}", captures.len()),
        }
    }
}

/// A struct or class definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeDef {
    /// Type name
    pub name: Name,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Whether the type declares a destructor
    #[serde(default)]
    pub has_destructor: bool,
    /// Location of the definition
    #[serde(default)]
    pub span: Span,
}

/// A field of a composite.
///
/// Value fields map every tag of their type onto a composite tag through
/// `inner_tags` (positionally). Reference fields name their own tag in `tag`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: Name,
    /// Field type, or the pointee type for reference fields
    #[serde(default)]
    pub ty: Type,
    /// `Some` if the field is a reference
    #[serde(default)]
    pub reference: Option<Mutability>,
    /// Composite tag of a reference field
    #[serde(default)]
    pub tag: Option<Name>,
    /// Composite tags receiving the field type's inner tags
    #[serde(default)]
    pub inner_tags: Vec<Name>,
    /// Location of the field
    #[serde(default)]
    pub span: Span,
}

impl FieldDef {
    /// A plain value field.
    pub fn value(name: impl Into<Name>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            reference: None,
            tag: None,
            inner_tags: Vec::new(),
            span: Span::default(),
        }
    }

    /// A reference field pointing to `ty` under the composite tag `tag`.
    pub fn reference(
        name: impl Into<Name>,
        mutability: Mutability,
        ty: Type,
        tag: impl Into<Name>,
    ) -> Self {
        Self {
            reference: Some(mutability),
            tag: Some(tag.into()),
            ..Self::value(name, ty)
        }
    }

    /// Sets the inner tag mapping.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_json_shapes() {
        let ty: Type = serde_json::from_str(
            r#"{"tuple": ["scalar", {"composite": "A"}, {"array": {"element": "scalar", "len": 3}}]}"#,
        )
        .unwrap();
        assert_eq!(
            ty,
            Type::Tuple(vec![
                Type::Scalar,
                Type::composite("A"),
                Type::array(Type::Scalar, 3)
            ])
        );
        assert_eq!(ty.to_string(), "tup[scalar, A, [scalar, 3]]");
    }

    #[test]
    fn test_mutability_join() {
        assert_eq!(Mutability::Imut.join(Mutability::Imut), Mutability::Imut);
        assert_eq!(Mutability::Imut.join(Mutability::Mut), Mutability::Mut);
    }

    #[test]
    fn test_field_defaults() {
        let field: FieldDef = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(field, FieldDef::value("x", Type::Scalar));
    }
}
