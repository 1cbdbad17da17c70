//! Tag shapes and parameter references.

use rg_ops::Mutability;
use std::fmt;

/// One inner reference tag of a type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagShape {
    /// Mutability of the references under this tag
    pub mutability: Mutability,
    /// Mutability of the references inside the referenced objects, if any
    pub second_order: Option<Mutability>,
}

impl TagShape {
    /// A tag holding plain references.
    pub fn first_order(mutability: Mutability) -> Self {
        Self {
            mutability,
            second_order: None,
        }
    }

    /// Whether the referenced objects themselves hold references.
    pub fn is_second_order(&self) -> bool {
        self.second_order.is_some()
    }

    /// Whether any level of this tag is mutable.
    pub fn has_mutable(&self) -> bool {
        self.mutability.is_mut() || self.second_order.is_some_and(Mutability::is_mut)
    }
}

/// Which reference of a parameter a tag denotes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamTag {
    /// The parameter reference itself
    Reference,
    /// An inner reference tag of the parameter type
    Inner(usize),
}

/// A reference reachable from a parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamReference {
    /// Parameter index
    pub param: usize,
    /// Reference of that parameter
    pub tag: ParamTag,
}

impl ParamReference {
    /// The reference of parameter `param` itself.
    pub fn reference(param: usize) -> Self {
        Self {
            param,
            tag: ParamTag::Reference,
        }
    }

    /// Inner tag `tag` of parameter `param`.
    pub fn inner(param: usize, tag: usize) -> Self {
        Self {
            param,
            tag: ParamTag::Inner(tag),
        }
    }
}

impl fmt::Display for ParamReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            ParamTag::Reference => write!(f, "arg{}", self.param),
            ParamTag::Inner(tag) => write!(f, "arg{}.{tag}", self.param),
        }
    }
}

/// After a call, `dst` may additionally point to whatever `src` points to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PollutionPair {
    /// Polluted inner reference
    pub dst: ParamReference,
    /// Source reference
    pub src: ParamReference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_reference_display() {
        assert_eq!(ParamReference::reference(1).to_string(), "arg1");
        assert_eq!(ParamReference::inner(0, 2).to_string(), "arg0.2");
    }

    #[test]
    fn test_second_order_mutability() {
        let shape = TagShape {
            mutability: Mutability::Imut,
            second_order: Some(Mutability::Mut),
        };
        assert!(shape.is_second_order());
        assert!(shape.has_mutable());
        assert!(!TagShape::first_order(Mutability::Imut).has_mutable());
    }
}
