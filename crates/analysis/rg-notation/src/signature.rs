//! Resolution of signature notation into parameter references.

use crate::error::NotationError;
use crate::layout::TypeTable;
use crate::tags::{ParamReference, ParamTag, PollutionPair, TagShape};
use indexmap::IndexMap;
use rg_ops::{FunctionDef, FunctionKind, Mutability, Name, Passing, Type};
use rg_span::{FileId, FileSpan};
use std::collections::BTreeSet;

/// A parameter with its type's tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedParam {
    /// Parameter name
    pub name: Name,
    /// Parameter type (pointee type for references)
    pub ty: Type,
    /// Passing mode
    pub passing: Passing,
    /// Whether a by-value parameter is a mutable binding
    pub mutable: bool,
    /// Inner tags of `ty`
    pub tags: Vec<TagShape>,
}

/// What a call produces, and what it may alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnShape {
    /// Result type (pointee type for by-reference results)
    pub ty: Type,
    /// Passing mode
    pub passing: Passing,
    /// Inner tags of `ty`
    pub tags: Vec<TagShape>,
    /// References the returned reference may alias
    pub references: BTreeSet<ParamReference>,
    /// Per inner tag, the references it may alias
    pub inner_references: Vec<BTreeSet<ParamReference>>,
}

/// A signature with every tag name resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSignature {
    /// Function name
    pub name: Name,
    /// Special role
    pub kind: FunctionKind,
    /// Parameters in order
    pub params: Vec<ResolvedParam>,
    /// What `return` (and `yield`) statements must satisfy
    pub ret: ReturnShape,
    /// Coroutine object produced by calling a generator
    pub coroutine: Option<ReturnShape>,
    /// Declared pollution
    pub pollution: BTreeSet<PollutionPair>,
}

impl ResolvedSignature {
    /// What a call to this function produces.
    pub fn call_result(&self) -> &ReturnShape {
        self.coroutine.as_ref().unwrap_or(&self.ret)
    }

    /// Whether `dst` may be polluted by `src`.
    pub fn allows_pollution(&self, dst: ParamReference, src: ParamReference) -> bool {
        self.pollution.contains(&PollutionPair { dst, src })
    }
}

/// Resolves the notation of `func` against the composite layouts.
pub fn resolve_signature(
    table: &TypeTable,
    func: &FunctionDef,
    file: FileId,
) -> (ResolvedSignature, Vec<NotationError>) {
    let span = FileSpan::new(file, func.span);
    let sig = &func.signature;
    let mut errors = Vec::new();
    let mut tag_map: IndexMap<&str, Vec<ParamReference>> = IndexMap::new();

    let mut params = Vec::with_capacity(sig.params.len());
    for (index, param) in sig.params.iter().enumerate() {
        let tags = table.tags(&param.ty);
        if let (Some(tag), Some(_)) = (&param.tag, param.passing.reference()) {
            tag_map
                .entry(tag.as_str())
                .or_default()
                .push(ParamReference::reference(index));
        }
        if param.inner_tags.is_empty() {
            // No notation: inner references of this parameter alias nothing.
        } else if param.inner_tags.len() == tags.len() {
            for (inner, tag) in param.inner_tags.iter().enumerate() {
                tag_map
                    .entry(tag.as_str())
                    .or_default()
                    .push(ParamReference::inner(index, inner));
            }
        } else {
            errors.push(NotationError::InnerTagCountMismatch {
                name: param.name.clone(),
                expected: tags.len(),
                found: param.inner_tags.len(),
                span,
            });
        }
        params.push(ResolvedParam {
            name: param.name.clone(),
            ty: param.ty.clone(),
            passing: param.passing,
            mutable: param.mutable,
            tags,
        });
    }

    let lookup = |tag: &str, errors: &mut Vec<NotationError>| -> Vec<ParamReference> {
        if let Some(refs) = tag_map.get(tag) {
            refs.clone()
        } else {
            errors.push(NotationError::NameNotFound {
                what: "reference tag",
                name: tag.to_string(),
                span,
            });
            Vec::new()
        }
    };

    let ret_tags = table.tags(&sig.ret.ty);
    let mut references = BTreeSet::new();
    if sig.ret.passing.reference().is_some() {
        for tag in &sig.ret.tags {
            references.extend(lookup(tag, &mut errors));
        }
    }
    let mut inner_references = vec![BTreeSet::new(); ret_tags.len()];
    if !sig.ret.inner_tags.is_empty() {
        if sig.ret.inner_tags.len() == ret_tags.len() {
            for (allowed, tags) in inner_references.iter_mut().zip(&sig.ret.inner_tags) {
                for tag in tags {
                    allowed.extend(lookup(tag, &mut errors));
                }
            }
        } else {
            errors.push(NotationError::InnerTagCountMismatch {
                name: format!("{} return value", func.name),
                expected: ret_tags.len(),
                found: sig.ret.inner_tags.len(),
                span,
            });
        }
    }

    let mut pollution = BTreeSet::new();
    for decl in &sig.pollution {
        if decl.dst == decl.src {
            errors.push(NotationError::SelfPollution {
                function: func.name.clone(),
                tag: decl.dst.clone(),
                span,
            });
            continue;
        }
        let dsts = lookup(&decl.dst, &mut errors);
        let srcs = lookup(&decl.src, &mut errors);
        for dst in dsts {
            if dst.tag == ParamTag::Reference {
                errors.push(NotationError::ArgPollution {
                    function: func.name.clone(),
                    tag: decl.dst.clone(),
                    span,
                });
                continue;
            }
            pollution.extend(srcs.iter().map(|&src| PollutionPair { dst, src }));
        }
    }

    let coroutine = (func.kind == FunctionKind::Generator).then(|| coroutine_shape(&params));

    (
        ResolvedSignature {
            name: func.name.clone(),
            kind: func.kind,
            params,
            ret: ReturnShape {
                ty: sig.ret.ty.clone(),
                passing: sig.ret.passing,
                tags: ret_tags,
                references,
                inner_references,
            },
            coroutine,
            pollution,
        },
        errors,
    )
}

/// A coroutine object keeps every reference passed to the generator.
fn coroutine_shape(params: &[ResolvedParam]) -> ReturnShape {
    let mut captured = BTreeSet::new();
    let mut mutability: Option<Mutability> = None;
    let mut capture = |reference, shape_mut: Mutability| {
        captured.insert(reference);
        mutability = Some(mutability.map_or(shape_mut, |m| m.join(shape_mut)));
    };
    for (index, param) in params.iter().enumerate() {
        if let Some(m) = param.passing.reference() {
            capture(ParamReference::reference(index), m);
        }
        for (inner, shape) in param.tags.iter().enumerate() {
            capture(ParamReference::inner(index, inner), shape.mutability);
        }
    }
    match mutability {
        Some(m) => ReturnShape {
            ty: Type::Closure(vec![m]),
            passing: Passing::Value,
            tags: vec![TagShape::first_order(m)],
            references: BTreeSet::new(),
            inner_references: vec![captured],
        },
        None => ReturnShape {
            ty: Type::Closure(Vec::new()),
            passing: Passing::Value,
            tags: Vec::new(),
            references: BTreeSet::new(),
            inner_references: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_ops::{
        CompositeDef, ErrorKind, FieldDef, ParamDecl, PollutionDecl, ReturnDecl, Signature,
    };
    use rg_span::Span;

    fn table() -> TypeTable {
        let defs = vec![CompositeDef {
            name: "S".to_string(),
            fields: vec![FieldDef::reference("r", Mutability::Imut, Type::Scalar, "s")],
            has_destructor: false,
            span: Span::default(),
        }];
        TypeTable::build(&defs, FileId(0)).0
    }

    fn resolve(sig: Signature) -> (ResolvedSignature, Vec<ErrorKind>) {
        let func = FunctionDef::prototype("f", sig);
        let (resolved, errors) = resolve_signature(&table(), &func, FileId(0));
        (resolved, errors.iter().map(NotationError::kind).collect())
    }

    #[test]
    fn test_return_reference_set() {
        let (sig, errors) = resolve(Signature {
            params: vec![
                ParamDecl::new("a", Type::Scalar, Passing::RefImut).tagged("x"),
                ParamDecl::new("b", Type::Scalar, Passing::RefImut).tagged("y"),
            ],
            ret: ReturnDecl {
                ty: Type::Scalar,
                passing: Passing::RefImut,
                tags: vec!["x".to_string()],
                inner_tags: vec![],
            },
            pollution: vec![],
        });
        assert!(errors.is_empty());
        assert_eq!(
            sig.ret.references,
            BTreeSet::from([ParamReference::reference(0)])
        );
    }

    #[test]
    fn test_empty_return_set_by_default() {
        let (sig, _) = resolve(Signature {
            params: vec![ParamDecl::new("a", Type::Scalar, Passing::RefImut).tagged("x")],
            ret: ReturnDecl {
                passing: Passing::RefImut,
                ..ReturnDecl::default()
            },
            pollution: vec![],
        });
        assert!(sig.ret.references.is_empty());
    }

    #[test]
    fn test_pollution_resolution() {
        let (sig, errors) = resolve(Signature {
            params: vec![
                ParamDecl::new("s", Type::composite("S"), Passing::RefMut).with_inner_tags(["d"]),
                ParamDecl::new("v", Type::Scalar, Passing::RefImut).tagged("v"),
            ],
            ret: ReturnDecl::default(),
            pollution: vec![PollutionDecl {
                dst: "d".to_string(),
                src: "v".to_string(),
            }],
        });
        assert!(errors.is_empty());
        assert!(sig.allows_pollution(ParamReference::inner(0, 0), ParamReference::reference(1)));
    }

    #[test]
    fn test_invalid_pollution() {
        let (_, errors) = resolve(Signature {
            params: vec![
                ParamDecl::new("s", Type::Scalar, Passing::RefMut).tagged("d"),
                ParamDecl::new("v", Type::Scalar, Passing::RefImut).tagged("v"),
            ],
            ret: ReturnDecl::default(),
            pollution: vec![
                PollutionDecl {
                    dst: "d".to_string(),
                    src: "v".to_string(),
                },
                PollutionDecl {
                    dst: "v".to_string(),
                    src: "v".to_string(),
                },
                PollutionDecl {
                    dst: "d".to_string(),
                    src: "w".to_string(),
                },
            ],
        });
        assert_eq!(
            errors,
            vec![
                ErrorKind::ArgReferencePollution,
                ErrorKind::SelfReferencePollution,
                ErrorKind::NameNotFound,
                ErrorKind::ArgReferencePollution,
            ]
        );
    }

    #[test]
    fn test_param_inner_tag_count() {
        let (_, errors) = resolve(Signature {
            params: vec![
                ParamDecl::new("s", Type::composite("S"), Passing::Value).with_inner_tags(["a", "b"]),
            ],
            ..Signature::default()
        });
        assert_eq!(errors, vec![ErrorKind::InnerReferenceTagCountMismatch]);
    }

    #[test]
    fn test_generator_captures_all_references() {
        let mut func = FunctionDef::prototype(
            "gen_values",
            Signature {
                params: vec![
                    ParamDecl::new("a", Type::Scalar, Passing::RefImut),
                    ParamDecl::new("s", Type::composite("S"), Passing::Value),
                ],
                ..Signature::default()
            },
        );
        func.kind = FunctionKind::Generator;
        let (sig, errors) = resolve_signature(&table(), &func, FileId(0));
        assert!(errors.is_empty());
        let result = sig.call_result();
        assert_eq!(result.tags, vec![TagShape::first_order(Mutability::Imut)]);
        assert_eq!(
            result.inner_references[0],
            BTreeSet::from([ParamReference::reference(0), ParamReference::inner(1, 0)])
        );
    }
}
