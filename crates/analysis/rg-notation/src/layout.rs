//! Inner reference tag layouts of composite types.

use crate::error::{NotationError, NotationResult};
use crate::tags::TagShape;
use indexmap::IndexMap;
use log::debug;
use rg_ops::{CompositeDef, FieldDef, Mutability, Name, Type};
use rg_span::{FileId, FileSpan, Span};
use rustc_hash::FxHashMap;

/// How a field relates to the inner tags of its composite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldLayout {
    /// Value field; tag `i` of the field type is composite tag `inner_tags[i]`
    Value {
        /// Composite tag per field type tag
        inner_tags: Vec<usize>,
    },
    /// Reference field stored under composite tag `tag`
    Reference {
        /// Mutability of the field
        mutability: Mutability,
        /// Composite tag
        tag: usize,
    },
}

/// A field with its resolved layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: Name,
    /// Field type (pointee type for reference fields)
    pub ty: Type,
    /// Tag mapping
    pub layout: FieldLayout,
}

/// Inner tags and fields of one composite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeLayout {
    /// Composite name
    pub name: Name,
    /// Inner tags in declaration order
    pub tags: IndexMap<Name, TagShape>,
    /// Fields in declaration order
    pub fields: Vec<FieldInfo>,
    /// Whether the composite has a destructor
    pub has_destructor: bool,
}

impl CompositeLayout {
    /// Shapes of all inner tags.
    pub fn tag_shapes(&self) -> Vec<TagShape> {
        self.tags.values().copied().collect()
    }

    /// Index of the field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Whether accessing the field may observe a mutable reference.
    pub fn field_has_mutable_references(&self, index: usize) -> bool {
        let Some(field) = self.fields.get(index) else {
            return false;
        };
        match &field.layout {
            FieldLayout::Reference { mutability, tag } => {
                mutability.is_mut()
                    || self
                        .tags
                        .get_index(*tag)
                        .is_some_and(|(_, shape)| shape.has_mutable())
            }
            FieldLayout::Value { inner_tags } => inner_tags.iter().any(|tag| {
                self.tags
                    .get_index(*tag)
                    .is_some_and(|(_, shape)| shape.mutability.is_mut())
            }),
        }
    }
}

/// Layouts of every composite in a program.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    layouts: IndexMap<Name, CompositeLayout>,
}

impl TypeTable {
    /// Computes layouts for all composites, collecting notation errors.
    pub fn build(defs: &[CompositeDef], file: FileId) -> (Self, Vec<NotationError>) {
        let mut builder = LayoutBuilder {
            defs: defs.iter().map(|def| (def.name.as_str(), def)).collect(),
            in_progress: Vec::new(),
            layouts: IndexMap::new(),
            errors: Vec::new(),
            file,
        };
        for def in defs {
            builder.composite_tags(&def.name, def.span);
        }
        debug!("built {} composite layouts", builder.layouts.len());
        (
            Self {
                layouts: builder.layouts,
            },
            builder.errors,
        )
    }

    /// Layout of the composite called `name`.
    pub fn layout(&self, name: &str) -> Option<&CompositeLayout> {
        self.layouts.get(name)
    }

    /// Layout of `name`, or a [`NotationError::NameNotFound`] located at `span`.
    ///
    /// # Errors
    ///
    /// Fails when no composite called `name` exists.
    pub fn require(&self, name: &str, span: FileSpan) -> NotationResult<&CompositeLayout> {
        self.layout(name).ok_or_else(|| NotationError::NameNotFound {
            what: "type",
            name: name.to_string(),
            span,
        })
    }

    /// All layouts in declaration order.
    pub fn layouts(&self) -> impl Iterator<Item = &CompositeLayout> {
        self.layouts.values()
    }

    /// Inner tags of a type. Unknown composites have none.
    pub fn tags(&self, ty: &Type) -> Vec<TagShape> {
        match ty {
            Type::Scalar => Vec::new(),
            Type::Composite(name) => self
                .layout(name)
                .map(CompositeLayout::tag_shapes)
                .unwrap_or_default(),
            Type::Tuple(elements) => elements.iter().flat_map(|element| self.tags(element)).collect(),
            Type::Array { element, .. } => self.tags(element),
            Type::Closure(captures) => captures.iter().copied().map(TagShape::first_order).collect(),
        }
    }

    /// Index of the first tag of tuple element `index` within the tuple's tags.
    pub fn tuple_tag_offset(&self, elements: &[Type], index: usize) -> usize {
        elements
            .iter()
            .take(index)
            .map(|element| self.tags(element).len())
            .sum()
    }
}

struct LayoutBuilder<'a> {
    defs: FxHashMap<&'a str, &'a CompositeDef>,
    in_progress: Vec<&'a str>,
    layouts: IndexMap<Name, CompositeLayout>,
    errors: Vec<NotationError>,
    file: FileId,
}

impl<'a> LayoutBuilder<'a> {
    fn span(&self, span: Span) -> FileSpan {
        FileSpan::new(self.file, span)
    }

    /// Tags of composite `name`, `None` while its layout is being computed.
    fn composite_tags(&mut self, name: &str, use_span: Span) -> Option<Vec<TagShape>> {
        if let Some(layout) = self.layouts.get(name) {
            return Some(layout.tag_shapes());
        }
        if self.in_progress.iter().any(|building| *building == name) {
            return None;
        }
        let Some(def) = self.defs.get(name).copied() else {
            self.errors.push(NotationError::NameNotFound {
                what: "type",
                name: name.to_string(),
                span: self.span(use_span),
            });
            return Some(Vec::new());
        };

        self.in_progress.push(def.name.as_str());
        let mut layout = CompositeLayout {
            name: def.name.clone(),
            tags: IndexMap::new(),
            fields: Vec::with_capacity(def.fields.len()),
            has_destructor: def.has_destructor,
        };
        for field in &def.fields {
            let field_layout = match field.reference {
                None => self.value_field(&mut layout, field),
                Some(mutability) => self.reference_field(&mut layout, field, mutability),
            };
            layout.fields.push(FieldInfo {
                name: field.name.clone(),
                ty: field.ty.clone(),
                layout: field_layout,
            });
        }
        self.in_progress.pop();

        let shapes = layout.tag_shapes();
        self.layouts.insert(def.name.clone(), layout);
        Some(shapes)
    }

    fn type_tags(&mut self, ty: &Type, use_span: Span) -> Option<Vec<TagShape>> {
        match ty {
            Type::Scalar => Some(Vec::new()),
            Type::Composite(name) => self.composite_tags(name, use_span),
            Type::Tuple(elements) => {
                let mut tags = Vec::new();
                for element in elements {
                    tags.extend(self.type_tags(element, use_span)?);
                }
                Some(tags)
            }
            Type::Array { element, .. } => self.type_tags(element, use_span),
            Type::Closure(captures) => {
                Some(captures.iter().copied().map(TagShape::first_order).collect())
            }
        }
    }

    fn value_field(&mut self, layout: &mut CompositeLayout, field: &FieldDef) -> FieldLayout {
        // A composite containing itself by value has no finite layout; the
        // surrounding compiler rejects it, so no tags are contributed here.
        let tags = self.type_tags(&field.ty, field.span).unwrap_or_default();
        if field.inner_tags.len() != tags.len() {
            self.errors.push(NotationError::InnerTagCountMismatch {
                name: format!("{}.{}", layout.name, field.name),
                expected: tags.len(),
                found: field.inner_tags.len(),
                span: self.span(field.span),
            });
            return FieldLayout::Value {
                inner_tags: Vec::new(),
            };
        }
        let inner_tags = field
            .inner_tags
            .iter()
            .zip(tags)
            .map(|(tag, shape)| self.merge_tag(layout, tag, shape, field.span))
            .collect();
        FieldLayout::Value { inner_tags }
    }

    fn reference_field(
        &mut self,
        layout: &mut CompositeLayout,
        field: &FieldDef,
        mutability: Mutability,
    ) -> FieldLayout {
        let mut shape = TagShape::first_order(mutability);
        match self.type_tags(&field.ty, field.span) {
            None => self.errors.push(NotationError::IndirectionDepthExceeded {
                owner: layout.name.clone(),
                field: field.name.clone(),
                span: self.span(field.span),
            }),
            Some(pointee) if pointee.len() > 1 || field.inner_tags.len() > 1 => {
                self.errors.push(NotationError::MoreThanOneInnerTag {
                    owner: layout.name.clone(),
                    field: field.name.clone(),
                    span: self.span(field.span),
                });
            }
            Some(pointee) => {
                if let Some(inner) = pointee.first() {
                    if inner.is_second_order() {
                        self.errors.push(NotationError::IndirectionDepthExceeded {
                            owner: layout.name.clone(),
                            field: field.name.clone(),
                            span: self.span(field.span),
                        });
                    } else {
                        shape.second_order = Some(inner.mutability);
                    }
                }
            }
        }

        let Some(tag) = &field.tag else {
            self.errors.push(NotationError::MissingReferenceTag {
                owner: layout.name.clone(),
                field: field.name.clone(),
                span: self.span(field.span),
            });
            // Keep the field addressable under a tag of its own.
            let tag = format!("{}'", field.name);
            let tag = self.merge_tag(layout, &tag, shape, field.span);
            return FieldLayout::Reference { mutability, tag };
        };
        let tag = self.merge_tag(layout, tag, shape, field.span);
        FieldLayout::Reference { mutability, tag }
    }

    fn merge_tag(
        &mut self,
        layout: &mut CompositeLayout,
        tag: &str,
        shape: TagShape,
        span: Span,
    ) -> usize {
        let Some((index, _, existing)) = layout.tags.get_full_mut(tag) else {
            let (index, _) = layout.tags.insert_full(tag.to_string(), shape);
            return index;
        };
        if existing.mutability != shape.mutability {
            self.errors.push(NotationError::MixingMutability {
                owner: layout.name.clone(),
                tag: tag.to_string(),
                span: FileSpan::new(self.file, span),
            });
        }
        match (existing.second_order, shape.second_order) {
            (Some(a), Some(b)) if a != b => {
                self.errors.push(NotationError::MixingSecondOrderMutability {
                    owner: layout.name.clone(),
                    tag: tag.to_string(),
                    span: FileSpan::new(self.file, span),
                });
            }
            (None, second) => existing.second_order = second,
            _ => {}
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_ops::ErrorKind;

    fn build(defs: Vec<CompositeDef>) -> (TypeTable, Vec<ErrorKind>) {
        let (table, errors) = TypeTable::build(&defs, FileId(0));
        (table, errors.iter().map(NotationError::kind).collect())
    }

    fn composite(name: &str, fields: Vec<FieldDef>) -> CompositeDef {
        CompositeDef {
            name: name.to_string(),
            fields,
            has_destructor: false,
            span: Span::default(),
        }
    }

    fn holder_of_mut_ref() -> CompositeDef {
        composite(
            "A",
            vec![FieldDef::reference("x", Mutability::Mut, Type::Scalar, "a")],
        )
    }

    #[test]
    fn test_first_order_layout() {
        let (table, errors) = build(vec![holder_of_mut_ref()]);
        assert!(errors.is_empty());
        let layout = table.layout("A").unwrap();
        assert_eq!(layout.tag_shapes(), vec![TagShape::first_order(Mutability::Mut)]);
        assert!(layout.field_has_mutable_references(0));
    }

    #[test]
    fn test_second_order_depth_two_accepted() {
        let b = composite(
            "B",
            vec![FieldDef::reference("a", Mutability::Imut, Type::composite("A"), "b")],
        );
        let (table, errors) = build(vec![holder_of_mut_ref(), b]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            table.tags(&Type::composite("B")),
            vec![TagShape {
                mutability: Mutability::Imut,
                second_order: Some(Mutability::Mut),
            }]
        );
    }

    #[test]
    fn test_depth_three_rejected() {
        let b = composite(
            "B",
            vec![FieldDef::reference("a", Mutability::Imut, Type::composite("A"), "b")],
        );
        let c = composite(
            "C",
            vec![FieldDef::reference("b", Mutability::Imut, Type::composite("B"), "c")],
        );
        let (_, errors) = build(vec![holder_of_mut_ref(), b, c]);
        assert_eq!(errors, vec![ErrorKind::ReferenceIndirectionDepthExceeded]);
    }

    #[test]
    fn test_self_referential_reference_chain_rejected() {
        let node = composite(
            "Node",
            vec![FieldDef::reference("next", Mutability::Imut, Type::composite("Node"), "n")],
        );
        let (_, errors) = build(vec![node]);
        assert_eq!(errors, vec![ErrorKind::ReferenceIndirectionDepthExceeded]);
    }

    #[test]
    fn test_pointee_with_two_tags_rejected() {
        let pair = composite(
            "Pair",
            vec![
                FieldDef::reference("x", Mutability::Imut, Type::Scalar, "x"),
                FieldDef::reference("y", Mutability::Imut, Type::Scalar, "y"),
            ],
        );
        let holder = composite(
            "Holder",
            vec![FieldDef::reference("p", Mutability::Imut, Type::composite("Pair"), "p")],
        );
        let (_, errors) = build(vec![pair, holder]);
        assert_eq!(
            errors,
            vec![ErrorKind::MoreThanOneInnerReferenceTagForSecondOrderReferenceField]
        );
    }

    #[test]
    fn test_mixing_mutability_in_one_tag() {
        let mixed = composite(
            "Mixed",
            vec![
                FieldDef::reference("x", Mutability::Mut, Type::Scalar, "t"),
                FieldDef::reference("y", Mutability::Imut, Type::Scalar, "t"),
            ],
        );
        let (_, errors) = build(vec![mixed]);
        assert_eq!(
            errors,
            vec![ErrorKind::MixingMutableAndImmutableReferencesInSameReferenceTag]
        );
    }

    #[test]
    fn test_mixing_second_order_mutability() {
        let imut_holder = composite(
            "I",
            vec![FieldDef::reference("x", Mutability::Imut, Type::Scalar, "i")],
        );
        let mixed = composite(
            "Mixed",
            vec![
                FieldDef::reference("a", Mutability::Imut, Type::composite("A"), "t"),
                FieldDef::reference("i", Mutability::Imut, Type::composite("I"), "t"),
            ],
        );
        let (_, errors) = build(vec![holder_of_mut_ref(), imut_holder, mixed]);
        assert_eq!(
            errors,
            vec![ErrorKind::MixingMutableAndImmutableSecondOrderReferencesInSameReferenceTag]
        );
    }

    #[test]
    fn test_value_field_maps_inner_tags() {
        let outer = composite(
            "Outer",
            vec![
                FieldDef::value("n", Type::Scalar),
                FieldDef::value("inner", Type::composite("A")).with_inner_tags(["o"]),
            ],
        );
        let (table, errors) = build(vec![outer, holder_of_mut_ref()]);
        assert!(errors.is_empty());
        let layout = table.layout("Outer").unwrap();
        assert_eq!(
            layout.fields[1].layout,
            FieldLayout::Value {
                inner_tags: vec![0]
            }
        );
        assert!(!layout.field_has_mutable_references(0));
        assert!(layout.field_has_mutable_references(1));
    }

    #[test]
    fn test_inner_tag_count_mismatch() {
        let outer = composite("Outer", vec![FieldDef::value("inner", Type::composite("A"))]);
        let (_, errors) = build(vec![holder_of_mut_ref(), outer]);
        assert_eq!(errors, vec![ErrorKind::InnerReferenceTagCountMismatch]);
    }

    #[test]
    fn test_tuple_tag_offsets() {
        let (table, _) = build(vec![holder_of_mut_ref()]);
        let elements = vec![Type::composite("A"), Type::Scalar, Type::composite("A")];
        assert_eq!(table.tags(&Type::Tuple(elements.clone())).len(), 2);
        assert_eq!(table.tuple_tag_offset(&elements, 2), 1);
    }

    #[test]
    fn test_unknown_composite() {
        let holder = composite("H", vec![FieldDef::value("u", Type::composite("Nope"))]);
        let (table, errors) = build(vec![holder]);
        assert_eq!(errors, vec![ErrorKind::NameNotFound]);
        assert!(table.require("Nope", FileSpan::default()).is_err());
    }
}
