//! Schema resolution: field declarations to a cached tree of field descriptors.

use alloc::borrow::Cow;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::builder::{TypeKey, ValueBuilder, ValueBuilders};
use crate::decl::{Element, FieldDecl, FieldShape, Param, SchemaSource, Setter};
use crate::error::{ReflectError, ReflectErrorKind};
use crate::debug;

/// How a resolved field gets its value.
#[derive(Clone)]
pub enum FieldKind {
    /// Converted from a raw string by a value builder.
    Leaf(ValueBuilder),
    /// Assembled from the parameters under the field's key.
    Composite {
        /// Schema of the nested type.
        schema: Arc<Schema>,
        /// Allocates fresh instances of the nested type.
        source: Arc<dyn SchemaSource>,
    },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Leaf(builder) => f.debug_tuple("Leaf").field(builder).finish(),
            FieldKind::Composite { schema, .. } => {
                f.debug_tuple("Composite").field(&schema.key()).finish()
            }
        }
    }
}

/// A resolved field: parameter metadata plus everything needed to fill it.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub(crate) field: Cow<'static, str>,
    pub(crate) param: Param,
    pub(crate) shape: FieldShape,
    pub(crate) kind: FieldKind,
    pub(crate) setter: Setter,
}

impl FieldSchema {
    /// The Rust field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The parameter metadata.
    pub fn param(&self) -> &Param {
        &self.param
    }

    /// The parameter key this field reads.
    pub fn source_key(&self) -> &str {
        &self.param.name
    }

    /// Container shape.
    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Leaf builder or nested schema.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The schema of the nested type, for composite fields.
    pub fn children(&self) -> Option<&Arc<Schema>> {
        match &self.kind {
            FieldKind::Composite { schema, .. } => Some(schema),
            FieldKind::Leaf(_) => None,
        }
    }
}

/// The ordered field descriptors of one type.
#[derive(Debug)]
pub struct Schema {
    key: TypeKey,
    fields: Vec<FieldSchema>,
}

impl Schema {
    /// The type this schema describes.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Fields in decode order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// The field bound to parameter key `name`.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.param.name == name)
    }
}

/// Resolved schemas, one per type, shared across decodes.
#[derive(Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<TypeKey, Arc<Schema>>>,
}

impl SchemaCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached schema for `key`.
    pub fn get(&self, key: TypeKey) -> Option<Arc<Schema>> {
        self.schemas.read().get(&key).cloned()
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    /// Whether nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }

    fn insert(&self, schema: Schema) -> Arc<Schema> {
        let mut schemas = self.schemas.write();
        // First writer wins so every caller shares one Arc
        schemas
            .entry(schema.key)
            .or_insert_with(|| Arc::new(schema))
            .clone()
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.schemas.read().keys()).finish()
    }
}

/// Resolve the schema of the type behind `source`, and of every type nested in it.
///
/// Leaf builders come from `builders`, which caches each type's fallback
/// builder the first time it is needed. Every schema resolved on the way
/// ends up in `cache`.
pub fn resolve(
    builders: &ValueBuilders,
    cache: &SchemaCache,
    source: &Arc<dyn SchemaSource>,
) -> Result<Arc<Schema>, ReflectError> {
    SchemaResolver {
        builders,
        cache,
        in_progress: Vec::new(),
    }
    .resolve(source)
}

struct SchemaResolver<'a> {
    builders: &'a ValueBuilders,
    cache: &'a SchemaCache,
    in_progress: Vec<TypeKey>,
}

impl SchemaResolver<'_> {
    fn resolve(&mut self, source: &Arc<dyn SchemaSource>) -> Result<Arc<Schema>, ReflectError> {
        let key = source.key();
        if let Some(schema) = self.cache.get(key) {
            return Ok(schema);
        }
        if self.in_progress.contains(&key) {
            return Err(ReflectError {
                type_name: key.name(),
                kind: ReflectErrorKind::Recursive,
            });
        }

        debug!(type_name = key.name(), "resolving schema");
        self.in_progress.push(key);
        let fields = source
            .fields()
            .into_iter()
            .map(|decl| self.resolve_field(key, decl))
            .collect::<Result<Vec<_>, _>>();
        self.in_progress.pop();

        let schema = Schema {
            key,
            fields: fields?,
        };
        debug!(
            type_name = key.name(),
            fields = schema.fields.len(),
            "caching schema"
        );
        Ok(self.cache.insert(schema))
    }

    fn resolve_field(&mut self, owner: TypeKey, decl: FieldDecl) -> Result<FieldSchema, ReflectError> {
        let fail = |kind| ReflectError {
            type_name: owner.name(),
            kind,
        };

        let kind = match decl.element {
            Element::Leaf { .. } if decl.param.nested => {
                return Err(fail(ReflectErrorKind::NestedMismatch {
                    field: decl.field.to_string(),
                    marked: true,
                }));
            }
            Element::Composite(_) if !decl.param.nested => {
                return Err(fail(ReflectErrorKind::NestedMismatch {
                    field: decl.field.to_string(),
                    marked: false,
                }));
            }
            Element::Composite(_) if decl.shape == FieldShape::List => {
                return Err(fail(ReflectErrorKind::NestedList {
                    field: decl.field.to_string(),
                }));
            }
            Element::Leaf {
                value_type,
                ref fallback,
            } => {
                let builder = self
                    .builders
                    .get_or_insert_with(value_type, || fallback.clone())
                    .ok_or_else(|| {
                        fail(ReflectErrorKind::NoConstructor {
                            field: decl.field.to_string(),
                            value_type: value_type.name(),
                        })
                    })?;
                FieldKind::Leaf(builder)
            }
            Element::Composite(ref source) => FieldKind::Composite {
                schema: self.resolve(source)?,
                source: source.clone(),
            },
        };

        Ok(FieldSchema {
            field: decl.field,
            param: decl.param,
            shape: decl.shape,
            kind,
            setter: decl.setter,
        })
    }
}
