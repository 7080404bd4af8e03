//! The materializer: walks a [`Schema`] and a [`KeyGraph`] side by side and
//! fills a target.
//!
//! Fields are visited in schema order and the first failure stops the walk,
//! so a rejected decode always carries a target whose fields are set up to
//! (not including) the one that failed.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;

use crate::builder::{Built, ValueBuilder};
use crate::cardinality::{CardinalityError, rule_for};
use crate::decl::{FieldShape, Params, SchemaSource, Slot};
use crate::error::{Cause, FieldError, Rejected, Rule, ValueError};
use crate::graph::{KeyGraph, Level, Node};
use crate::resolve::{FieldKind, FieldSchema, Schema};
use crate::trace;

/// Decode `graph` into a fresh `T` following `schema`.
///
/// `schema` must be the schema of `T`; a schema for another type makes the
/// first assignment fail with [`Cause::WrongType`].
pub fn materialize<T: Params>(schema: &Schema, graph: &KeyGraph) -> Result<T, Rejected<T>> {
    let mut target = T::default();
    match fill(schema.fields(), Level::Roots(graph), &mut target) {
        Ok(()) => Ok(target),
        Err(error) => Err(Rejected {
            error,
            partial: target,
        }),
    }
}

fn fill(fields: &[FieldSchema], level: Level<'_>, target: &mut dyn Any) -> Result<(), FieldError> {
    for field in fields {
        let node = level.get(field.source_key());
        trace!(
            field = field.field(),
            param = field.source_key(),
            path = ?node.map(|node| node.path()),
            "filling field"
        );
        match field.kind() {
            FieldKind::Composite { schema, source } => {
                fill_composite(field, schema.fields(), source.as_ref(), node, target)?
            }
            FieldKind::Leaf(builder) => fill_leaf(field, builder, node, target)?,
        }
    }
    Ok(())
}

fn fill_composite(
    field: &FieldSchema,
    children: &[FieldSchema],
    source: &dyn SchemaSource,
    node: Option<Node<'_>>,
    target: &mut dyn Any,
) -> Result<(), FieldError> {
    let required = field.param().required;
    let slot = match node {
        None if required => {
            return Err(field.error(
                Rule::Required,
                None,
                Cause::Cardinality(CardinalityError::ParamIsNull),
            ));
        }
        None => match field.shape() {
            FieldShape::Optional => Slot::Optional(None),
            _ => Slot::Unset,
        },
        Some(node) if !required && !node.has_children() => {
            return Err(field.error(
                Rule::Optional,
                None,
                Cause::Cardinality(CardinalityError::NoItems),
            ));
        }
        Some(node) => {
            let mut child = source.instantiate();
            fill(children, Level::Children(node), &mut *child)?;
            match field.shape() {
                FieldShape::Optional => Slot::Optional(Some(child)),
                _ => Slot::Value(child),
            }
        }
    };
    assign(field, Rule::for_field(required), None, target, slot)
}

fn fill_leaf(
    field: &FieldSchema,
    builder: &ValueBuilder,
    node: Option<Node<'_>>,
    target: &mut dyn Any,
) -> Result<(), FieldError> {
    let param = field.param();
    let rule = Rule::for_field(param.required);
    let values = node.and_then(|node| node.values());

    rule_for(param.required)
        .run(values, param.allow_many)
        .map_err(|err| field.error(rule, Some(param.name.clone()), Cause::Cardinality(err)))?;

    let values = values.unwrap_or_default();
    let slot = match (field.shape(), values.first()) {
        (FieldShape::List, None) => Slot::List(Vec::new()),
        (FieldShape::Optional, None) => Slot::Optional(None),
        (FieldShape::Scalar, None) => Slot::Unset,
        (FieldShape::List, Some(first)) => {
            let mut items = Vec::new();
            if param.parsable {
                for value in values {
                    split_into(value, &param.delimiter, &mut items);
                }
            } else {
                split_into(first, &param.delimiter, &mut items);
                items.extend(values[1..].iter().map(String::as_str));
            }
            check_expected(field, items.iter().copied())?;
            let built = items
                .into_iter()
                .map(|item| build(field, rule, builder, item))
                .collect::<Result<Vec<_>, _>>()?;
            Slot::List(built)
        }
        (FieldShape::Optional, Some(first)) => {
            check_expected(field, [first.as_str()])?;
            Slot::Optional(Some(build(field, rule, builder, first)?))
        }
        (FieldShape::Scalar, Some(first)) => {
            let mut tokens = Vec::new();
            split_into(first, &param.delimiter, &mut tokens);
            check_expected(field, tokens)?;
            Slot::Value(build(field, rule, builder, first)?)
        }
    };

    assign(field, rule, Some(param.name.clone()), target, slot)
}

/// Push the non-empty pieces of `value` split on `delimiter`.
fn split_into<'v>(value: &'v str, delimiter: &str, out: &mut Vec<&'v str>) {
    if delimiter.is_empty() {
        if !value.is_empty() {
            out.push(value);
        }
        return;
    }
    out.extend(value.split(delimiter).filter(|item| !item.is_empty()));
}

fn check_expected<'v>(
    field: &FieldSchema,
    items: impl IntoIterator<Item = &'v str>,
) -> Result<(), FieldError> {
    let param = field.param();
    match items.into_iter().find(|item| !param.accepts(item)) {
        None => Ok(()),
        Some(rejected) => {
            trace!(field = field.field(), value = rejected, "value not in whitelist");
            Err(field.error(
                Rule::Required,
                Some(param.name.clone()),
                Cause::Value(ValueError {
                    field: field.field().to_string(),
                    param: param.name.clone(),
                    value: rejected.to_string(),
                }),
            ))
        }
    }
}

fn build(
    field: &FieldSchema,
    rule: Rule,
    builder: &ValueBuilder,
    raw: &str,
) -> Result<Built, FieldError> {
    builder
        .build(raw)
        .map_err(|err| field.error(rule, Some(field.param().name.clone()), Cause::Construct(err)))
}

fn assign(
    field: &FieldSchema,
    rule: Rule,
    param: Option<String>,
    target: &mut dyn Any,
    slot: Slot,
) -> Result<(), FieldError> {
    field
        .setter
        .assign(target, slot)
        .map_err(|err| field.error(rule, param, Cause::WrongType(err)))
}

impl FieldSchema {
    fn error(&self, rule: Rule, param: Option<String>, cause: Cause) -> FieldError {
        FieldError {
            rule,
            field: self.field().to_string(),
            param,
            cause,
        }
    }
}
