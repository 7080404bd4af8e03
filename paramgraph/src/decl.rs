//! Field declarations: what a schema source tells the resolver about a type.
//!
//! A [`SchemaSource`] lists a type's parameter-bound fields in declaration
//! order. Most types implement [`Params`] and describe themselves through a
//! [`Declaration`], which produces type-erased [`FieldDecl`]s:
//!
//! ```
//! use paramgraph::{Declaration, Param, Params};
//!
//! #[derive(Debug, Default)]
//! struct Page {
//!     number: u32,
//!     tags: Vec<String>,
//! }
//!
//! impl Params for Page {
//!     fn declare(decl: &mut Declaration<Self>) {
//!         decl.scalar("number", Param::new("page"), |page, n: u32| page.number = n)
//!             .list("tags", Param::new("tags").optional(), |page, tags: Vec<String>| {
//!                 page.tags = tags
//!             });
//!     }
//! }
//! ```

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

use indexmap::IndexSet;

use crate::builder::{Built, FromParam, TypeKey, ValueBuilder};

/// Default separator between the items of a list packed into one value.
pub const DEFAULT_DELIMITER: &str = " ";

/// Parameter metadata attached to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// The parameter key (or path segment, for fields of a nested type).
    pub name: String,
    /// Whether decoding fails when the parameter is missing. Defaults to `true`.
    pub required: bool,
    /// Whether the field is built from the sub-tree under `name`.
    pub nested: bool,
    /// Accepted values, compared case-insensitively. Empty accepts anything.
    pub expected: IndexSet<String>,
    /// Whether every raw value of a list is split on `delimiter`, rather
    /// than only the first one.
    pub parsable: bool,
    /// Separator between list items packed into one raw value.
    pub delimiter: String,
    /// Whether the parameter may be repeated.
    pub allow_many: bool,
}

impl Param {
    /// Metadata for parameter `name`, with every other setting at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            nested: false,
            expected: IndexSet::new(),
            parsable: false,
            delimiter: DEFAULT_DELIMITER.to_string(),
            allow_many: false,
        }
    }

    /// Mark the parameter as optional.
    pub fn optional(self) -> Self {
        self.required(false)
    }

    /// Set whether the parameter is required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Mark the field as composite.
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    /// Restrict the accepted values.
    pub fn expected<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected.extend(values.into_iter().map(Into::into));
        self
    }

    /// Split every raw value of a list, not just the first.
    pub fn parsable(mut self) -> Self {
        self.parsable = true;
        self
    }

    /// Use `delimiter` between packed list items.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Allow the parameter to be repeated.
    pub fn allow_many(mut self) -> Self {
        self.allow_many = true;
        self
    }

    /// Whether `value` passes the whitelist.
    pub fn accepts(&self, value: &str) -> bool {
        if self.expected.is_empty() {
            return true;
        }
        let value = value.to_lowercase();
        self.expected
            .iter()
            .any(|expected| expected.to_lowercase() == value)
    }
}

/// The container shape of a field, which drives how its raw values are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    /// A bare value.
    Scalar,
    /// A `Vec` of values.
    List,
    /// An `Option` of a value.
    Optional,
}

/// A converted value on its way into a target field.
pub enum Slot {
    /// Nothing to assign; the field keeps its zero value.
    Unset,
    /// A scalar value.
    Value(Built),
    /// The items of a list.
    List(Vec<Built>),
    /// An optional value.
    Optional(Option<Built>),
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Unset => f.write_str("Unset"),
            Slot::Value(_) => f.write_str("Value(..)"),
            Slot::List(items) => write!(f, "List(len = {})", items.len()),
            Slot::Optional(item) => write!(f, "Optional(is_some = {})", item.is_some()),
        }
    }
}

/// An assignment hook received a target or value of a type it was not declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongType {
    /// The type the hook expected.
    pub expected: &'static str,
}

impl WrongType {
    fn of<V: 'static>() -> Self {
        Self {
            expected: core::any::type_name::<V>(),
        }
    }
}

impl fmt::Display for WrongType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a value of type {}", self.expected)
    }
}

impl core::error::Error for WrongType {}

type SetFn = dyn Fn(&mut dyn Any, Slot) -> Result<(), WrongType> + Send + Sync;

/// Type-erased hook that stores a [`Slot`] into one field of a target.
#[derive(Clone)]
pub struct Setter(Arc<SetFn>);

impl Setter {
    /// Wrap an assignment function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Any, Slot) -> Result<(), WrongType> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Store `slot` into `target`.
    pub fn assign(&self, target: &mut dyn Any, slot: Slot) -> Result<(), WrongType> {
        (self.0)(target, slot)
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
    }
}

/// What a field's values are made of.
#[derive(Clone)]
pub enum Element {
    /// A value converted from one raw string.
    Leaf {
        /// The value type, used as the registry key.
        value_type: TypeKey,
        /// The builder to cache when none is registered for `value_type`.
        fallback: Option<ValueBuilder>,
    },
    /// A value assembled from the fields of another type.
    Composite(Arc<dyn SchemaSource>),
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Leaf { value_type, .. } => f
                .debug_struct("Leaf")
                .field("value_type", value_type)
                .finish_non_exhaustive(),
            Element::Composite(source) => f.debug_tuple("Composite").field(&source.key()).finish(),
        }
    }
}

/// One field as declared by a [`SchemaSource`].
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// The Rust field name, used in error reports.
    pub field: Cow<'static, str>,
    /// Parameter metadata.
    pub param: Param,
    /// Container shape.
    pub shape: FieldShape,
    /// Element kind.
    pub element: Element,
    /// Assignment hook.
    pub setter: Setter,
}

/// The introspection boundary: lists a type's fields and allocates instances of it.
pub trait SchemaSource: Send + Sync {
    /// Identity of the described type, used as the schema cache key.
    fn key(&self) -> TypeKey;

    /// Field declarations in decode order, inherited fields first.
    fn fields(&self) -> Vec<FieldDecl>;

    /// A fresh instance with every field at its zero value.
    fn instantiate(&self) -> Built;
}

/// Types that can be decoded from parameters.
///
/// The `Default` value is the starting point of every decode, and what the
/// fields that were not reached look like in a partial result.
pub trait Params: Default + Send + 'static {
    /// Declare the parameter-bound fields of this type.
    fn declare(decl: &mut Declaration<Self>);
}

/// [`SchemaSource`] backed by a type's [`Params`] implementation.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// The source for `T`.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Params> SchemaSource for Typed<T> {
    fn key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn fields(&self) -> Vec<FieldDecl> {
        let mut decl = Declaration::new();
        T::declare(&mut decl);
        decl.fields
    }

    fn instantiate(&self) -> Built {
        Box::new(T::default())
    }
}

/// The shared [`SchemaSource`] for `T`.
pub fn source_of<T: Params>() -> Arc<dyn SchemaSource> {
    Arc::new(Typed::<T>::new())
}

/// Collects the field declarations of `T`.
pub struct Declaration<T> {
    fields: Vec<FieldDecl>,
    inherited: usize,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Params> Declaration<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            inherited: 0,
            _marker: PhantomData,
        }
    }

    /// A field holding one value.
    pub fn scalar<V: FromParam>(
        &mut self,
        field: &'static str,
        param: Param,
        set: fn(&mut T, V),
    ) -> &mut Self {
        self.leaf::<V>(field, param, FieldShape::Scalar, scalar_setter(set))
    }

    /// A field holding a list of values.
    pub fn list<V: FromParam>(
        &mut self,
        field: &'static str,
        param: Param,
        set: fn(&mut T, Vec<V>),
    ) -> &mut Self {
        let setter = Setter::new(move |target, slot| {
            let target = target_of::<T>(target)?;
            if let Slot::List(items) = slot {
                let items = items
                    .into_iter()
                    .map(take::<V>)
                    .collect::<Result<Vec<_>, _>>()?;
                set(target, items);
            }
            Ok(())
        });
        self.leaf::<V>(field, param, FieldShape::List, setter)
    }

    /// A field holding an optional value.
    pub fn optional<V: FromParam>(
        &mut self,
        field: &'static str,
        param: Param,
        set: fn(&mut T, Option<V>),
    ) -> &mut Self {
        self.leaf::<V>(field, param, FieldShape::Optional, optional_setter(set))
    }

    /// A composite field built from the parameters under `param.name`.
    pub fn nested<N: Params>(
        &mut self,
        field: &'static str,
        param: Param,
        set: fn(&mut T, N),
    ) -> &mut Self {
        self.composite::<N>(field, param, FieldShape::Scalar, scalar_setter(set))
    }

    /// An optional composite field.
    pub fn nested_optional<N: Params>(
        &mut self,
        field: &'static str,
        param: Param,
        set: fn(&mut T, Option<N>),
    ) -> &mut Self {
        self.composite::<N>(field, param, FieldShape::Optional, optional_setter(set))
    }

    /// Include the fields of `P`, reached through `project`.
    ///
    /// Inherited fields are decoded before the type's own fields, in the
    /// order the `inherit` calls were made.
    pub fn inherit<P: Params>(&mut self, project: fn(&mut T) -> &mut P) -> &mut Self {
        let parent = Typed::<P>::new().fields();
        let count = parent.len();
        let lifted = parent.into_iter().map(|decl| {
            let inner = decl.setter;
            FieldDecl {
                setter: Setter::new(move |target, slot| {
                    let target = target_of::<T>(target)?;
                    inner.assign(project(target), slot)
                }),
                ..decl
            }
        });
        let own = self.fields.split_off(self.inherited);
        self.fields.extend(lifted);
        self.fields.extend(own);
        self.inherited += count;
        self
    }

    /// Add a declaration built by hand.
    pub fn push(&mut self, decl: FieldDecl) -> &mut Self {
        self.fields.push(decl);
        self
    }

    fn leaf<V: FromParam>(
        &mut self,
        field: &'static str,
        param: Param,
        shape: FieldShape,
        setter: Setter,
    ) -> &mut Self {
        self.push(FieldDecl {
            field: Cow::Borrowed(field),
            param,
            shape,
            element: Element::Leaf {
                value_type: TypeKey::of::<V>(),
                fallback: V::fallback(),
            },
            setter,
        })
    }

    fn composite<N: Params>(
        &mut self,
        field: &'static str,
        param: Param,
        shape: FieldShape,
        setter: Setter,
    ) -> &mut Self {
        self.push(FieldDecl {
            field: Cow::Borrowed(field),
            param: param.nested(),
            shape,
            element: Element::Composite(source_of::<N>()),
            setter,
        })
    }
}

fn target_of<T: 'static>(target: &mut dyn Any) -> Result<&mut T, WrongType> {
    target.downcast_mut::<T>().ok_or_else(WrongType::of::<T>)
}

fn take<V: 'static>(built: Built) -> Result<V, WrongType> {
    built
        .downcast::<V>()
        .map(|value| *value)
        .map_err(|_| WrongType::of::<V>())
}

fn scalar_setter<T: 'static, V: 'static>(set: fn(&mut T, V)) -> Setter {
    Setter::new(move |target, slot| {
        let target = target_of::<T>(target)?;
        if let Slot::Value(value) = slot {
            set(target, take::<V>(value)?);
        }
        Ok(())
    })
}

fn optional_setter<T: 'static, V: 'static>(set: fn(&mut T, Option<V>)) -> Setter {
    Setter::new(move |target, slot| {
        let target = target_of::<T>(target)?;
        if let Slot::Optional(value) = slot {
            set(target, value.map(take::<V>).transpose()?);
        }
        Ok(())
    })
}
