//! Value builders: the conversion rules from one raw string to a typed leaf value.
//!
//! Builders are looked up by [`TypeKey`] in a [`ValueBuilders`] registry. The
//! registry starts with the built-in types and fills itself lazily from each
//! leaf type's [`FromParam::fallback`] the first time a schema needs it.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::error::Error;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;
use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::debug;

/// A converted value whose concrete type is only known to the field that asked for it.
pub type Built = Box<dyn Any + Send>;

/// Boxed source error carried by a [`ConstructError`].
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Stable identifier for a Rust type: its [`TypeId`] plus a readable name.
///
/// Equality and hashing only look at the [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for the type `V`.
    pub fn of<V: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: core::any::type_name::<V>(),
        }
    }

    /// The underlying [`TypeId`].
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The type's name, as reported by [`core::any::type_name`].
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type BuildFn = dyn Fn(&str) -> Result<Built, ConstructError> + Send + Sync;

/// Converts a single raw string into a value of one specific type.
///
/// Builders are pure: the same input always produces an equal value or the
/// same failure.
#[derive(Clone)]
pub struct ValueBuilder {
    value_type: TypeKey,
    build: Arc<BuildFn>,
}

impl ValueBuilder {
    /// Wrap a conversion function producing values of type `V`.
    pub fn new<V, E, F>(f: F) -> Self
    where
        V: Send + 'static,
        E: Into<BoxError>,
        F: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
    {
        let value_type = TypeKey::of::<V>();
        Self {
            value_type,
            build: Arc::new(move |raw: &str| match f(raw) {
                Ok(value) => Ok(Box::new(value) as Built),
                Err(err) => Err(ConstructError::new(value_type, raw, err.into())),
            }),
        }
    }

    /// Builder that goes through `V`'s [`FromStr`] implementation.
    pub fn parse<V>() -> Self
    where
        V: FromStr + Send + 'static,
        V::Err: Into<BoxError>,
    {
        Self::new(|raw: &str| raw.parse::<V>())
    }

    /// The type of the values this builder produces.
    pub const fn value_type(&self) -> TypeKey {
        self.value_type
    }

    /// Convert `raw`.
    pub fn build(&self, raw: &str) -> Result<Built, ConstructError> {
        (self.build)(raw)
    }
}

impl fmt::Debug for ValueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueBuilder")
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}

/// A value builder rejected its input.
#[derive(Debug)]
pub struct ConstructError {
    value_type: TypeKey,
    value: String,
    source: BoxError,
}

impl ConstructError {
    /// Creates a construction error for `value`.
    pub fn new(value_type: TypeKey, value: &str, source: BoxError) -> Self {
        Self {
            value_type,
            value: value.to_string(),
            source,
        }
    }

    /// The raw string that could not be converted.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The type the builder was trying to produce.
    pub const fn value_type(&self) -> TypeKey {
        self.value_type
    }
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to construct {} from {:?}", self.value_type, self.value)
    }
}

impl Error for ConstructError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

/// Leaf types that can be bound to a parameter.
///
/// This is the single-string constructor convention: a type either knows how
/// to build itself from one raw string, or it relies on a builder registered
/// ahead of time in [`ValueBuilders`].
pub trait FromParam: Send + 'static {
    /// The builder to cache when the registry has none for this type, or
    /// `None` when a registered builder is mandatory.
    fn fallback() -> Option<ValueBuilder>;
}

macro_rules! from_param_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromParam for $ty {
                fn fallback() -> Option<ValueBuilder> {
                    Some(ValueBuilder::parse::<$ty>())
                }
            }
        )*
    };
}

from_param_via_from_str!(
    String,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    core::net::IpAddr,
    core::net::Ipv4Addr,
    core::net::Ipv6Addr,
    core::net::SocketAddr,
    std::path::PathBuf,
);

// Preregistered by `ValueBuilders::new`.
impl FromParam for Uuid {
    fn fallback() -> Option<ValueBuilder> {
        None
    }
}

/// Registry of value builders, keyed by the type they produce.
///
/// Shared between every decode that goes through the same decoder. Entries
/// are immutable once inserted; concurrent first-time lookups for one type
/// all end up with the first builder that was stored.
pub struct ValueBuilders {
    builders: RwLock<HashMap<TypeKey, ValueBuilder>>,
}

impl ValueBuilders {
    /// A registry holding the built-in builders.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(ValueBuilder::new(|raw: &str| Uuid::parse_str(raw)));
        registry
    }

    /// A registry with no builders at all.
    pub fn empty() -> Self {
        Self {
            builders: RwLock::new(HashMap::new()),
        }
    }

    /// Store `builder` for its value type, returning the one it replaces.
    pub fn register(&self, builder: ValueBuilder) -> Option<ValueBuilder> {
        debug!(value_type = %builder.value_type(), "registering value builder");
        self.builders.write().insert(builder.value_type(), builder)
    }

    /// The builder registered for `value_type`, if any.
    pub fn get(&self, value_type: TypeKey) -> Option<ValueBuilder> {
        self.builders.read().get(&value_type).cloned()
    }

    /// The builder for `value_type`, caching the one produced by `fallback`
    /// when none is registered yet.
    ///
    /// Returns `None` when there is no registered builder and `fallback`
    /// has nothing to offer.
    pub fn get_or_insert_with(
        &self,
        value_type: TypeKey,
        fallback: impl FnOnce() -> Option<ValueBuilder>,
    ) -> Option<ValueBuilder> {
        if let Some(builder) = self.get(value_type) {
            return Some(builder);
        }

        let builder = fallback()?;
        debug!(%value_type, "caching value builder");
        let mut builders = self.builders.write();
        // Another thread may have stored one while we were building ours
        Some(builders.entry(value_type).or_insert(builder).clone())
    }

    /// Whether a builder is stored for `value_type`.
    pub fn contains(&self, value_type: TypeKey) -> bool {
        self.builders.read().contains_key(&value_type)
    }

    /// Number of stored builders.
    pub fn len(&self) -> usize {
        self.builders.read().len()
    }

    /// Whether the registry holds no builders.
    pub fn is_empty(&self) -> bool {
        self.builders.read().is_empty()
    }
}

impl Default for ValueBuilders {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueBuilders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.builders.read().keys()).finish()
    }
}
