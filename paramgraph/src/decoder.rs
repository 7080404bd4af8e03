//! The decoder: owns the builder registry and the schema cache, and runs the
//! whole pipeline in one call.
//!
//! ```
//! use paramgraph::{Declaration, Decoder, Param, Params};
//!
//! #[derive(Debug, Default)]
//! struct Search {
//!     query: String,
//!     limit: Option<u32>,
//! }
//!
//! impl Params for Search {
//!     fn declare(decl: &mut Declaration<Self>) {
//!         decl.scalar("query", Param::new("q"), |s, q: String| s.query = q)
//!             .optional("limit", Param::new("limit").optional(), |s, limit: Option<u32>| {
//!                 s.limit = limit
//!             });
//!     }
//! }
//!
//! let decoder = Decoder::new();
//! let search: Search = decoder.decode([("q", ["rust"])]).unwrap();
//! assert_eq!(search.query, "rust");
//! assert_eq!(search.limit, None);
//! ```

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::builder::{TypeKey, ValueBuilder, ValueBuilders};
use crate::decl::{Params, SchemaSource, source_of};
use crate::error::{DecodeError, ReflectError};
use crate::graph::{KEY_DELIMITER, KeyGraph};
use crate::materialize::materialize;
use crate::resolve::{Schema, SchemaCache, resolve};
use crate::debug;

/// Decodes parameter maps into [`Params`] types.
///
/// A decoder is `Send + Sync`; share one (for example behind an `Arc`) so
/// that schemas and value builders are only derived once per type.
#[derive(Debug)]
pub struct Decoder {
    builders: ValueBuilders,
    schemas: SchemaCache,
    key_delimiter: char,
}

impl Decoder {
    /// A decoder with the built-in value builders and `.` as key delimiter.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a decoder.
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::new()
    }

    /// The value builder registry.
    pub fn builders(&self) -> &ValueBuilders {
        &self.builders
    }

    /// The schema cache.
    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    /// The delimiter between path segments in parameter keys.
    pub fn key_delimiter(&self) -> char {
        self.key_delimiter
    }

    /// The schema of `T`, resolving and caching it on first use.
    pub fn schema<T: Params>(&self) -> Result<Arc<Schema>, ReflectError> {
        if let Some(schema) = self.schemas.get(TypeKey::of::<T>()) {
            return Ok(schema);
        }
        self.schema_for(&source_of::<T>())
    }

    /// The schema of the type behind `source`.
    pub fn schema_for(&self, source: &Arc<dyn SchemaSource>) -> Result<Arc<Schema>, ReflectError> {
        resolve(&self.builders, &self.schemas, source)
    }

    /// Arrange `raw` into a key graph using this decoder's key delimiter.
    pub fn graph<I, K, V, S>(&self, raw: I) -> KeyGraph
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[S]>,
        S: AsRef<str>,
    {
        KeyGraph::build_with(raw, self.key_delimiter)
    }

    /// Decode `raw` into a `T`.
    ///
    /// On a field failure the error carries the partially filled target.
    pub fn decode<T, I, K, V, S>(&self, raw: I) -> Result<T, DecodeError<T>>
    where
        T: Params,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[S]>,
        S: AsRef<str>,
    {
        let schema = self.schema::<T>()?;
        let graph = self.graph(raw);
        Ok(materialize(&schema, &graph)?)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configures a [`Decoder`].
#[derive(Debug)]
pub struct DecoderBuilder {
    key_delimiter: char,
    builtins: bool,
    builders: Vec<ValueBuilder>,
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self {
            key_delimiter: KEY_DELIMITER,
            builtins: true,
            builders: Vec::new(),
        }
    }
}

impl DecoderBuilder {
    /// A builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split parameter keys on `delimiter` instead of `.`.
    pub fn key_delimiter(mut self, delimiter: char) -> Self {
        self.key_delimiter = delimiter;
        self
    }

    /// Use `builder` for its value type, replacing any built-in or fallback builder.
    pub fn register(mut self, builder: ValueBuilder) -> Self {
        self.builders.push(builder);
        self
    }

    /// Start from an empty registry, without the built-in builders.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Build the decoder.
    pub fn build(self) -> Decoder {
        let builders = if self.builtins {
            ValueBuilders::new()
        } else {
            ValueBuilders::empty()
        };
        for builder in self.builders {
            builders.register(builder);
        }
        debug!(
            key_delimiter = %self.key_delimiter,
            builders = builders.len(),
            "decoder ready"
        );
        Decoder {
            builders,
            schemas: SchemaCache::new(),
            key_delimiter: self.key_delimiter,
        }
    }
}
