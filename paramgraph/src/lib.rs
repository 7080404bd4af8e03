#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod builder;
pub use builder::*;

mod cardinality;
pub use cardinality::*;

mod decl;
pub use decl::*;

mod decoder;
pub use decoder::*;

mod error;
pub use error::*;

mod graph;
pub use graph::{GraphNode, KEY_DELIMITER, KeyGraph, Node, NodeData};

mod materialize;
pub use materialize::*;

mod resolve;
pub use resolve::*;

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
#[macro_export]
/// Forwards to tracing::trace when the tracing feature is enabled
macro_rules! trace {
    ($($tt:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
#[macro_export]
/// Forwards to tracing::debug when the tracing feature is enabled
macro_rules! debug {
    ($($tt:tt)*) => {};
}
