//! Composite tables over the Summit base tables.
//!
//! A [`composite::CompositeTable`] shows one row per instance of a root
//! entity. Its columns are [`descriptor::ColumnDescriptor`]s resolved against
//! the fixed [`graph::RelationshipGraph`]; columns that reach many related
//! rows are reduced to one cell by a [`fold::Fold`]. Tables are filtered,
//! sorted, summarised by [`stats`] and handed to background workers as
//! immutable [`snapshot::TableSnapshot`]s.
//!
//! All access to a store goes through a [`session::Session`], which owns the
//! open store and rebuilds tables lazily after mutations.

pub mod builtin;
pub mod catalog;
pub mod composite;
pub mod dataset;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod fold;
pub mod graph;
pub mod layout;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod value;
pub mod worker;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
