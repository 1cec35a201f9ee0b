//! Core types and trait definitions for the Summit climbing record store.
//!
//! Entity records and their validation rules, the foreign-key catalog, and
//! the [`store::TableStore`] contract that storage backends implement. No
//! database code lives here.

// `TableStore` spells out `impl Future + Send` itself.
#![allow(async_fn_in_trait)]

pub mod delete;
pub mod difficulty;
pub mod entity;
pub mod error;
pub mod relation;
pub mod store;

pub use error::{Error, Result, ValidationError};
