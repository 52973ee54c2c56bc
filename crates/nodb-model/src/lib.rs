//! Wire model types for nodb.
//!
//! These types mirror the JSON shapes accepted and returned by the store
//! (`PascalCase` fields, single-key `AttributeValue` objects). Only the eight
//! call kinds the access layer issues are modelled; each one has an input
//! struct, an output struct and a variant in [`StoreRequest`] /
//! [`StoreResponse`].
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod request;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{StoreError, StoreErrorCode};
pub use operations::StoreOperation;
pub use request::{StoreRequest, StoreResponse};
pub use types::{Item, Key, PrimaryKey};
