//! Request shaping, continuation and result assembly for a key-value store
//! with hard per-call item limits.
//!
//! [`NoDb`] is the entry point. It sits on top of a caller-provided
//! [`StoreClient`] and hides three store limits from its callers:
//!
//! - batch writes and reads are split into capacity-sized chunks and driven
//!   to completion one call at a time ([`batch`]);
//! - range queries follow continuation cursors until the last page
//!   ([`query`]);
//! - update and key-condition expressions are compiled with collision-free
//!   positional parameters ([`expression`]).
#![allow(missing_docs, clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod batch;
pub mod chunk;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod expression;
pub mod handler;
pub mod provider;
pub mod query;

#[cfg(test)]
mod test_support;

pub use batch::{ChainReport, ItemIntent};
pub use client::StoreClient;
pub use config::NoDbConfig;
pub use error::{NoDbError, NoDbResult};
pub use handler::complete_with;
pub use provider::NoDb;
pub use query::{Paging, QueryOutcome, QueryPage, QueryRequest};
