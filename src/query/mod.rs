//! Query Module
//!
//! Remote SQL execution: the single-call executor, the retrying client built
//! on top of it, and pagination helpers for callers composing query text.

mod client;
mod executor;
pub mod page;

pub use client::ResilientQueryClient;
pub use executor::{HttpQueryExecutor, QueryExecutor, Rows};
pub use page::{count_query, Page};
