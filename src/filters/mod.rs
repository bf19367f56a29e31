//! Filters: stages that test a message and forward it on match.

pub mod base;
pub mod http;
pub mod registry;

pub use base::{Filter, Polarity, Predicate};
pub use http::HttpFilter;
pub use registry::{FilterFactory, FilterRegistry, FilterRegistryBuilder};
