pub mod app;
pub mod cache;
pub mod domain;
pub mod error;
pub mod infra;
pub mod query;
