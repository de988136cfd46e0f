pub mod catalog;
pub mod clean;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod summary;
