pub mod config;
pub mod error;
pub mod fetch;
pub mod header;
pub mod schema;
pub mod sync;
pub mod writer;
