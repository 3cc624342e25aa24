pub mod api;
pub mod bulk_update;
pub mod catalog;
pub mod error;
pub mod financials;
pub mod models;
pub mod peers;
pub mod publisher;
pub mod server;
pub mod utils;
