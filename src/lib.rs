pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod redirect;
pub mod registry;
pub mod state;
pub mod storage;
