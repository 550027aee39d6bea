pub mod access;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod queries;
pub mod routes;
pub mod schema;
pub mod state;
pub mod stats;
pub mod template;
pub mod utils;
