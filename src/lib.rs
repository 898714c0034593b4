pub mod auth;
pub mod choices;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod payload;
pub mod routes;
pub mod schema;
pub mod state;
