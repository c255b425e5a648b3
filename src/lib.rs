pub mod auction;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod password;
pub mod query;
pub mod server;
pub mod session;
pub mod store;
pub mod views;
