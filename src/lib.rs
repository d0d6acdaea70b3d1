pub mod calc;
pub mod config;
pub mod error;
pub mod flash;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
