pub mod api;
pub mod auth;
pub mod clients;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod registry;
pub mod utils;
pub mod validator;
pub mod worker;
