pub mod config;
pub mod error;
pub mod instance;
pub mod manifests;
pub mod parser;
pub mod server;
pub mod utils;
pub mod web;
