pub mod analytics;
pub mod annotation;
pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod service;
pub mod sort;
pub mod subscriber;
