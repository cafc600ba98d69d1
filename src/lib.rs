pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod pixel;
pub mod services;
pub mod web;
