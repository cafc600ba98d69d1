//! HTTP handlers

pub mod health;
pub mod logs;
pub mod tracking;
