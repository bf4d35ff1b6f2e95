//! HTTP handlers

pub mod attempts;
pub mod auth;
pub mod health;
