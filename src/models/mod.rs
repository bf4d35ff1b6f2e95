//! Data models

pub mod attempt;
pub mod user;

pub use attempt::*;
pub use user::*;
