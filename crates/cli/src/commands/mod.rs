//! Command implementations

pub mod transfer;
pub mod validate;
