mod openapi;
pub use openapi::*;

#[cfg(debug_assertions)]
pub mod auth;

pub mod me;

pub mod transactions;
