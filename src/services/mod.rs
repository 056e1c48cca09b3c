pub mod auth;

pub mod classifier;

pub mod import;
