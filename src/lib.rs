pub mod args;
pub mod config;
pub mod core;
pub mod encoding;
pub mod errors;
pub mod readwrite;
pub mod runner;
pub mod scenario;
pub mod stats;
