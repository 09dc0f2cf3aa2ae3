// src/lib.rs
pub mod backup;
pub mod classify;
pub mod cli;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod dispatch;
pub mod duplicates;
pub mod error;
pub mod events;
pub mod exit;
pub mod lang;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod syntax;
pub mod transform;
pub mod utils;
pub mod verification;
