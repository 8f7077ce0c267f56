//! Command-line surface over the store and query engine.

pub mod commands;
