//! CLI command implementations

pub mod completions;
pub mod config;
pub mod entity;
pub mod group;
pub mod index;
pub mod search;
