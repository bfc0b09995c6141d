//! Everything needed to aim a session at a target node.

pub mod bootstrap;
pub mod config;
pub mod identity;
pub mod script;
