pub mod config;
pub mod connectors;
pub mod identity;
pub mod shell;
pub mod tasks;
