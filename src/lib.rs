pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod harvester;
pub mod records;
pub mod types;
