// Leadwatch: keyword-driven lead harvesting across social and freelance platforms
//
// This is the library root. Each module corresponds to a major subsystem
// of the ingestion pipeline.

pub mod collectors;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod status;

#[cfg(feature = "web")]
pub mod web;
