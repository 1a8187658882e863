// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod batcher;
pub mod db;
pub mod error;
pub mod importer;
pub mod parser;
pub mod progress;
pub mod report;
pub mod schema;
