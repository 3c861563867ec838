pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod report;
