//! `playgodot` command-line driver.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod output;
