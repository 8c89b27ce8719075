//! Terminal time tracker. Create projects, run a single timer at a time and look at what the
//! day added up to. Nothing is written to disk: a session's data lives as long as the session.
//!

pub mod cli;
pub mod tracker;
pub mod utils;
