//! Subcommand handlers.

pub mod inspect;
pub mod run;
