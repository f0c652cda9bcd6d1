//! Command implementations for the CLI

pub mod inspect;
pub mod run;
pub mod scripts;
