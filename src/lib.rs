pub mod command;
pub mod error;
pub mod map_utils;
pub mod persistence;
pub mod session;
pub mod shell;
