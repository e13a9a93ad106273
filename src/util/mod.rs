//! Helpers shared by the backup backends.

pub mod expand;
pub mod fs;
pub mod shell;
