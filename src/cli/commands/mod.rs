//! CLI command implementations.

pub mod evaluate;
pub mod init;
pub mod suggest;
pub mod track;
