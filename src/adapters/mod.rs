//! Adapters connecting the domain ports to concrete infrastructure.

pub mod http;
pub mod sqlite;
