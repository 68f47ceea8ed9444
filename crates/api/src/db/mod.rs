//! Database schema, migrations, and query builders.

pub mod invitations;
pub mod migrations;
pub mod parties;
pub mod tables;
pub mod users;

// Re-export tables for convenience
pub use tables::*;

/// A built statement: SQL text plus its positional values.
pub type Built = (String, sea_query::Values);
