//! gradkg store: SQLite curriculum graph, FTS5 passage index and an
//! in-memory substitution graph.

pub mod graph;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use graph::{GraphStats, SubstitutionGraph, SubstitutionLink};
pub use sqlite::GraphStore;
pub use types::*;
