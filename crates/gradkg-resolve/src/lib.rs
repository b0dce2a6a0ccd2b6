//! Resolvers over the curriculum graph.
//!
//! The graduation resolver reconciles a student's taken courses against a
//! requirement set. The router and the KG context serve the chat backend.

pub mod context;
pub mod graduation;
pub mod router;
pub mod types;

pub use context::KgContext;
pub use graduation::{parse_taken_courses, reconcile, GraduationResolver};
pub use router::{format_history, RouteDecision};
pub use types::*;
