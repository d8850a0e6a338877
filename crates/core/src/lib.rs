//! Clipmill core domain logic.
//!
//! Pure types and validation for the comparison lab: the experiment/variant
//! model, run discovery, path containment, ratings, and feedback records.
//! No HTTP or async code lives here; the server crate (`clipmill-lab`) wires
//! these into handlers.

pub mod error;
pub mod experiment;
pub mod feedback;
pub mod paths;
pub mod ratings;
pub mod run;
