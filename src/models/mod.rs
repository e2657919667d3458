//! Growth-curve model library.
//!
//! Models are implemented as small, pure functions dispatched on `ModelKind`
//! so that fitting/bootstrap code can stay generic.

pub mod model;
pub mod start;

pub use model::*;
pub use start::*;
