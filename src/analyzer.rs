//! Semantic side of the engine: the symbol spaces the parser declares into,
//! static types, the built-in registry and the check pass over a finished
//! tree.

pub mod builtins;
mod check;
pub mod scope;
pub mod types;

pub use check::check;
