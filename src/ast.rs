mod dump;
mod node;
mod ops;

pub use dump::dump;
pub use node::*;
pub use ops::{BinaryOp, Punct, UnaryOp};
