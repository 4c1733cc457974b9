mod symbol;

pub use symbol::{Interner, Symbol};
