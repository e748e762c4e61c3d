// Re-export all model types
pub use self::cart::*;
pub use self::catalog::*;
pub use self::errors::*;
pub use self::validation::*;

mod cart;
mod catalog;
mod errors;
mod validation;
