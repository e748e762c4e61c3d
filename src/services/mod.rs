// Services module - cart state ownership and session scoping

pub mod cart_store;
pub mod session;

pub use cart_store::CartStore;
pub use session::{CartHandle, SessionContext, SessionRegistry};
