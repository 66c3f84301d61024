//! Token persistence, identity decoding and session lifecycle.
//! Keep the public surface thin and split implementation across sub-modules.

pub mod store;
pub mod tokens;
mod session;

pub use session::SessionManager;
pub use store::TokenStore;
pub use tokens::{decode_identity, TokenPair, UserIdentity};
