//! Login, session tokens and the per-identity session registry.
//! Keep the public surface thin and split implementation across sub-modules.

mod provider;
mod session;
mod token;

pub use provider::{AuthProvider, StaticAuthProvider};
pub use session::{SessionError, SessionHandle, SessionRegistry};
pub use token::{Claims, TokenError, TokenSigner};

pub(crate) use session::gen_id;
