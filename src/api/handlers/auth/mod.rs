//! Auth handlers and supporting modules.
//!
//! Sessions are opaque random tokens stored client-side in the `simo_session`
//! cookie; the database only keeps their SHA-256 hash. Passwords are stored
//! as Argon2id PHC strings.

pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
mod state;

pub use principal::{require_admin, require_guest, require_login, Principal};
pub use state::AuthConfig;
