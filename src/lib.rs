//! # Simo (image gallery portal)
//!
//! `simo` is a server-rendered web portal: visitors register and log in,
//! users browse a gallery of their own images, and administrators manage
//! every user account.
//!
//! ## Sessions
//!
//! Logging in issues an opaque random token in the `simo_session` cookie.
//! Only its SHA-256 hash is stored. Sessions last 12 hours by default and
//! 14 days with "remember me"; logout deletes the stored record.
//!
//! ## Roles
//!
//! Every user is either `admin` or `regular`. Regular users see only their
//! own gallery images; admins see all of them and may add, edit and delete
//! users under `/users`. Self registration always creates `regular` users;
//! the first administrator is created with `simo create-admin`.
//!
//! ## Notifications
//!
//! Outcomes of form submissions are reported with one-shot flash messages
//! carried across the redirect in the `simo_flash` cookie.

pub mod api;
pub mod cli;
pub mod media;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
