//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action to run: the web server by
//! default, or the `create-admin` bootstrap subcommand.

use crate::cli::actions::{create_admin, server, Action};
use crate::cli::commands::{self, admin, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    if let Some(sub) = matches.subcommand_matches(admin::CMD_CREATE_ADMIN) {
        let email = sub
            .get_one::<String>(admin::ARG_EMAIL)
            .cloned()
            .context("missing required argument: --email")?;
        let full_name = sub
            .get_one::<String>(admin::ARG_FULL_NAME)
            .cloned()
            .context("missing required argument: --full-name")?;
        let password = sub
            .get_one::<String>(admin::ARG_PASSWORD)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --password")?;

        return Ok(Action::CreateAdmin(create_admin::Args {
            dsn,
            email,
            full_name,
            password,
        }));
    }

    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let media_root = matches
        .get_one::<String>(commands::ARG_MEDIA_ROOT)
        .cloned()
        .context("missing required argument: --media-root")?;
    let max_body_bytes = matches
        .get_one::<usize>(commands::ARG_MAX_BODY_BYTES)
        .copied()
        .context("missing required argument: --max-body-bytes")?;
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn,
        media_root,
        max_body_bytes,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        session_cookie_secure: auth_opts.session_cookie_secure,
    }))
}
