use clap::{Arg, Command};

pub const CMD_CREATE_ADMIN: &str = "create-admin";
pub const ARG_EMAIL: &str = "email";
pub const ARG_FULL_NAME: &str = "full-name";
pub const ARG_PASSWORD: &str = "password";

/// `create-admin` bootstraps the first administrator.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command.subcommand(
        Command::new(CMD_CREATE_ADMIN)
            .about("Create an administrator account")
            .arg(
                Arg::new(ARG_EMAIL)
                    .long(ARG_EMAIL)
                    .help("Administrator email")
                    .env("SIMO_ADMIN_EMAIL")
                    .required(true),
            )
            .arg(
                Arg::new(ARG_FULL_NAME)
                    .long(ARG_FULL_NAME)
                    .help("Administrator full name")
                    .env("SIMO_ADMIN_FULL_NAME")
                    .required(true),
            )
            .arg(
                Arg::new(ARG_PASSWORD)
                    .long(ARG_PASSWORD)
                    .help("Administrator password")
                    .env("SIMO_ADMIN_PASSWORD")
                    .hide_env_values(true)
                    .required(true),
            ),
    )
}
