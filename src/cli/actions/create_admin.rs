use crate::{
    api::{
        forms::{normalize_email, password_problems, valid_email},
        handlers::auth::password::hash_password,
    },
    storage::{postgres::PgStore, InsertOutcome, NewUser, Store, User, UserType},
};
use anyhow::{anyhow, bail, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub email: String,
    pub full_name: String,
    pub password: SecretString,
}

/// Execute the create-admin action.
/// # Errors
/// Returns an error if the input is invalid, the email is taken or the
/// database is unreachable.
pub async fn execute(args: Args) -> Result<()> {
    let store = PgStore::connect(&args.dsn).await?;
    store.apply_schema().await?;

    let user = create_admin(&store, &args.email, &args.full_name, &args.password).await?;

    info!(user_id = user.id, email = %user.email, "Administrator created");
    println!("Created administrator {} (id {})", user.email, user.id);

    Ok(())
}

async fn create_admin(
    store: &dyn Store,
    email: &str,
    full_name: &str,
    password: &SecretString,
) -> Result<User> {
    let email = normalize_email(email);
    if !valid_email(&email) {
        bail!("Enter a valid email address.");
    }
    let full_name = full_name.trim();
    if full_name.is_empty() {
        bail!("Full name is required.");
    }
    let problems = password_problems(password.expose_secret());
    if !problems.is_empty() {
        return Err(anyhow!(problems.join(" ")));
    }

    let outcome = store
        .insert_user(NewUser {
            email,
            full_name: full_name.to_string(),
            password_hash: hash_password(password)?,
            user_type: UserType::Admin,
            image: None,
        })
        .await?;

    match outcome {
        InsertOutcome::Created(user) => Ok(user),
        InsertOutcome::EmailTaken => bail!("User with this Email already exists."),
    }
}
