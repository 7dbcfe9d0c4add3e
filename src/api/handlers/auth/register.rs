use axum::{http::HeaderMap, response::Response, Extension};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::password::hash_password;
use crate::{
    api::{
        error::AppError,
        flash::Flash,
        forms::{FieldErrors, FormInput, UserForm, UserFormKind},
        views, AppState,
    },
    storage::{InsertOutcome, NewUser, UserType},
};

pub async fn register_form(headers: HeaderMap) -> Response {
    let flash = Flash::from_headers(&headers);
    views::render(
        flash,
        None,
        "Register",
        &views::register_page(&UserForm::default(), &FieldErrors::default()),
    )
}

/// Self registration. New accounts are always `regular`.
#[instrument(skip_all)]
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    input: FormInput,
) -> Result<Response, AppError> {
    let mut flash = Flash::from_headers(&headers);
    let form = UserForm::from_input(input);

    let mut errors = form
        .validate(UserFormKind::Register, state.store(), None)
        .await?;
    if !errors.is_empty() {
        flash.error("Invalid Form Request");
        return Ok(views::render(
            flash,
            None,
            "Register",
            &views::register_page(&form, &errors),
        ));
    }

    let password_hash = hash_password(&form.password1)?;
    let image = match &form.image {
        Some(upload) => Some(state.media().save_user_image(upload).await?),
        None => None,
    };

    let outcome = state
        .store()
        .insert_user(NewUser {
            email: form.normalized_email(),
            full_name: form.full_name.clone(),
            password_hash,
            user_type: UserType::Regular,
            image: image.clone(),
        })
        .await;

    match outcome {
        Ok(InsertOutcome::Created(user)) => {
            info!(user_id = user.id, "User registered");
            flash.discard_pending();
            flash.success("Registration Success. Login Now.");
            Ok(flash.redirect("/login"))
        }
        Ok(InsertOutcome::EmailTaken) => {
            warn!("Registration raced with an existing email");
            discard_image(&state, image.as_deref()).await;
            errors.add("email", "User with this Email already exists.");
            flash.error("Invalid Form Request");
            Ok(views::render(
                flash,
                None,
                "Register",
                &views::register_page(&form, &errors),
            ))
        }
        Err(err) => {
            discard_image(&state, image.as_deref()).await;
            Err(err.into())
        }
    }
}

/// Remove an image saved for a user record that was never written.
pub(crate) async fn discard_image(state: &AppState, image: Option<&str>) {
    if let Some(image) = image {
        if let Err(err) = state.media().delete(image).await {
            warn!("Failed to remove orphaned image: {err:#}");
        }
    }
}
