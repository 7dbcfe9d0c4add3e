//! Admin-only user management: list, add, edit and delete.

use axum::{
    extract::Path,
    http::{
        header::{HOST, REFERER},
        HeaderMap, Uri,
    },
    response::Response,
    Extension,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::auth::{password::hash_password, register::discard_image, Principal};
use crate::{
    api::{
        error::AppError,
        flash::Flash,
        forms::{FieldErrors, FormInput, UserForm, UserFormKind},
        views, AppState,
    },
    storage::{InsertOutcome, NewUser, UpdateOutcome},
};

const USERS_PATH: &str = "/users";
const ADD_PATH: &str = "/users/add";

fn edit_path(id: i64) -> String {
    format!("/users/edit/{id}")
}

/// Where to send the admin back to after a rejected edit.
///
/// Only a path-only or same-host `Referer` is honored, and only its path and
/// query are kept.
fn back_to(headers: &HeaderMap, id: i64) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok())
        .filter(|referer| match referer.authority() {
            Some(authority) => headers
                .get(HOST)
                .and_then(|host| host.to_str().ok())
                .is_some_and(|host| host.eq_ignore_ascii_case(authority.as_str())),
            None => referer.scheme().is_none(),
        })
        .and_then(|referer| {
            referer
                .path_and_query()
                .map(|path| path.as_str().to_string())
        })
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| edit_path(id))
}

pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let users = state.store().list_users().await?;
    Ok(views::render(
        Flash::from_headers(&headers),
        Some(&principal),
        "Users",
        &views::users_page(&users),
    ))
}

pub async fn add_user_form(
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Response {
    views::render(
        Flash::from_headers(&headers),
        Some(&principal),
        "Add User",
        &views::user_form_page(
            ADD_PATH,
            &UserForm::default(),
            &FieldErrors::default(),
            UserFormKind::AdminRegister,
        ),
    )
}

#[instrument(skip_all)]
pub async fn add_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    input: FormInput,
) -> Result<Response, AppError> {
    let mut flash = Flash::from_headers(&headers);
    let form = UserForm::from_input(input);
    let kind = UserFormKind::AdminRegister;

    let mut errors = form.validate(kind, state.store(), None).await?;
    let role = match form.role(kind) {
        Some(role) if errors.is_empty() => role,
        _ => {
            return Ok(render_user_form(
                flash,
                &principal,
                "Add User",
                ADD_PATH,
                &form,
                &errors,
                kind,
            ))
        }
    };

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
            user_type: role,
            image: image.clone(),
        })
        .await;

    match outcome {
        Ok(InsertOutcome::Created(user)) => {
            info!(
                admin_id = principal.user_id,
                user_id = user.id,
                user_type = %user.user_type,
                "User added"
            );
            flash.success("User Added Successfully!");
            Ok(flash.redirect(USERS_PATH))
        }
        Ok(InsertOutcome::EmailTaken) => {
            discard_image(&state, image.as_deref()).await;
            errors.add("email", "User with this Email already exists.");
            Ok(render_user_form(
                flash,
                &principal,
                "Add User",
                ADD_PATH,
                &form,
                &errors,
                kind,
            ))
        }
        Err(err) => {
            discard_image(&state, image.as_deref()).await;
            Err(err.into())
        }
    }
}

pub async fn edit_user_form(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = state.store().find_user(id).await?.ok_or(AppError::NotFound)?;
    Ok(render_user_form(
        Flash::from_headers(&headers),
        &principal,
        "Edit User",
        &edit_path(id),
        &UserForm::from_user(&user),
        &FieldErrors::default(),
        UserFormKind::AdminEdit,
    ))
}

/// Update a user. Password fields are optional but must be filled together
/// and match; they are checked before any file is touched.
#[instrument(skip_all)]
pub async fn edit_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    input: FormInput,
) -> Result<Response, AppError> {
    let mut user = state.store().find_user(id).await?.ok_or(AppError::NotFound)?;
    let mut flash = Flash::from_headers(&headers);
    let form = UserForm::from_input(input);
    let kind = UserFormKind::AdminEdit;
    let action = edit_path(id);

    let mut errors = form.validate(kind, state.store(), Some(id)).await?;
    let role = match form.role(kind) {
        Some(role) if errors.is_empty() => role,
        _ => {
            return Ok(render_user_form(
                flash, &principal, "Edit User", &action, &form, &errors, kind,
            ))
        }
    };

    let password1 = form.password1.expose_secret();
    let password2 = form.password2.expose_secret();
    let new_password = match (password1.is_empty(), password2.is_empty()) {
        (true, true) => false,
        (false, false) if password1 == password2 => true,
        (false, false) => {
            flash.info("Password Mismatch");
            return Ok(flash.redirect(&back_to(&headers, id)));
        }
        _ => {
            flash.info("Fill up password in both the fields");
            return Ok(flash.redirect(&back_to(&headers, id)));
        }
    };

    if new_password {
        user.password_hash = hash_password(&form.password1)?;
    }

    let old_image = user.image.clone();
    let new_image = match &form.image {
        Some(upload) => Some(state.media().save_user_image(upload).await?),
        None => None,
    };
    if new_image.is_some() {
        user.image.clone_from(&new_image);
    }
    user.email = form.normalized_email();
    user.full_name.clone_from(&form.full_name);
    user.user_type = role;

    match state.store().update_user(&user).await {
        Ok(UpdateOutcome::Updated) => {
            if new_image.is_some() {
                discard_image(&state, old_image.as_deref()).await;
            }
            info!(
                admin_id = principal.user_id,
                user_id = id,
                password_changed = new_password,
                "User updated"
            );
            flash.info("User Record Updated Successfully!");
            Ok(flash.redirect(USERS_PATH))
        }
        Ok(UpdateOutcome::NotFound) => {
            discard_image(&state, new_image.as_deref()).await;
            Err(AppError::NotFound)
        }
        Ok(UpdateOutcome::EmailTaken) => {
            discard_image(&state, new_image.as_deref()).await;
            errors.add("email", "User with this Email already exists.");
            Ok(render_user_form(
                flash, &principal, "Edit User", &action, &form, &errors, kind,
            ))
        }
        Err(err) => {
            discard_image(&state, new_image.as_deref()).await;
            Err(err.into())
        }
    }
}

/// Delete a user and their profile image. Sessions and gallery images
/// cascade in the store.
#[instrument(skip_all)]
pub async fn delete_user(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = state.store().find_user(id).await?.ok_or(AppError::NotFound)?;

    if let Some(image) = &user.image {
        state.media().delete(image).await?;
    }
    if !state.store().delete_user(id).await? {
        return Err(AppError::NotFound);
    }

    info!(admin_id = principal.user_id, user_id = id, "User deleted");
    let mut flash = Flash::from_headers(&headers);
    flash.success("User Record Deleted Successfully!");
    Ok(flash.redirect(USERS_PATH))
}

/// Any method other than POST on the delete route.
pub async fn delete_user_rejected(headers: HeaderMap) -> Response {
    warn!("Rejected delete request with non-POST method");
    let mut flash = Flash::from_headers(&headers);
    flash.error("Failed to Delete!");
    flash.redirect(USERS_PATH)
}

fn render_user_form(
    flash: Flash,
    principal: &Principal,
    title: &str,
    action: &str,
    form: &UserForm,
    errors: &FieldErrors,
    kind: UserFormKind,
) -> Response {
    views::render(
        flash,
        Some(principal),
        title,
        &views::user_form_page(action, form, errors, kind),
    )
}
