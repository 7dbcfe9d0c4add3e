//! Form extraction and field validation for the login, register and admin
//! user forms.

use anyhow::Result;
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Form,
};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::{
    media::Upload,
    storage::{Store, User, UserType},
};

const IMAGE_FIELD: &str = "image";
const MAX_FULL_NAME_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Password policy: minimum length and not purely numeric.
pub fn password_problems(password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    problems
}

/// Text fields plus an optional `image` file from a url-encoded or
/// multipart body.
#[derive(Debug, Default)]
pub struct FormInput {
    fields: HashMap<String, String>,
    image: Option<Upload>,
}

impl FormInput {
    #[must_use]
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_fields<const N: usize>(fields: [(&str, &str); N]) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            image: None,
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self {
                fields,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let mut input = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);

            match file_name {
                Some(file_name) if name == IMAGE_FIELD => {
                    let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                    // Browsers send an empty part when no file was chosen.
                    if !file_name.is_empty() && !bytes.is_empty() {
                        input.image = Some(Upload { file_name, bytes });
                    }
                }
                Some(_) => {}
                None => {
                    let value = field.text().await.map_err(IntoResponse::into_response)?;
                    input.fields.insert(name, value);
                }
            }
        }

        Ok(input)
    }
}

/// Field name → messages.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember: Option<String>,
}

impl LoginRequest {
    #[must_use]
    pub fn remember(&self) -> bool {
        self.remember.is_some()
    }
}

/// Which of the user forms is being validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserFormKind {
    /// Self registration: role is always `regular`.
    Register,
    /// Admin creates a user: role and both passwords required.
    AdminRegister,
    /// Admin edits a user: passwords optional and checked by the handler.
    AdminEdit,
}

/// Values of the register/admin user forms. Passwords are never rendered back.
#[derive(Debug)]
pub struct UserForm {
    pub email: String,
    pub full_name: String,
    pub user_type: String,
    pub password1: SecretString,
    pub password2: SecretString,
    pub image: Option<Upload>,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            full_name: String::new(),
            user_type: UserType::Regular.as_str().to_string(),
            password1: SecretString::from(String::new()),
            password2: SecretString::from(String::new()),
            image: None,
        }
    }
}

impl UserForm {
    #[must_use]
    pub fn from_input(input: FormInput) -> Self {
        let field = |name: &str| input.field(name).to_string();
        Self {
            email: field("email").trim().to_string(),
            full_name: field("full_name").trim().to_string(),
            user_type: field("user_type").trim().to_string(),
            password1: SecretString::from(field("password1")),
            password2: SecretString::from(field("password2")),
            image: input.image,
        }
    }

    /// Pre-fill from an existing user for the edit form.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            user_type: user.user_type.as_str().to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    /// Parsed role; registration always yields `regular`.
    #[must_use]
    pub fn role(&self, kind: UserFormKind) -> Option<UserType> {
        match kind {
            UserFormKind::Register => Some(UserType::Regular),
            UserFormKind::AdminRegister | UserFormKind::AdminEdit => {
                UserType::parse(&self.user_type)
            }
        }
    }

    /// Validate fields for `kind`. `current_id` excludes the edited user from
    /// the uniqueness check.
    ///
    /// # Errors
    /// Returns an error only when the store lookup fails.
    pub async fn validate(
        &self,
        kind: UserFormKind,
        store: &dyn Store,
        current_id: Option<i64>,
    ) -> Result<FieldErrors> {
        let mut errors = FieldErrors::default();

        let email = self.normalized_email();
        if email.is_empty() {
            errors.add("email", "This field is required.");
        } else if !valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        } else if let Some(existing) = store.find_user_by_email(&email).await? {
            if Some(existing.id) != current_id {
                errors.add("email", "User with this Email already exists.");
            }
        }

        if self.full_name.is_empty() {
            errors.add("full_name", "This field is required.");
        } else if self.full_name.chars().count() > MAX_FULL_NAME_LEN {
            errors.add(
                "full_name",
                format!("Ensure this value has at most {MAX_FULL_NAME_LEN} characters."),
            );
        }

        if self.role(kind).is_none() {
            errors.add("user_type", "Select a valid choice.");
        }

        if kind != UserFormKind::AdminEdit {
            let password1 = self.password1.expose_secret();
            let password2 = self.password2.expose_secret();
            if password1.is_empty() {
                errors.add("password1", "This field is required.");
            }
            if password2.is_empty() {
                errors.add("password2", "This field is required.");
            }
            if !password1.is_empty() && !password2.is_empty() {
                if password1 == password2 {
                    for problem in password_problems(password1) {
                        errors.add("password2", problem);
                    }
                } else {
                    errors.add("password2", "The two password fields didn't match.");
                }
            }
        }

        if let Some(image) = &self.image {
            if !image.has_image_extension() {
                errors.add(
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            }
        }

        Ok(errors)
    }
}
