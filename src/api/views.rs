//! Server-rendered HTML pages. Every interpolated value goes through [`escape`].

use axum::{
    http::{header::SET_COOKIE, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::fmt::Write as _;

use super::{
    flash::{Flash, FlashMessage},
    forms::{FieldErrors, UserForm, UserFormKind},
    handlers::auth::principal::Principal,
};
use crate::storage::{GalleryImage, User, UserType};

pub(crate) fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render a full page, consuming the flash so its messages show exactly once.
pub fn render(flash: Flash, principal: Option<&Principal>, title: &str, body: &str) -> Response {
    let (messages, clear_cookie) = flash.take();
    let mut response = (
        StatusCode::OK,
        Html(layout(title, principal, &messages, body)),
    )
        .into_response();
    if let Some(cookie) = clear_cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

fn layout(
    title: &str,
    principal: Option<&Principal>,
    messages: &[FlashMessage],
    body: &str,
) -> String {
    let mut nav = String::new();
    match principal {
        Some(principal) => {
            nav.push_str(r#"<a href="/">Dashboard</a>"#);
            if principal.is_admin() {
                nav.push_str(r#" <a href="/users">Users</a>"#);
            }
            let _ = write!(
                nav,
                r#" <span class="who">{}</span> <a href="/logout">Logout</a>"#,
                escape(&principal.full_name)
            );
        }
        None => nav.push_str(r#"<a href="/login">Login</a> <a href="/register">Register</a>"#),
    }

    let mut alerts = String::new();
    for message in messages {
        let _ = write!(
            alerts,
            r#"<div class="alert alert-{}">{}</div>"#,
            message.level.as_str(),
            escape(&message.message)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} | simo</title></head>
<body>
<nav>{nav}</nav>
<div class="messages">{alerts}</div>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

/// Standalone page used for 404/500 responses.
#[must_use]
pub fn error_page(title: &str, message: &str) -> String {
    layout(title, None, &[], &format!("<p>{}</p>", escape(message)))
}

fn field_errors(errors: &FieldErrors, field: &str) -> String {
    let mut html = String::new();
    for message in errors.get(field) {
        let _ = write!(html, r#"<p class="field-error">{}</p>"#, escape(message));
    }
    html
}

fn text_input(name: &str, label: &str, kind: &str, value: &str, errors: &FieldErrors) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label><input type="{kind}" id="{name}" name="{name}" value="{value}">{errs}</p>"#,
        value = escape(value),
        errs = field_errors(errors, name),
    )
}

#[must_use]
pub fn login_page(email: &str) -> String {
    let errors = FieldErrors::default();
    format!(
        r#"<form method="post" action="/login">
{email}
{password}
<p><label><input type="checkbox" name="remember"> Remember me</label></p>
<button type="submit">Login</button>
</form>
<p>No account? <a href="/register">Register</a></p>"#,
        email = text_input("email", "Email", "email", email, &errors),
        password = text_input("password", "Password", "password", "", &errors),
    )
}

fn user_fields(form: &UserForm, errors: &FieldErrors, kind: UserFormKind) -> String {
    let mut html = String::new();
    html.push_str(&text_input("email", "Email", "email", &form.email, errors));
    html.push_str(&text_input(
        "full_name",
        "Full name",
        "text",
        &form.full_name,
        errors,
    ));

    if kind != UserFormKind::Register {
        let mut options = String::new();
        for user_type in [UserType::Regular, UserType::Admin] {
            let selected = if form.user_type == user_type.as_str() {
                " selected"
            } else {
                ""
            };
            let _ = write!(
                options,
                r#"<option value="{value}"{selected}>{value}</option>"#,
                value = user_type.as_str()
            );
        }
        let _ = write!(
            html,
            r#"<p><label for="user_type">User type</label><select id="user_type" name="user_type">{options}</select>{errs}</p>"#,
            errs = field_errors(errors, "user_type"),
        );
    }

    html.push_str(&text_input("password1", "Password", "password", "", errors));
    html.push_str(&text_input(
        "password2",
        "Password confirmation",
        "password",
        "",
        errors,
    ));
    let _ = write!(
        html,
        r#"<p><label for="image">Profile image</label><input type="file" id="image" name="image" accept="image/*">{errs}</p>"#,
        errs = field_errors(errors, "image"),
    );
    html
}

#[must_use]
pub fn register_page(form: &UserForm, errors: &FieldErrors) -> String {
    format!(
        r#"<form method="post" action="/register" enctype="multipart/form-data">
{fields}
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login">Login</a></p>"#,
        fields = user_fields(form, errors, UserFormKind::Register),
    )
}

/// Admin add/edit form posting to `action`.
#[must_use]
pub fn user_form_page(action: &str, form: &UserForm, errors: &FieldErrors, kind: UserFormKind) -> String {
    let hint = if kind == UserFormKind::AdminEdit {
        "<p class=\"hint\">Leave both password fields empty to keep the current password.</p>"
    } else {
        ""
    };
    format!(
        r#"<form method="post" action="{action}" enctype="multipart/form-data">
{fields}
{hint}
<button type="submit">Save</button>
</form>
<p><a href="/users">Back to users</a></p>"#,
        action = escape(action),
        fields = user_fields(form, errors, kind),
    )
}

#[must_use]
pub fn dashboard_page(images: &[GalleryImage], principal: &Principal) -> String {
    if images.is_empty() {
        return "<p>No images yet.</p>".to_string();
    }

    let mut html = String::from(r#"<ul class="gallery">"#);
    for image in images {
        let _ = write!(
            html,
            r#"<li data-image-id="{id}"><h2>{title}</h2><p>{description}</p><p class="meta">{created}"#,
            id = image.id,
            title = escape(&image.title),
            description = escape(&image.description),
            created = escape(&image.created_at),
        );
        if principal.is_admin() {
            let _ = write!(html, r#" · owner #{}"#, image.user_id);
        }
        html.push_str("</p><ul class=\"files\">");
        for file in &image.files {
            let _ = write!(
                html,
                r#"<li data-file-id="{}">{}</li>"#,
                file.id,
                escape(&file.file)
            );
        }
        html.push_str("</ul></li>");
    }
    html.push_str("</ul>");
    html
}

#[must_use]
pub fn users_page(users: &[User]) -> String {
    let mut html = String::from(
        r#"<p><a href="/users/add">Add user</a></p>
<table class="users">
<thead><tr><th>ID</th><th>Email</th><th>Full name</th><th>Type</th><th>Image</th><th>Joined</th><th></th></tr></thead>
<tbody>"#,
    );
    for user in users {
        let _ = write!(
            html,
            r#"<tr data-user-id="{id}"><td>{id}</td><td>{email}</td><td>{name}</td><td>{kind}</td><td>{image}</td><td>{created}</td><td><a href="/users/edit/{id}">Edit</a> <form method="post" action="/users/delete/{id}"><button type="submit">Delete</button></form></td></tr>"#,
            id = user.id,
            email = escape(&user.email),
            name = escape(&user.full_name),
            kind = user.user_type,
            image = escape(user.image.as_deref().unwrap_or("")),
            created = escape(&user.created_at),
        );
    }
    html.push_str("</tbody></table>");
    html
}
