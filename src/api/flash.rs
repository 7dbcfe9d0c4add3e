//! One-shot notifications carried between requests.
//!
//! Messages queued on a redirect are stored in the `simo_flash` cookie and
//! shown (then cleared) by the next rendered page.

use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cookies::{build_cookie, clear_cookie, read_cookie};

pub(crate) const FLASH_COOKIE_NAME: &str = "simo_flash";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

/// Messages read from the request plus those added while handling it.
#[derive(Debug, Default)]
pub struct Flash {
    pending: Vec<FlashMessage>,
    added: Vec<FlashMessage>,
    had_cookie: bool,
}

impl Flash {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(raw) = read_cookie(headers, FLASH_COOKIE_NAME) else {
            return Self::default();
        };
        let pending = decode(&raw).unwrap_or_else(|| {
            warn!("Ignoring malformed flash cookie");
            Vec::new()
        });
        Self {
            pending,
            added: Vec::new(),
            had_cookie: true,
        }
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.added.push(FlashMessage {
            level,
            message: message.into(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    /// Drop messages carried in from earlier requests.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    fn messages(self) -> Vec<FlashMessage> {
        let mut messages = self.pending;
        messages.extend(self.added);
        messages
    }

    /// Consume the flash for a rendered page. The returned header clears the
    /// cookie when one was sent.
    #[must_use]
    pub fn take(self) -> (Vec<FlashMessage>, Option<HeaderValue>) {
        let clear = if self.had_cookie {
            clear_cookie(FLASH_COOKIE_NAME, false).ok()
        } else {
            None
        };
        (self.messages(), clear)
    }

    /// Redirect to `to`, carrying every message forward.
    #[must_use]
    pub fn redirect(self, to: &str) -> Response {
        let had_cookie = self.had_cookie;
        let messages = self.messages();
        let mut response = Redirect::to(to).into_response();

        let cookie = if messages.is_empty() {
            if had_cookie {
                clear_cookie(FLASH_COOKIE_NAME, false).ok()
            } else {
                None
            }
        } else {
            build_cookie(FLASH_COOKIE_NAME, &encode(&messages), None, false).ok()
        };

        if let Some(cookie) = cookie {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        response
    }
}

fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

fn decode(raw: &str) -> Option<Vec<FlashMessage>> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(raw.trim())
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}
