use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "triplog_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
        }
    }
}

// One-shot notice carried across a redirect in the private cookie jar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

pub fn success(jar: PrivateCookieJar, message: impl Into<String>) -> PrivateCookieJar {
    set(jar, FlashLevel::Success, message.into())
}

pub fn danger(jar: PrivateCookieJar, message: impl Into<String>) -> PrivateCookieJar {
    set(jar, FlashLevel::Danger, message.into())
}

fn set(jar: PrivateCookieJar, level: FlashLevel, message: String) -> PrivateCookieJar {
    let flash = FlashMessage { level, message };
    let value = serde_json::to_string(&flash).unwrap_or_default();
    let cookie = Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .build();
    jar.add(cookie)
}

pub fn take(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<FlashMessage>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = serde_json::from_str(cookie.value()).ok();
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, flash)
}
