use chrono::Utc;
use rocket::http::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "session";
/// Sessions with less time left than this are re-issued on the next request.
pub const REFRESH_THRESHOLD_SECS: i64 = 5 * 60;

fn default_ttl() -> i64 {
    60 * 60
}

/// Configuration section `session`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl")]
    pub ttl_secs: i64,
    #[serde(default)]
    pub secure_cookie: bool,
}

/// The content of the encrypted session cookie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    /// Unix timestamp in seconds
    pub expires_at: i64,
}

impl Session {
    pub fn new(uid: impl ToString, config: &SessionConfig) -> Self {
        Self {
            uid: uid.to_string(),
            expires_at: Utc::now().timestamp() + config.ttl_secs,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    pub fn needs_refresh(&self, now: i64) -> bool {
        !self.is_expired(now) && self.expires_at - now < REFRESH_THRESHOLD_SECS
    }

    pub fn load(jar: &CookieJar<'_>) -> Option<Self> {
        jar.get_private(SESSION_COOKIE)
            .and_then(|c| serde_json::from_str(c.value()).ok())
    }

    pub fn store(&self, jar: &CookieJar<'_>, config: &SessionConfig) -> anyhow::Result<()> {
        let cookie = Cookie::build((SESSION_COOKIE, serde_json::to_string(self)?))
            .http_only(true)
            .secure(config.secure_cookie)
            .same_site(SameSite::Lax)
            .path("/");
        jar.add_private(cookie);
        Ok(())
    }

    pub fn clear(jar: &CookieJar<'_>) {
        jar.remove_private(SESSION_COOKIE);
    }
}
