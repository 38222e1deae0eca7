use ammonia::Builder;
use arsenal_db::error::ArsenalDbError;
use once_cell::sync::Lazy;
use rocket::{
    fairing::{AdHoc, Fairing},
    http::{uri::Reference, Header, Status},
    request::FlashMessage,
    response::{self, Flash, Redirect},
    serde::json::Json,
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::{convert::TryInto, ffi::OsStr, io::Cursor, path::PathBuf};

// A short hand message <-> flash conversion
pub struct Msg {
    pub flash: Option<String>,
}

impl Msg {
    // Construct a message from a flash message
    pub fn from_flash(flash: Option<FlashMessage<'_>>) -> Self {
        Self {
            flash: flash.map(|f| f.message().to_string()),
        }
    }

    // A message displayed in place, without redirection
    pub fn in_place(msg: impl ToString) -> Self {
        Self {
            flash: Some(msg.to_string()),
        }
    }

    pub fn empty() -> Self {
        Self { flash: None }
    }
}

pub fn sanitize_html(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}

// Links written in the editor may open in a new tab, so `target` survives sanitizing.
pub static SANITIZER: Lazy<Builder> = Lazy::new(|| {
    let mut builder = ammonia::Builder::default();
    builder
        .add_tag_attributes("a", &["target"])
        .add_tag_attributes("img", &["alt", "src"])
        .link_rel(Some("noopener noreferrer"));
    builder
});

pub trait IntoFlash<T> {
    fn into_flash(self, uri: impl TryInto<Reference<'static>>) -> Result<T, Flash<Redirect>>;
}

impl<T, E> IntoFlash<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn into_flash(self, uri: impl TryInto<Reference<'static>>) -> Result<T, Flash<Redirect>> {
        self.map_err(|e| Flash::error(Redirect::to(uri), e.to_string()))
    }
}

/// Body of every error returned under `/api`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

pub type ApiError = (Status, Json<ApiErrorBody>);

pub fn api_error(status: Status, msg: impl ToString) -> ApiError {
    (
        status,
        Json(ApiErrorBody {
            error: msg.to_string(),
        }),
    )
}

pub trait IntoApiError<T> {
    fn into_api(self) -> Result<T, ApiError>;
}

impl<T> IntoApiError<T> for Result<T, ArsenalDbError> {
    fn into_api(self) -> Result<T, ApiError> {
        self.map_err(|e| {
            let status = if e.is_not_found() {
                Status::NotFound
            } else if e.is_validation() {
                Status::UnprocessableEntity
            } else if matches!(e, ArsenalDbError::NotPermitted | ArsenalDbError::DisabledUser) {
                Status::Forbidden
            } else {
                log::error!("request failed: {}", e);
                Status::InternalServerError
            };
            api_error(status, e)
        })
    }
}

#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Asset;

pub struct StaticFile(pub PathBuf);

impl<'r, 'o: 'r> rocket::response::Responder<'r, 'o> for StaticFile {
    fn respond_to(self, _: &'r rocket::request::Request<'_>) -> rocket::response::Result<'o> {
        let filename = self.0.display().to_string();
        Asset::get(&filename).map_or_else(
            || Err(Status::NotFound),
            |d| {
                let ext = self
                    .0
                    .as_path()
                    .extension()
                    .and_then(OsStr::to_str)
                    .ok_or_else(|| Status::new(400))?;
                let content_type = rocket::http::ContentType::from_extension(ext)
                    .ok_or_else(|| Status::new(400))?;
                response::Response::build()
                    .header(content_type)
                    .header(Header::new("Cache-Control", "max-age=31536000"))
                    .sized_body(d.data.len(), Cursor::new(d.data))
                    .ok()
            },
        )
    }
}

pub fn create_fairing<'a, T: Deserialize<'a> + Sync + Send + 'static>(
    name: &'static str,
) -> impl Fairing {
    AdHoc::try_on_ignite(name, move |rocket| async move {
        let config: T = match rocket.figment().extract_inner(name) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Invalid configuration: {:?}", e);
                return Err(rocket);
            }
        };

        Ok(rocket.manage(config))
    })
}

/// An option of a select box or a filter bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: &'static str,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    pub fn list<T: Copy + PartialEq>(
        all: &[T],
        current: Option<T>,
        value: impl Fn(&T) -> &'static str,
    ) -> Vec<Choice> {
        all.iter()
            .map(|item| {
                let value = value(item);
                Choice {
                    value,
                    label: capitalize(value),
                    selected: current == Some(*item),
                }
            })
            .collect()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Amounts in cents, as shown in templates
pub trait Dollars {
    fn dollars(&self) -> String;
}

impl Dollars for i64 {
    fn dollars(&self) -> String {
        format_cents(*self)
    }
}

/// Format an amount in cents for display
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

/// Parse a price typed by a user ("12", "12.5", "$1,200.00") into cents
pub fn parse_cents(input: &str) -> Option<i64> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() || frac.len() > 2 {
        return None;
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    whole.checked_mul(100)?.checked_add(frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents() {
        assert_eq!(parse_cents("12"), Some(1200));
        assert_eq!(parse_cents("$1,200.5"), Some(120050));
        assert_eq!(parse_cents(".99"), Some(99));
        assert_eq!(parse_cents("1.999"), None);
        assert_eq!(parse_cents("-3"), None);
        assert_eq!(parse_cents(""), None);
        assert_eq!(format_cents(120050), "$1200.50");
        assert_eq!((-5i64).dollars(), "-$0.05");
    }

    #[test]
    fn choices() {
        let all = [1, 2, 3];
        let choices = Choice::list(&all, Some(2), |n| match n {
            1 => "one",
            2 => "two",
            _ => "three",
        });
        assert_eq!(choices.len(), 3);
        assert_eq!(choices[1].label, "Two");
        assert!(choices[1].selected);
        assert!(!choices[0].selected);
    }

    #[test]
    fn sanitize_keeps_editor_markup() {
        let html = sanitize_html(
            r#"<p><a href="https://example.org" target="_blank">x</a><img src="a.png" alt="A"><script>bad()</script></p>"#,
        );
        assert!(html.contains(r#"target="_blank""#));
        assert!(html.contains(r#"alt="A""#));
        assert!(!html.contains("script"));
    }
}
