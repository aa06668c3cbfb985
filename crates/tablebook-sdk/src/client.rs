//! HTTP implementation of the booking authority.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tablebook_core::{Booking, BookingError, Result, Table};

use crate::authority::BookingAuthority;
use crate::config::{ClientConfig, ConfigError};

/// Message surfaced when a submission is declined without explanation.
pub const BOOKING_FAILED: &str = "Booking failed!";

/// Client for a booking authority reachable over HTTP/JSON.
#[derive(Clone)]
pub struct HttpAuthority {
    /// Base URL of the authority, including any path prefix.
    base_url: Url,

    /// HTTP client.
    http_client: reqwest::Client,
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpAuthority {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was ruled out in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl BookingAuthority for HttpAuthority {
    async fn tables(&self) -> Result<Vec<Table>> {
        self.get_json(self.endpoint(&["tables"])).await
    }

    async fn bookings_by_date(&self, date: NaiveDate) -> Result<Vec<Booking>> {
        let date = date.format("%Y-%m-%d").to_string();
        self.get_json(self.endpoint(&["bookings", &date])).await
    }

    async fn bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        self.get_json(self.endpoint(&["bookings", "user", user_id]))
            .await
    }

    async fn all_bookings(&self) -> Result<Vec<Booking>> {
        self.get_json(self.endpoint(&["bookings"])).await
    }

    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        let response = self
            .http_client
            .post(self.endpoint(&["bookings"]))
            .json(booking)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(rejection(status, &body, Some(BOOKING_FAILED)));
        }

        // A 2xx with a falsy body still means the booking was not taken
        if !accepted(&body) {
            return Err(BookingError::Rejected {
                status: status.as_u16(),
                message: BOOKING_FAILED.to_string(),
            });
        }

        Ok(())
    }

    async fn delete_booking(&self, booking: &Booking) -> Result<()> {
        let response = self
            .http_client
            .post(self.endpoint(&["bookings", "deletebooking"]))
            .json(booking)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.map_err(transport_error)?;
            return Err(rejection(status, &body, None));
        }

        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(rejection(status, &body, None));
    }

    Ok(serde_json::from_slice(&body)?)
}

fn rejection(status: StatusCode, body: &[u8], fallback: Option<&str>) -> BookingError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    BookingError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn transport_error(err: reqwest::Error) -> BookingError {
    if err.is_decode() {
        BookingError::InvalidResponse(err.to_string())
    } else {
        BookingError::Transport(err.to_string())
    }
}

/// Whether a 2xx submit body confirms the booking.
///
/// An empty body is falsy. A JSON body follows [`is_truthy`]; any other
/// text is a plain confirmation message and counts as truthy.
fn accepted(body: &[u8]) -> bool {
    if body.iter().all(u8::is_ascii_whitespace) {
        return false;
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => is_truthy(&value),
        Err(_) => true,
    }
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!("ok")));
        assert!(is_truthy(&json!(1)));
    }

    #[test]
    fn test_accepted_submit_bodies() {
        assert!(accepted(b"Booking created"));
        assert!(accepted(br#"{"message":"ok"}"#));
        assert!(accepted(b"true"));
        assert!(!accepted(b""));
        assert!(!accepted(b"  \n"));
        assert!(!accepted(b"null"));
        assert!(!accepted(b"false"));
        assert!(!accepted(b"0"));
        assert!(!accepted(br#""""#));
    }

    #[test]
    fn test_endpoint_keeps_prefix_and_encodes() {
        let client = HttpAuthority::new(&ClientConfig::new("http://localhost:4000/api/")).unwrap();
        assert_eq!(
            client.endpoint(&["bookings", "user", "jane doe/2"]).as_str(),
            "http://localhost:4000/api/bookings/user/jane%20doe%2F2"
        );
        assert_eq!(
            client.endpoint(&["tables"]).as_str(),
            "http://localhost:4000/api/tables"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpAuthority::new(&ClientConfig::new("not a url")),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            HttpAuthority::new(&ClientConfig::new("mailto:bookings@example.com")),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_rejection_message_fallbacks() {
        let err = rejection(StatusCode::CONFLICT, br#"{"message":"Table already booked"}"#, None);
        assert_eq!(err.to_string(), "Table already booked");

        let err = rejection(StatusCode::BAD_REQUEST, b"", Some(BOOKING_FAILED));
        assert_eq!(err.to_string(), BOOKING_FAILED);

        let err = rejection(StatusCode::NOT_FOUND, b"<html>", None);
        assert_eq!(err.to_string(), "Not Found");
    }
}
