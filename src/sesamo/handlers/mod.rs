pub mod cookie;

pub mod health;
pub use self::health::health;

pub mod register;
pub use self::register::register;

pub mod verify_email;
pub use self::verify_email::verify_email;

pub mod login;
pub use self::login::login;

pub mod refresh;
pub use self::refresh::refresh;

pub mod logout;
pub use self::logout::logout;

pub mod forgot_password;
pub use self::forgot_password::forgot_password;

pub mod reset_password;
pub use self::reset_password::reset_password;

// common helpers for the handlers
use axum::http::HeaderMap;

/// Client address for rate limiting, resolved from proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn missing_headers_mean_no_address() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }
}
