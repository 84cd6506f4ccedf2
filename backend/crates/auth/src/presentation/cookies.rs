//! Credential cookies and request credential extraction

use axum::http::{HeaderMap, HeaderName, header};
use axum::response::AppendHeaders;
use platform::cookie::extract_cookie;

use crate::application::config::AuthConfig;
use crate::application::credentials::IssuedCredentials;
use crate::application::refresh::RefreshOutput;

pub type SetCookies = AppendHeaders<Vec<(HeaderName, String)>>;

/// `auth_token`, `refresh_token` and session cookies for a fresh login
pub fn login_cookies(config: &AuthConfig, credentials: &IssuedCredentials) -> SetCookies {
    AppendHeaders(vec![
        (
            header::SET_COOKIE,
            config
                .access_cookie(credentials.access_ttl)
                .build_set_cookie(&credentials.access_token),
        ),
        (
            header::SET_COOKIE,
            config
                .refresh_cookie()
                .build_set_cookie(&credentials.refresh_token),
        ),
        (
            header::SET_COOKIE,
            config
                .session_cookie()
                .build_set_cookie(&credentials.session_token),
        ),
    ])
}

pub fn refresh_cookies(config: &AuthConfig, output: &RefreshOutput) -> SetCookies {
    AppendHeaders(vec![
        (
            header::SET_COOKIE,
            config
                .access_cookie(output.access_ttl)
                .build_set_cookie(&output.access_token),
        ),
        (
            header::SET_COOKIE,
            config.refresh_cookie().build_set_cookie(&output.refresh_token),
        ),
    ])
}

pub fn session_cookie(config: &AuthConfig, session_token: &str) -> SetCookies {
    AppendHeaders(vec![(
        header::SET_COOKIE,
        config.session_cookie().build_set_cookie(session_token),
    )])
}

/// Clear every credential cookie with the attributes it was set with.
pub fn clear_cookies(config: &AuthConfig) -> SetCookies {
    AppendHeaders(
        [
            config.access_cookie(config.access_ttl),
            config.refresh_cookie(),
            config.session_cookie(),
        ]
        .iter()
        .map(|cookie| (header::SET_COOKIE, cookie.build_delete_cookie()))
        .collect(),
    )
}

pub fn session_token(headers: &HeaderMap, config: &AuthConfig) -> Option<String> {
    extract_cookie(headers, &config.session_cookie_name)
}

pub fn refresh_token(headers: &HeaderMap, config: &AuthConfig) -> Option<String> {
    extract_cookie(headers, &config.refresh_cookie_name)
}

/// Access token from the cookie, else from `Authorization: Bearer`
pub fn access_token(headers: &HeaderMap, config: &AuthConfig) -> Option<String> {
    extract_cookie(headers, &config.access_cookie_name).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_clear_cookies_cover_all_three() {
        let config = AuthConfig {
            cookie_domain: Some(".geoconsult.example".to_string()),
            ..AuthConfig::development()
        };

        let AppendHeaders(cookies) = clear_cookies(&config);
        let names: Vec<&str> = cookies
            .iter()
            .map(|(_, v)| v.split('=').next().unwrap_or_default())
            .collect();

        assert_eq!(names, ["auth_token", "refresh_token", "sid"]);
        for (_, cookie) in &cookies {
            assert!(cookie.contains("Max-Age=0"));
            assert!(cookie.contains("Domain=.geoconsult.example"));
            assert!(cookie.contains("Path=/"));
        }
    }

    #[test]
    fn test_access_token_prefers_cookie() {
        let config = AuthConfig::development();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(
            access_token(&headers, &config).as_deref(),
            Some("header-token")
        );

        headers.insert(header::COOKIE, HeaderValue::from_static("auth_token=cookie-token"));
        assert_eq!(
            access_token(&headers, &config).as_deref(),
            Some("cookie-token")
        );
    }
}
