//! `Caller` extractor: identifies who is submitting or polling a job.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use genhub_core::types::OwnerId;

/// Caller identity derived from proxy headers.
///
/// Uses the first `x-forwarded-for` entry, then `x-real-ip`. Requests
/// carrying neither are anonymous and never rate limited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Option<OwnerId>);

impl Caller {
    /// Resolve the caller from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next());
        let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());

        let owner = [forwarded, real_ip]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(OwnerId::new);
        Self(owner)
    }

    /// Owner identity, if any.
    pub fn owner(&self) -> Option<&OwnerId> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_first_forwarded_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.7, 172.16.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.1"));
        assert_eq!(Caller::from_headers(&headers), Caller(Some(OwnerId::new("10.0.0.7"))));
    }

    #[test]
    fn test_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" "));
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.1"));
        assert_eq!(
            Caller::from_headers(&headers),
            Caller(Some(OwnerId::new("192.168.1.1")))
        );
    }

    #[test]
    fn test_no_headers_is_anonymous() {
        assert_eq!(Caller::from_headers(&HeaderMap::new()), Caller(None));
    }
}
