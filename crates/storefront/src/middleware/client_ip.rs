//! Client IP extraction.
//!
//! Behind a CDN or load balancer the socket address is the proxy's, so the
//! forwarding headers are checked first.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

/// Headers checked for the client address, most trusted first.
const IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// The visitor's IP address, if one could be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_socket = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(ip_from_headers(&parts.headers).or(from_socket)))
    }
}

/// First parseable address from the forwarding headers.
///
/// `x-forwarded-for` lists every hop; the first entry is the client.
fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_cloudflare_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.1.1.1"));
        headers.insert("cf-connecting-ip", HeaderValue::from_static("102.89.3.4"));

        assert_eq!(ip_from_headers(&headers), Some("102.89.3.4".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_uses_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("41.66.1.2, 172.16.0.1, 10.0.0.1"),
        );
        assert_eq!(ip_from_headers(&headers), Some("41.66.1.2".parse().unwrap()));
    }

    #[test]
    fn test_garbage_falls_through_to_next_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        headers.insert("fly-client-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(ip_from_headers(&headers), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(ip_from_headers(&HeaderMap::new()), None);
    }
}
