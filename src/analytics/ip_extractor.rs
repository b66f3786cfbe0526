//! Client IP extraction from HTTP headers
//!
//! Behind a reverse proxy the socket peer is the proxy itself, so the
//! original client is taken from forwarding headers according to the
//! configured [`TrustedProxyMode`]. Falls back to the socket address.

use axum::http::HeaderMap;
use std::net::IpAddr;
use tracing::debug;

use crate::config::TrustedProxyMode;

/// Extract the client IP address for a request
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr, mode: TrustedProxyMode) -> IpAddr {
    match mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            debug!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => extract_from_x_forwarded_for(headers)
            .or_else(|| extract_from_forwarded(headers))
            .unwrap_or(socket_addr),
        TrustedProxyMode::None => socket_addr,
    }
}

fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(parse_ip_token)
}

/// First entry of the X-Forwarded-For chain, the original client
fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;
    xff.split(',').next().and_then(parse_ip_token)
}

/// `for=` parameter of the first RFC 7239 Forwarded element
fn extract_from_forwarded(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers.get("forwarded")?.to_str().ok()?;
    let first = forwarded.split(',').next()?;

    first.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if key.eq_ignore_ascii_case("for") {
            parse_ip_token(value)
        } else {
            None
        }
    })
}

/// Parse one address token, tolerating quotes, brackets and ports:
/// `203.0.113.7`, `203.0.113.7:4711`, `"[2001:db8::1]:4711"`, `2001:db8::1`
fn parse_ip_token(token: &str) -> Option<IpAddr> {
    let token = token.trim().trim_matches('"');

    if let Ok(ip) = token.parse::<IpAddr>() {
        return Some(ip);
    }

    if let Some(rest) = token.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }

    let (host, _port) = token.rsplit_once(':')?;
    host.parse().ok()
}
