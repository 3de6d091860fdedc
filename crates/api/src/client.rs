//! Client attributes probed by the request filters.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, header};

use warden_auth::ClientInfo;

/// Proxy headers consulted, in order, when proxy headers are trusted.
const PROXY_HEADERS: [&str; 5] = [
    "client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Collect the client IP and user agent of `req`.
pub fn client_info<B>(req: &Request<B>, trust_proxy_headers: bool) -> ClientInfo {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    ClientInfo::new(
        client_ip(req.headers(), peer, trust_proxy_headers),
        user_agent(req.headers()),
    )
}

/// Resolve the client IP, or an empty string when none can be observed.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let forwarded = PROXY_HEADERS.iter().find_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            forwarded_ip(name, value)
        });

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|ip| ip.to_string()).unwrap_or_default()
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Parse the client address out of one proxy header value.
fn forwarded_ip(name: &str, value: &str) -> Option<IpAddr> {
    // Comma-separated hop lists carry the originating client first.
    let first = value.split(',').next()?.trim();

    let candidate = if name == "forwarded" {
        first
            .split(';')
            .map(str::trim)
            .find_map(|pair| {
                let (key, val) = pair.split_once('=')?;
                key.eq_ignore_ascii_case("for").then_some(val)
            })?
            .trim_matches('"')
    } else {
        first
    };

    parse_ip(candidate)
}

/// Accept bare addresses plus the bracketed and port-suffixed forms proxies emit.
fn parse_ip(raw: &str) -> Option<IpAddr> {
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Some(ip);
    }

    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr.ip());
    }

    raw.strip_prefix('[')
        .and_then(|rest| rest.split(']').next())
        .and_then(|inner| inner.parse().ok())
}
