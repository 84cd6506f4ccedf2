//! Client identification utilities

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Resolve the address a request should be attributed to
///
/// The socket peer is authoritative. Forwarding headers are read only when
/// that peer is one of `trusted_proxies`; then `X-Forwarded-For` is walked
/// from the right and the first hop that is not itself a trusted proxy wins,
/// with `X-Real-IP` as the fallback. Left-most entries are client-supplied
/// and never consulted on their own.
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    let peer = direct_ip?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    let forwarded = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .rev()
        .map_while(|hop| hop.parse::<IpAddr>().ok())
        .find(|ip| !trusted_proxies.contains(ip));

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
            .filter(|ip| !trusted_proxies.contains(ip))
    };

    forwarded.or_else(real_ip).or(Some(peer))
}

/// Rate-limit key for a client. Unknown clients share one bucket.
pub fn client_key(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
