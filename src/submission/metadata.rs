use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;

/// Client address for rate limiting. `X-Forwarded-For` is only honoured when
/// the direct peer is a trusted proxy.
pub fn client_ip(headers: &HeaderMap, peer_addr: Option<IpAddr>, trusted_proxies: &[IpNet]) -> IpAddr {
    let peer = peer_addr.unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if !trusted_proxies.is_empty() && trusted_proxies.iter().any(|net| net.contains(&peer)) {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            // First (leftmost) address that isn't one of our proxies
            for ip_str in xff.split(',').map(|s| s.trim()) {
                if let Ok(ip) = ip_str.parse::<IpAddr>() {
                    if !trusted_proxies.iter().any(|net| net.contains(&ip)) {
                        return ip;
                    }
                }
            }
        }
    }

    peer
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn xff(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn forwarded_header_ignored_from_untrusted_peer() {
        let peer: IpAddr = "203.0.113.9".parse().unwrap();
        let ip = client_ip(&xff("198.51.100.1"), Some(peer), &[]);
        assert_eq!(ip, peer);
    }

    #[test]
    fn forwarded_header_used_behind_trusted_proxy() {
        let proxies: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap()];
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let ip = client_ip(&xff("198.51.100.1, 10.0.0.3"), Some(peer), &proxies);
        assert_eq!(ip, "198.51.100.1".parse::<IpAddr>().unwrap());
    }
}
