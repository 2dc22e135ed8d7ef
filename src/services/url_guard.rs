//! URL 检查 - 业务能力层
//!
//! 与抓取服务相同的规则：只允许 HTTP(S)，拒绝回环、私有网段和本机主机名。
//! 在本地提前拒绝，不发出网络请求。

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

fn scheme_regex() -> &'static Regex {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    SCHEME.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").unwrap())
}

/// 规范化并检查外部 URL
///
/// # 参数
/// - `raw`: 用户输入的地址，缺少协议时补 `https://`
///
/// # 返回
/// 成功返回规范化后的 URL 字符串，失败返回可直接展示的原因
pub fn normalize_public_url(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let candidate = if scheme_regex().is_match(raw) {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "Only HTTP(S) URLs are allowed, got '{}'",
            url.scheme()
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| format!("URL '{}' has no host", raw))?;

    if is_private_host(host) {
        return Err(format!("Private or loopback host '{}' is not allowed", host));
    }

    Ok(url.to_string())
}

fn is_private_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let lower = host.to_ascii_lowercase();

    if lower == "localhost"
        || lower.ends_with(".localhost")
        || lower.ends_with(".local")
        || lower.ends_with(".internal")
    {
        return true;
    }

    match lower.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_private_v4(ip),
        Ok(IpAddr::V6(ip)) => is_private_v6(ip),
        Err(_) => false,
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 运营商级 NAT
        || (a == 100 && (64..128).contains(&b))
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7
        || (first & 0xfe00) == 0xfc00
        // fe80::/10
        || (first & 0xffc0) == 0xfe80
}
