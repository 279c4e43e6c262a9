//! Endpoint allowlisting for outbound HTTP.
//!
//! A URL is allowed when it starts with one of the configured prefixes at a
//! component boundary, so `https://webhook.site` admits
//! `https://webhook.site/abc` but not `https://webhook.site.evil.com`.

use crate::PolicyError;

/// Prefix allowlist for the `http_request` capability.
#[derive(Debug, Clone, Default)]
pub struct UrlAllowlist {
    prefixes: Vec<String>,
}

impl UrlAllowlist {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Check a URL against the allowlist.
    ///
    /// Rules:
    /// - Empty allowlist → deny all
    /// - An explicit prefix match → allow
    /// - `"*"` → allow anything that is not a private/internal address
    pub fn check(&self, url: &str) -> Result<(), PolicyError> {
        if self
            .prefixes
            .iter()
            .filter(|p| p.as_str() != "*")
            .any(|p| matches_prefix(url, p))
        {
            return Ok(());
        }

        if self.prefixes.iter().any(|p| p == "*") {
            if is_private_url(url) {
                return Err(PolicyError::UrlNotAllowed {
                    url: url.into(),
                    reason: "Request to private/internal IP blocked (SSRF prevention)".into(),
                });
            }
            return Ok(());
        }

        Err(PolicyError::UrlNotAllowed {
            url: url.into(),
            reason: format!("{} prefixes configured", self.prefixes.len()),
        })
    }
}

fn matches_prefix(url: &str, prefix: &str) -> bool {
    match url.strip_prefix(prefix) {
        Some(rest) => {
            prefix.ends_with('/')
                || rest.is_empty()
                || rest.starts_with(['/', '?', '#'])
                || rest.strip_prefix(':').is_some_and(is_port_suffix)
        }
        None => false,
    }
}

/// `8080`, `8080/path`, `8080?q`: digits, then the end of the authority.
/// Anything else after `:` is userinfo (`host:x@elsewhere`) and the real
/// host lies further on.
fn is_port_suffix(rest: &str) -> bool {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let port = &rest[..end];
    !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
}

/// Check if a URL targets a private/internal IP address.
fn is_private_url(url: &str) -> bool {
    let lower = url.to_lowercase();

    let host = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"))
        .unwrap_or(&lower);

    let host = host.split('/').next().unwrap_or(host);
    let host = host.rsplit('@').next().unwrap_or(host);
    if host.starts_with("[::1]") {
        return true;
    }
    let host = host.split(':').next().unwrap_or(host);

    let private_172 = host
        .strip_prefix("172.")
        .and_then(|rest| rest.split('.').next())
        .and_then(|octet| octet.parse::<u8>().ok())
        .is_some_and(|octet| (16..=31).contains(&octet));

    host == "localhost"
        || host.starts_with("127.")
        || host.starts_with("10.")
        || host.starts_with("192.168.")
        || private_172
        || host.starts_with("169.254.")
        || host == "0.0.0.0"
}
