//! A single cookie as the jar keeps it and as it is written to disk.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A cookie together with the scope it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    /// Domain without a leading dot, lowercased. Empty in files means "the site host".
    #[serde(default)]
    pub domain: String,
    /// Only sent to exactly `domain`, not to its subdomains.
    #[serde(default)]
    pub host_only: bool,
    /// Empty in files means "the site's default path".
    #[serde(default)]
    pub path: String,
    /// `None` for session cookies.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl StoredCookie {
    /// Builds a cookie from a `Set-Cookie` header value received from `url`.
    pub fn from_set_cookie(header: &str, url: &Url, now: DateTime<Utc>) -> Result<Self> {
        let raw = cookie::Cookie::parse(header).context("Failed to parse Set-Cookie header")?;

        // Max-Age takes precedence over Expires
        let expires = match raw.max_age() {
            Some(max_age) => Duration::try_seconds(max_age.whole_seconds())
                .and_then(|delta| now.checked_add_signed(delta)),
            None => raw
                .expires_datetime()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0)),
        };

        let mut cookie = StoredCookie {
            name: raw.name().to_string(),
            value: raw.value().to_string(),
            domain: raw.domain().map(normalize_domain).unwrap_or_default(),
            host_only: false,
            path: raw
                .path()
                .filter(|p| p.starts_with('/'))
                .unwrap_or_default()
                .to_string(),
            expires,
            secure: raw.secure().unwrap_or(false),
            http_only: raw.http_only().unwrap_or(false),
        };
        cookie.scope_to(url)?;
        Ok(cookie)
    }

    /// Fills in a missing domain or path from `url` and checks the domain
    /// against the url's host.
    pub fn scope_to(&mut self, url: &Url) -> Result<()> {
        let host = url
            .host_str()
            .with_context(|| format!("URL has no host: {}", url))?
            .to_ascii_lowercase();

        if self.domain.is_empty() {
            self.domain = host;
            self.host_only = true;
        } else {
            self.domain = normalize_domain(&self.domain);
            if self.domain == host {
                // An IP host has no subdomains to share the cookie with.
                self.host_only = self.host_only || is_ip_host(&host);
            } else if is_ip_host(&host) || !self.domain.contains('.') {
                bail!(
                    "Cookie '{}' cannot use domain '{}' from host '{}'",
                    self.name,
                    self.domain,
                    host
                );
            } else if !domain_matches(&host, &self.domain, false) {
                bail!(
                    "Cookie '{}' for domain '{}' cannot be set from host '{}'",
                    self.name,
                    self.domain,
                    host
                );
            }
        }

        if !self.path.starts_with('/') {
            self.path = default_path(url);
        }

        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Whether the cookie should be sent with a request to `url`.
    pub fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.secure && url.scheme() != "https" {
            return false;
        }
        !self.is_expired(now)
            && domain_matches(&host.to_ascii_lowercase(), &self.domain, self.host_only)
            && path_matches(url.path(), &self.path)
    }

    /// Two cookies with the same key replace each other in the jar.
    pub fn same_key(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_start_matches('.').to_ascii_lowercase()
}

fn is_ip_host(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
}

fn domain_matches(host: &str, domain: &str, host_only: bool) -> bool {
    if host == domain {
        return true;
    }
    !host_only
        && !is_ip_host(host)
        && host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    match request_path.strip_prefix(cookie_path) {
        Some(rest) => cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// The directory part of the url's path, as used for cookies without a Path attribute.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
