//! Cookie jar shared by every request of a client.
//!
//! # Structure
//!
//! - `record` - A stored cookie and the domain/path/expiry matching rules
//! - `file` - Saving and loading cookies as JSON files

mod file;
mod record;

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use log::debug;
use reqwest::Url;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;

pub use file::{load_cookies, save_cookies};
pub use record::StoredCookie;

/// In-memory cookie store.
///
/// Plugged into the transport as its cookie provider, so `Set-Cookie`
/// headers are recorded and `Cookie` headers are attached automatically.
///
/// There is no public suffix list: a `Domain` attribute is accepted when it
/// has at least two labels and the request host is within it, so
/// `Domain=co.uk` from `shop.co.uk` is stored. Single-label domains and any
/// `Domain` on an IP host other than the host itself are rejected.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live cookies that would be sent with a request to `url`, longest path first.
    pub fn cookies_for(&self, url: &Url) -> Vec<StoredCookie> {
        let now = Utc::now();
        let mut cookies = self.lock();
        cookies.retain(|c| !c.is_expired(now));

        let mut matching: Vec<StoredCookie> = cookies
            .iter()
            .filter(|c| c.matches(url, now))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    /// Installs `cookies` as if `url` had set them.
    ///
    /// Every record is scoped and checked before the jar is touched, so a
    /// single bad record leaves the jar unchanged.
    pub fn install(&self, url: &Url, cookies: Vec<StoredCookie>) -> Result<()> {
        let scoped = cookies
            .into_iter()
            .map(|mut cookie| {
                // Host-only cookies belong to whichever host they are installed for.
                if cookie.host_only {
                    cookie.domain.clear();
                }
                cookie.scope_to(url)?;
                Ok(cookie)
            })
            .collect::<Result<Vec<_>>>()?;

        let now = Utc::now();
        let mut jar = self.lock();
        for cookie in scoped {
            store(&mut jar, cookie, now);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredCookie>> {
        // Every mutation leaves the Vec valid, so poisoning is ignored.
        self.cookies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Replaces any cookie with the same key; an expired cookie only removes.
fn store(jar: &mut Vec<StoredCookie>, cookie: StoredCookie, now: chrono::DateTime<Utc>) {
    jar.retain(|existing| !existing.same_key(&cookie));
    if !cookie.is_expired(now) {
        jar.push(cookie);
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = Utc::now();
        let mut jar = self.lock();
        for header in cookie_headers {
            let parsed = header
                .to_str()
                .map_err(anyhow::Error::from)
                .and_then(|value| StoredCookie::from_set_cookie(value, url, now));
            match parsed {
                Ok(cookie) => {
                    debug!("Storing cookie '{}' for {}", cookie.name, cookie.domain);
                    store(&mut jar, cookie, now);
                }
                Err(e) => debug!("Ignoring cookie from {}: {:#}", url, e),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .cookies_for(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}
