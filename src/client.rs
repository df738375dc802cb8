//! HTTP client with a shared cookie jar and retry on transport failure.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::Level;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Body, Method, Request, Response, Url};

use crate::cookies::{CookieJar, load_cookies, save_cookies};
use crate::options::ClientOptions;
use crate::transport::{ReqwestTransport, Transport};

/// Preconfigured HTTP client.
///
/// Clones share the transport and the cookie jar.
#[derive(Clone)]
pub struct WebClient {
    transport: Arc<dyn Transport>,
    jar: Arc<CookieJar>,
    options: ClientOptions,
}

impl WebClient {
    /// Creates a client with [`ClientOptions::default`].
    pub fn new() -> Result<Self> {
        Self::with_options(ClientOptions::default())
    }

    /// Creates a client backed by `reqwest` and a fresh cookie jar.
    pub fn with_options(options: ClientOptions) -> Result<Self> {
        let jar = Arc::new(CookieJar::new());
        let transport = ReqwestTransport::new(&options, jar.clone())?;
        Ok(Self::with_transport(options, Arc::new(transport), jar))
    }

    /// Creates a client dispatching through `transport`.
    ///
    /// `jar` is what cookie export and import operate on; the transport is
    /// expected to use the same jar for its requests.
    pub fn with_transport(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        jar: Arc<CookieJar>,
    ) -> Self {
        Self {
            transport,
            jar,
            options,
        }
    }

    /// Returns the options this client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the cookie jar shared by every request of this client.
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>> {
        self.fetch("GET", url, headers, None).await
    }

    pub async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: impl Into<Body>,
    ) -> Result<Vec<u8>> {
        self.fetch("POST", url, headers, Some(body.into())).await
    }

    pub async fn custom_request(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<Vec<u8>> {
        self.fetch(method, url, headers, body).await
    }

    /// Sends a request and returns the whole response body.
    ///
    /// Headers with the same name are all sent. Transport failures are
    /// retried up to `max_tries` times with `retry_delay` between attempts;
    /// any status code counts as success. A streaming body can only be sent
    /// once, so its first failure is final.
    #[tracing::instrument(skip(self, headers, body))]
    pub async fn fetch(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<Vec<u8>> {
        let request = build_request(method, url, headers, body)?;

        self.log_fetch(
            Level::Info,
            format_args!("{} {}", request.method(), request.url()),
        );

        let response = self.dispatch(request).await?;
        self.log_fetch(Level::Info, format_args!("{}", response.status().as_u16()));

        let data = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;
        Ok(data.to_vec())
    }

    /// Saves the cookies the jar would send to `site` into `path`.
    #[tracing::instrument(skip(self))]
    pub fn export_cookies(&self, path: &Path, site: &str) -> Result<()> {
        let url = parse_url(site)?;
        save_cookies(path, &self.jar.cookies_for(&url))
    }

    /// Loads cookies from `path` into the jar, scoped to `site`.
    ///
    /// Nothing is installed unless every record is valid for `site`.
    #[tracing::instrument(skip(self))]
    pub fn import_cookies(&self, path: &Path, site: &str) -> Result<()> {
        let cookies = load_cookies(path)?;
        let url = parse_url(site)?;
        self.jar
            .install(&url, cookies)
            .with_context(|| format!("Failed to import cookies for {}", site))
    }

    /// Runs the attempt loop: one dispatch plus up to `max_tries` retries.
    async fn dispatch(&self, mut request: Request) -> Result<Response> {
        let max_tries = self.options.max_tries;
        let delay = self.options.retry_delay();
        let mut attempt = 0;

        loop {
            let replay = if attempt < max_tries {
                request.try_clone()
            } else {
                None
            };

            let err = match self.transport.execute(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if attempt >= max_tries {
                self.log_fetch(
                    Level::Warn,
                    format_args!("aborting fetch after {} attempts: {:#}", attempt + 1, err),
                );
                return Err(err);
            }

            let Some(next) = replay else {
                return Err(err.context("Request body cannot be replayed for a retry"));
            };

            self.log_fetch(
                Level::Warn,
                format_args!(
                    "attempt {}/{} failed ({:#}), retrying in {:?}...",
                    attempt + 1,
                    max_tries + 1,
                    err,
                    delay
                ),
            );
            tokio::time::sleep(delay).await;

            attempt += 1;
            request = next;
        }
    }

    fn log_fetch(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(self.fetch_log_level(level), "{}", args);
    }

    /// `level` when verbose, debug otherwise.
    fn fetch_log_level(&self, level: Level) -> Level {
        if self.options.verbose {
            level
        } else {
            Level::Debug
        }
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).with_context(|| format!("Invalid URL: {}", url))
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: Option<Body>,
) -> Result<Request> {
    let method = Method::from_bytes(method.as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))?;
    let mut request = Request::new(method, parse_url(url)?);

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name: {}", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {}", name))?;
        request.headers_mut().append(name, value);
    }

    *request.body_mut() = body;
    Ok(request)
}
