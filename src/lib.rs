//! Preconfigured HTTP client: a persistent cookie jar, connect and request
//! timeouts, retry on transport failure and optional verbose logging.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use webclient::{ClientOptions, WebClient};
//!
//! let client = WebClient::with_options(ClientOptions {
//!     max_tries: 3,
//!     verbose: true,
//!     ..Default::default()
//! })?;
//! let body = client.get("https://example.com/", &[("Accept", "text/html")]).await?;
//! client.export_cookies("cookies.json".as_ref(), "https://example.com/")?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cookies;
pub mod options;
pub mod transport;

pub use client::WebClient;
pub use cookies::{CookieJar, StoredCookie};
pub use options::ClientOptions;
pub use transport::{ReqwestTransport, Transport};
