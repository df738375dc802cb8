//! The network layer a [`WebClient`](crate::WebClient) dispatches through.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Request, Response};

use crate::cookies::CookieJar;
use crate::options::ClientOptions;

/// Sends one request and returns the response head with an unread body.
///
/// Errors are connection-level failures (DNS, refused, TLS, timeout). An
/// HTTP error status is still a successful response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client with the timeouts from `options` and `jar` as its cookie store.
    #[tracing::instrument(skip(jar))]
    pub fn new(options: &ClientOptions, jar: Arc<CookieJar>) -> Result<Self> {
        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout())
            .user_agent(concat!("webclient/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        // No context added: callers downcast to reqwest::Error.
        Ok(self.client.execute(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    #[test]
    fn test_build_with_default_options() {
        let transport = ReqwestTransport::new(&ClientOptions::default(), Arc::new(CookieJar::new()));
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_execute_passes_error_status_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not here")
            .create_async()
            .await;

        let transport =
            ReqwestTransport::new(&ClientOptions::default(), Arc::new(CookieJar::new())).unwrap();
        let url = Url::parse(&format!("{}/missing", server.url())).unwrap();
        let response = transport
            .execute(Request::new(Method::GET, url))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_execute_connection_refused_is_reqwest_error() {
        // Bind then drop a listener to get a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let transport =
            ReqwestTransport::new(&ClientOptions::default(), Arc::new(CookieJar::new())).unwrap();
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let err = transport
            .execute(Request::new(Method::GET, url))
            .await
            .unwrap_err();

        let reqwest_err = err.downcast_ref::<reqwest::Error>().unwrap();
        assert!(reqwest_err.is_connect());
    }

    #[tokio::test]
    async fn test_user_agent_is_set() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header(
                "user-agent",
                mockito::Matcher::Regex("^webclient/".to_string()),
            )
            .create_async()
            .await;

        let transport =
            ReqwestTransport::new(&ClientOptions::default(), Arc::new(CookieJar::new())).unwrap();
        let url = Url::parse(&server.url()).unwrap();
        transport
            .execute(Request::new(Method::GET, url))
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
