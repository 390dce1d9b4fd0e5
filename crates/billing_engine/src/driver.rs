use std::time::Duration;

use billing_logging::{billing_debug, billing_info};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

/// W3C identifier of an element reference in WebDriver payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Browser access needed by the pager: read the DOM, click an element.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Serialized DOM of the current document.
    async fn page_source(&self) -> Result<String, DriverError>;

    /// Clicks the `index`-th element (document order) matching `css`.
    async fn click_nth(&self, css: &str, index: usize) -> Result<(), DriverError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("invalid webdriver endpoint {0:?}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("webdriver request timed out")]
    Timeout,
    #[error("webdriver returned {status} {error}: {message}")]
    WebDriver {
        status: u16,
        error: String,
        message: String,
    },
    #[error("no element #{index} matches {selector:?}")]
    NoSuchElement { selector: String, index: usize },
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    /// Base URL of the WebDriver server, e.g. `http://localhost:4444`.
    pub endpoint: String,
    pub request_timeout: Duration,
    /// `alwaysMatch` capabilities for new sessions.
    pub capabilities: Value,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".to_string(),
            request_timeout: Duration::from_secs(30),
            capabilities: json!({ "browserName": "chrome" }),
        }
    }
}

/// A WebDriver session, either started by us or attached to by id.
///
/// Attaching lets the export run against a browser where the user is already
/// logged in.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
    session_id: String,
    owned: bool,
}

impl WebDriverSession {
    pub async fn start(settings: &WebDriverSettings) -> Result<Self, DriverError> {
        let base = normalize_endpoint(&settings.endpoint)?;
        let client = build_client(settings)?;
        let body = json!({
            "capabilities": { "alwaysMatch": settings.capabilities }
        });
        let value = send(&client, Method::POST, &format!("{base}/session"), Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("new session response has no sessionId".into()))?
            .to_string();
        billing_info!("Started webdriver session {}", session_id);
        Ok(Self {
            client,
            base,
            session_id,
            owned: true,
        })
    }

    pub fn attach(
        settings: &WebDriverSettings,
        session_id: impl Into<String>,
    ) -> Result<Self, DriverError> {
        let base = normalize_endpoint(&settings.endpoint)?;
        let client = build_client(settings)?;
        let session_id = session_id.into();
        billing_info!("Attached to webdriver session {}", session_id);
        Ok(Self {
            client,
            base,
            session_id,
            owned: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        billing_info!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    /// Ends the session if we started it; attached sessions are left open.
    pub async fn close(&self) -> Result<(), DriverError> {
        if !self.owned {
            return Ok(());
        }
        billing_info!("Deleting webdriver session {}", self.session_id);
        self.command(Method::DELETE, "", None).await.map(|_| ())
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        send(&self.client, method, &url, body).await
    }
}

#[async_trait::async_trait]
impl PageDriver for WebDriverSession {
    async fn page_source(&self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/source", None).await?;
        value
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| DriverError::Protocol("page source is not a string".into()))
    }

    async fn click_nth(&self, css: &str, index: usize) -> Result<(), DriverError> {
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        let element_id = found
            .as_array()
            .and_then(|elements| elements.get(index))
            .and_then(element_id)
            .ok_or_else(|| DriverError::NoSuchElement {
                selector: css.to_string(),
                index,
            })?
            .to_string();
        billing_debug!("Clicking {} #{} ({})", css, index, element_id);
        self.command(
            Method::POST,
            &format!("/element/{element_id}/click"),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }
}

fn element_id(reference: &Value) -> Option<&str> {
    reference
        .get(ELEMENT_KEY)
        .or_else(|| reference.get("ELEMENT"))
        .and_then(Value::as_str)
}

fn normalize_endpoint(endpoint: &str) -> Result<String, DriverError> {
    let parsed =
        Url::parse(endpoint).map_err(|_| DriverError::InvalidEndpoint(endpoint.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DriverError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn build_client(settings: &WebDriverSettings) -> Result<reqwest::Client, DriverError> {
    reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| DriverError::Network(err.to_string()))
}

/// Sends one WebDriver command and unwraps the `value` member of the reply.
async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, DriverError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
    }
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    let text = response.text().await.map_err(map_reqwest_error)?;

    let payload: Option<Value> = serde_json::from_str(&text).ok();
    let value = payload
        .as_ref()
        .and_then(|payload| payload.get("value"))
        .cloned();

    if !status.is_success() {
        let error = value
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let message = value
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .unwrap_or(text);
        return Err(DriverError::WebDriver {
            status: status.as_u16(),
            error,
            message,
        });
    }

    value.ok_or_else(|| DriverError::Protocol(format!("missing value member in {text:?}")))
}

fn map_reqwest_error(err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        return DriverError::Timeout;
    }
    DriverError::Network(err.to_string())
}
