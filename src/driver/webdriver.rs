//! Minimal W3C WebDriver client (chromedriver, geckodriver) over HTTP.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::{debug, info, warn};
use reqwest::{Client, Method};
use serde_json::{json, Value};

use super::{AutomationDriver, DriverError, DriverResult, Element, Locator};
use crate::settings::ProvisionerSettings;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const SHADOW_KEY: &str = "shadow-6066-11e4-a52e-4f735466cecf";

const REQUEST_TIMEOUT_SECS: u64 = 90;

pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    closed: AtomicBool,
}

fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::Id(id) => ("css selector", format!("[id=\"{id}\"]")),
        Locator::ClassName(class) => ("css selector", format!(".{class}")),
        Locator::XPath(path) => ("xpath", path.to_string()),
        Locator::Css(selector) => ("css selector", selector.to_string()),
        Locator::Shadow { host, .. } => ("css selector", host.to_string()),
    }
}

fn map_error(code: &str, message: &str) -> DriverError {
    match code {
        "no such element" | "no such shadow root" => DriverError::NoSuchElement(message.to_string()),
        "invalid session id" | "session not created" => DriverError::Session(message.to_string()),
        _ => DriverError::Protocol {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

fn element_from(value: &Value) -> DriverResult<Element> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| Element(id.to_string()))
        .ok_or_else(|| DriverError::Protocol {
            code: "invalid response".into(),
            message: format!("expected an element reference, got {value}"),
        })
}

fn option_xpath(label: &str) -> String {
    if label.contains('"') {
        format!("./option[normalize-space(.)='{label}']")
    } else {
        format!("./option[normalize-space(.)=\"{label}\"]")
    }
}

impl WebDriverSession {
    /// Starts a new browser session on the configured WebDriver server.
    pub async fn connect(settings: &ProvisionerSettings) -> DriverResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base_url = settings.webdriver_url.trim_end_matches('/').to_string();

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": settings.browser,
                    "acceptInsecureCerts": settings.accept_insecure_certs,
                    "timeouts": { "implicit": settings.timings.implicit_wait_ms },
                }
            }
        });

        let response = client
            .post(format!("{base_url}/session"))
            .json(&body)
            .send()
            .await?;
        let value = Self::unwrap_value(response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Session(format!("no sessionId in {value}")))?
            .to_string();

        info!("Started {} session {session_id} via {base_url}", settings.browser);

        Ok(Self {
            client,
            base_url,
            session_id,
            closed: AtomicBool::new(false),
        })
    }

    async fn unwrap_value(response: reqwest::Response) -> DriverResult<Value> {
        let status = response.status();
        let mut body: Value = response.json().await?;
        let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(value);
        }

        let code = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Err(map_error(code, message))
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Session("session already closed".into()));
        }

        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        debug!("{method} {url}");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Self::unwrap_value(request.send().await?).await
    }

    async fn find_from(&self, scope: &str, locator: &Locator) -> DriverResult<Element> {
        let (using, value) = strategy(locator);
        let found = self
            .command(
                Method::POST,
                &format!("{scope}/element"),
                Some(json!({ "using": using, "value": value })),
            )
            .await
            .map_err(|err| match err {
                DriverError::NoSuchElement(_) => DriverError::NoSuchElement(locator.to_string()),
                other => other,
            })?;
        element_from(&found)
    }

    async fn find_in_shadow(&self, host: &Element, inner: &str, locator: &Locator) -> DriverResult<Element> {
        let root = self
            .command(Method::GET, &format!("/element/{}/shadow", host.0), None)
            .await?;
        let root_id = root
            .get(SHADOW_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()))?;

        let found = self
            .command(
                Method::POST,
                &format!("/shadow/{root_id}/element"),
                Some(json!({ "using": "css selector", "value": inner })),
            )
            .await
            .map_err(|err| match err {
                DriverError::NoSuchElement(_) => DriverError::NoSuchElement(locator.to_string()),
                other => other,
            })?;
        element_from(&found)
    }
}

impl AutomationDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find(&self, locator: &Locator) -> DriverResult<Element> {
        let element = self.find_from("", locator).await?;
        match locator {
            Locator::Shadow { inner, .. } => self.find_in_shadow(&element, inner, locator).await,
            _ => Ok(element),
        }
    }

    async fn find_within(&self, parent: &Element, locator: &Locator) -> DriverResult<Element> {
        let element = self
            .find_from(&format!("/element/{}", parent.0), locator)
            .await?;
        match locator {
            Locator::Shadow { inner, .. } => self.find_in_shadow(&element, inner, locator).await,
            _ => Ok(element),
        }
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        self.command(Method::POST, &format!("/element/{}/click", element.0), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn clear(&self, element: &Element) -> DriverResult<()> {
        self.command(Method::POST, &format!("/element/{}/clear", element.0), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn send_keys(&self, element: &Element, text: &str) -> DriverResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn text(&self, element: &Element) -> DriverResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &Element, name: &str) -> DriverResult<Option<String>> {
        // Live DOM property first (an input's current value), then the markup attribute.
        for kind in ["property", "attribute"] {
            let value = self
                .command(Method::GET, &format!("/element/{}/{kind}/{name}", element.0), None)
                .await?;
            match value {
                Value::Null => continue,
                Value::String(text) => return Ok(Some(text)),
                other => return Ok(Some(other.to_string())),
            }
        }
        Ok(None)
    }

    async fn select_by_label(&self, select: &Element, label: &str) -> DriverResult<()> {
        let option = self
            .find_within(select, &Locator::xpath(option_xpath(label)))
            .await?;
        self.click(&option).await
    }

    async fn quit(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let url = format!("{}/session/{}", self.base_url, self.session_id);
        let response = self.client.delete(&url).send().await?;
        Self::unwrap_value(response).await?;
        info!("Browser session {} closed", self.session_id);
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            warn!(
                "Browser session {} dropped without quit; the browser stays open",
                self.session_id
            );
        }
    }
}
