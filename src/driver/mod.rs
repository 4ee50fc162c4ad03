//! The browser-automation capabilities the provisioning run needs, and a
//! W3C WebDriver implementation of them.

pub mod webdriver;

use std::{borrow::Cow, fmt, time::Duration};

use thiserror::Error;
use tokio::time::{sleep, Instant};

pub use webdriver::WebDriverSession;

/// Poll interval for [`AutomationDriver::wait_for`].
const WAIT_POLL: Duration = Duration::from_millis(250);

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no element matches {0}")]
    NoSuchElement(String),
    #[error("timed out after {}ms waiting for {what}", .timeout.as_millis())]
    Timeout { what: String, timeout: Duration },
    #[error("webdriver session error: {0}")]
    Session(String),
    #[error("webdriver transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webdriver returned '{code}': {message}")]
    Protocol { code: String, message: String },
}

impl DriverError {
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, DriverError::NoSuchElement(_))
    }

    /// Missing element or a wait that ran out: the page simply does not show it.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            DriverError::NoSuchElement(_) | DriverError::Timeout { .. }
        )
    }
}

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(Cow<'static, str>),
    ClassName(Cow<'static, str>),
    XPath(Cow<'static, str>),
    Css(Cow<'static, str>),
    /// `inner` (CSS) looked up inside the shadow root of the first `host` (CSS) match.
    Shadow {
        host: Cow<'static, str>,
        inner: Cow<'static, str>,
    },
}

impl Locator {
    pub fn xpath(path: impl Into<Cow<'static, str>>) -> Self {
        Locator::XPath(path.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={id}"),
            Locator::ClassName(class) => write!(f, "class={class}"),
            Locator::XPath(path) => write!(f, "xpath={path}"),
            Locator::Css(selector) => write!(f, "css={selector}"),
            Locator::Shadow { host, inner } => write!(f, "shadow={host} >> {inner}"),
        }
    }
}

/// Opaque reference to an element in the live page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

#[allow(async_fn_in_trait)]
pub trait AutomationDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    async fn find(&self, locator: &Locator) -> DriverResult<Element>;

    /// Lookup relative to `parent`, e.g. an XPath sibling axis.
    async fn find_within(&self, parent: &Element, locator: &Locator) -> DriverResult<Element>;

    async fn click(&self, element: &Element) -> DriverResult<()>;

    async fn clear(&self, element: &Element) -> DriverResult<()>;

    async fn send_keys(&self, element: &Element, text: &str) -> DriverResult<()>;

    async fn text(&self, element: &Element) -> DriverResult<String>;

    async fn attribute(&self, element: &Element, name: &str) -> DriverResult<Option<String>>;

    /// Picks the `<option>` of a `<select>` whose visible text equals `label`.
    async fn select_by_label(&self, select: &Element, label: &str) -> DriverResult<()>;

    /// Releases the browser session. Calling it again is a no-op.
    async fn quit(&self) -> DriverResult<()>;

    /// Polls until `locator` matches, failing with [`DriverError::Timeout`] after `timeout`.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> DriverResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(element) => return Ok(element),
                Err(err) if err.is_no_such_element() => {}
                Err(err) => return Err(err),
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: locator.to_string(),
                    timeout,
                });
            }
            sleep(WAIT_POLL.min(timeout)).await;
        }
    }

    /// Polls the text of `locator` every `poll` until it differs from `busy`.
    ///
    /// Returns `Ok(false)` when `timeout` elapses first. A missing element no longer
    /// shows `busy`, so it counts as done.
    async fn wait_while_text(
        &self,
        locator: &Locator,
        busy: &str,
        timeout: Duration,
        poll: Duration,
    ) -> DriverResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(element) => {
                    if self.text(&element).await?.trim() != busy {
                        return Ok(true);
                    }
                }
                Err(err) if err.is_no_such_element() => return Ok(true),
                Err(err) => return Err(err),
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(poll).await;
        }
    }
}
