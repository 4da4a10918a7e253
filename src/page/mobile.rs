use crate::core::{Driver, Locator, WaitConfig};
use crate::errors::{BrowserError, ErrorKind, Result};
use crate::page::{Page, PageState};
use crate::types::ScriptArg;
use crate::wait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const NATIVE_CONTEXT: &str = "NATIVE_APP";

/// Marker found in every webview context id. Drivers append a
/// session-specific suffix, so ids are matched by substring.
pub const WEBVIEW_MARKER: &str = "WEBVIEW";

/// Execution context a mobile page must be addressed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    Native,
    Webview,
    Named(String),
}

impl Context {
    /// The concrete context id among `available`, if any.
    pub fn resolve(&self, available: &[String]) -> Option<String> {
        match self {
            Context::Native => available.iter().find(|c| *c == NATIVE_CONTEXT).cloned(),
            Context::Webview => available.iter().find(|c| c.contains(WEBVIEW_MARKER)).cloned(),
            Context::Named(name) => available.iter().find(|c| *c == name).cloned(),
        }
    }

    pub fn matches(&self, context: &str) -> bool {
        match self {
            Context::Native => context == NATIVE_CONTEXT,
            Context::Webview => context.contains(WEBVIEW_MARKER),
            Context::Named(name) => context == name,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Native => f.write_str(NATIVE_CONTEXT),
            Context::Webview => f.write_str(WEBVIEW_MARKER),
            Context::Named(name) => f.write_str(name),
        }
    }
}

/// A screen of a mobile app, confirmed in its required context.
pub struct MobilePage {
    driver: Arc<dyn Driver>,
    unique_locator: Locator,
    required_context: Context,
    wait: WaitConfig,
    state: PageState,
}

impl MobilePage {
    pub async fn open(
        driver: Arc<dyn Driver>,
        unique_locator: Locator,
        required_context: Context,
    ) -> Result<Self> {
        Self::open_with(driver, unique_locator, required_context, WaitConfig::default()).await
    }

    /// Switch into the required context, then confirm the page.
    pub async fn open_with(
        driver: Arc<dyn Driver>,
        unique_locator: Locator,
        required_context: Context,
        wait: WaitConfig,
    ) -> Result<Self> {
        let mut page = Self {
            driver,
            unique_locator,
            required_context,
            wait,
            state: PageState::Unconfirmed,
        };
        page.switch_to_required_context().await?;

        if page.is_current_page().await? {
            page.state = PageState::Confirmed;
            return Ok(page);
        }
        page.state = PageState::Rejected;
        Err(BrowserError::PageMismatch {
            expected: page.unique_locator.to_string(),
            actual: format!("context {}", page.driver.current_context().await?),
        })
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn required_context(&self) -> &Context {
        &self.required_context
    }

    /// Available contexts. Listing right after a context change can fail
    /// transiently, so driver errors are retried until the wait runs out.
    pub async fn contexts(&self) -> Result<Vec<String>> {
        let driver = self.driver.as_ref();
        wait::wait_until_ok(self.wait, "list contexts", ErrorKind::External, || {
            driver.contexts()
        })
        .await
    }

    pub async fn context(&self) -> Result<String> {
        self.driver.current_context().await
    }

    pub async fn webview_id(&self) -> Result<String> {
        let available = self.contexts().await?;
        Context::Webview
            .resolve(&available)
            .ok_or(BrowserError::NoWebview { available })
    }

    pub async fn switch_to_required_context(&self) -> Result<()> {
        let current = self.context().await?;
        if self.required_context.matches(&current) {
            return Ok(());
        }

        let available = self.contexts().await?;
        let target = self.required_context.resolve(&available).ok_or_else(|| {
            BrowserError::ContextUnavailable {
                required: self.required_context.to_string(),
                available: available.clone(),
            }
        })?;
        debug!(from = %current, to = %target, "switching context");
        self.driver.switch_to_context(&target).await
    }

    pub async fn scroll_up(&self) -> Result<()> {
        self.scroll("up").await
    }

    pub async fn scroll_down(&self) -> Result<()> {
        self.scroll("down").await
    }

    /// Platform scroll gesture. Only `up` and `down` are accepted.
    pub async fn scroll(&self, direction: &str) -> Result<()> {
        if direction != "up" && direction != "down" {
            return Err(BrowserError::InvalidDirection(direction.to_string()));
        }
        self.driver
            .execute_script(
                "mobile: scroll",
                vec![ScriptArg::Value(json!({ "direction": direction }))],
            )
            .await
            .map(|_| ())
    }
}

impl Page for MobilePage {
    fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    fn unique_locator(&self) -> &Locator {
        &self.unique_locator
    }

    fn wait_config(&self) -> WaitConfig {
        self.wait
    }
}

impl fmt::Debug for MobilePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MobilePage")
            .field("unique_locator", &self.unique_locator)
            .field("required_context", &self.required_context)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDriver, MockElement};
    use std::time::Duration;

    const WEBVIEW: &str = "WEBVIEW_com.example.shop.1234";

    fn short_wait() -> WaitConfig {
        WaitConfig::default().with_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_open_switches_into_webview_before_probing() {
        let mock = Arc::new(MockDriver::new());
        mock.set_contexts(&[NATIVE_CONTEXT, WEBVIEW], NATIVE_CONTEXT);
        let locator = Locator::css("#checkout").unwrap();
        mock.add_element(&locator, MockElement::new("div"));

        let page =
            MobilePage::open_with(mock.clone(), locator.clone(), Context::Webview, short_wait())
                .await
                .unwrap();
        assert_eq!(page.state(), PageState::Confirmed);
        assert_eq!(page.context().await.unwrap(), WEBVIEW);

        let calls = mock.calls();
        let switch = calls
            .iter()
            .position(|c| *c == format!("switch_to_context {}", WEBVIEW))
            .unwrap();
        let probe = calls
            .iter()
            .position(|c| *c == format!("find_element {}", locator))
            .unwrap();
        assert!(switch < probe);
    }

    #[tokio::test]
    async fn test_open_in_matching_context_does_not_switch() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::accessibility_id("home").unwrap();
        mock.add_element(&locator, MockElement::new("XCUIElementTypeOther"));

        MobilePage::open_with(mock.clone(), locator, Context::Native, short_wait())
            .await
            .unwrap();
        assert_eq!(mock.call_count("switch_to_context"), 0);
    }

    #[tokio::test]
    async fn test_unavailable_context_is_a_configuration_error() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::accessibility_id("home").unwrap();
        mock.add_element(&locator, MockElement::new("XCUIElementTypeOther"));

        match MobilePage::open_with(mock.clone(), locator, Context::Webview, short_wait()).await {
            Err(BrowserError::ContextUnavailable {
                required,
                available,
            }) => {
                assert_eq!(required, WEBVIEW_MARKER);
                assert_eq!(available, vec![NATIVE_CONTEXT.to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_raises_mismatch_when_probe_fails() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::accessibility_id("never").unwrap();
        assert!(matches!(
            MobilePage::open_with(mock.clone(), locator, Context::Native, short_wait()).await,
            Err(BrowserError::PageMismatch { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contexts_retry_through_transient_driver_errors() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::accessibility_id("home").unwrap();
        mock.add_element(&locator, MockElement::new("XCUIElementTypeOther"));
        let page = MobilePage::open_with(mock.clone(), locator, Context::Native, short_wait())
            .await
            .unwrap();

        mock.set_contexts(&[NATIVE_CONTEXT, WEBVIEW], NATIVE_CONTEXT);
        mock.fail_contexts(2);
        assert_eq!(page.contexts().await.unwrap().len(), 2);
        assert_eq!(page.webview_id().await.unwrap(), WEBVIEW);

        mock.set_contexts(&[NATIVE_CONTEXT], NATIVE_CONTEXT);
        assert!(matches!(
            page.webview_id().await,
            Err(BrowserError::NoWebview { .. })
        ));
    }

    #[tokio::test]
    async fn test_scroll_accepts_only_up_and_down() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::accessibility_id("feed").unwrap();
        mock.add_element(&locator, MockElement::new("XCUIElementTypeTable"));
        let page = MobilePage::open_with(mock.clone(), locator, Context::Native, short_wait())
            .await
            .unwrap();

        page.scroll_up().await.unwrap();
        page.scroll_down().await.unwrap();
        let scripts = mock.scripts();
        assert_eq!(scripts[0].0, "mobile: scroll");
        assert_eq!(
            scripts[1].1,
            vec![ScriptArg::Value(json!({ "direction": "down" }))]
        );

        assert!(matches!(
            page.scroll("left").await,
            Err(BrowserError::InvalidDirection(direction)) if direction == "left"
        ));
        assert_eq!(mock.scripts().len(), 2);
    }
}
