use crate::core::{Config, Driver, Locator, WaitConfig};
use crate::errors::{BrowserError, Result};
use crate::page::{Page, PageState};
use crate::types::WindowHandle;
use crate::wait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A browser page reached at `base_url` + `path`.
///
/// Concrete pages usually wrap one of these and add their elements:
///
/// ```ignore
/// struct LoginPage { page: WebPage }
///
/// impl LoginPage {
///     async fn open(driver: Arc<dyn Driver>, base_url: &str) -> Result<Self> {
///         let page = WebPage::new(driver, base_url, "/login", Locator::css("form#login")?);
///         Ok(Self { page: page.go().await? })
///     }
/// }
/// ```
pub struct WebPage {
    driver: Arc<dyn Driver>,
    base_url: String,
    path: String,
    unique_locator: Locator,
    wait: WaitConfig,
    state: PageState,
}

impl WebPage {
    pub fn new(
        driver: Arc<dyn Driver>,
        base_url: impl Into<String>,
        path: impl Into<String>,
        unique_locator: Locator,
    ) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            path: path.into(),
            unique_locator,
            wait: WaitConfig::default(),
            state: PageState::Unconfirmed,
        }
    }

    /// Build from a [`Config`]; its `base_url` is required here.
    pub fn from_config(
        driver: Arc<dyn Driver>,
        config: &Config,
        path: impl Into<String>,
        unique_locator: Locator,
    ) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            BrowserError::ConfigurationError("base_url is required for web pages".to_string())
        })?;
        Ok(Self::new(driver, base_url, path, unique_locator).with_wait(config.wait))
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Navigate to [`WebPage::url`] and confirm the page arrived.
    pub async fn go(self) -> Result<Self> {
        let url = self.url();
        info!(%url, "navigating");
        self.driver.navigate(&url).await?;
        self.settle(url).await
    }

    /// Confirm the page without navigating, for pages reached by clicking
    /// through from another one.
    pub async fn arrive(self) -> Result<Self> {
        let expected = self.url();
        self.settle(expected).await
    }

    async fn settle(mut self, expected: String) -> Result<Self> {
        if self.is_current_page().await? {
            self.state = PageState::Confirmed;
            debug!(url = %expected, "page confirmed");
            return Ok(self);
        }

        self.state = PageState::Rejected;
        Err(BrowserError::PageMismatch {
            expected,
            actual: self.driver.current_url().await?,
        })
    }

    pub async fn title(&self) -> Result<String> {
        self.driver.title().await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.driver.current_url().await
    }

    pub async fn back(&self) -> Result<()> {
        self.driver.back().await
    }

    pub async fn forward(&self) -> Result<()> {
        self.driver.forward().await
    }

    /// Close the current window.
    pub async fn close(&self) -> Result<()> {
        self.driver.close_window().await
    }

    /// Reload and wait for the old document to go stale.
    ///
    /// The root element is captured before the reload is issued; waiting on
    /// a handle taken afterwards would never see it go stale.
    pub async fn refresh(&self, timeout: Option<Duration>) -> Result<()> {
        let wait = timeout.map_or(self.wait, |timeout| self.wait.with_timeout(timeout));
        let root_locator = Locator::css("html")?;
        let root = wait::until_present(self.driver.as_ref(), &root_locator, wait).await?;

        self.driver.refresh().await?;
        wait::until_stale(self.driver.as_ref(), &root, wait).await
    }

    pub async fn scroll_to_top(&self) -> Result<()> {
        self.run_script("window.scrollTo(0, 0);").await
    }

    pub async fn scroll_to_bottom(&self) -> Result<()> {
        self.run_script("window.scrollTo(0, document.body.scrollHeight);")
            .await
    }

    pub async fn scroll_to_center(&self) -> Result<()> {
        self.run_script("window.scrollTo(0, document.body.scrollHeight/2);")
            .await
    }

    async fn run_script(&self, script: &str) -> Result<()> {
        self.driver.execute_script(script, vec![]).await.map(|_| ())
    }

    pub async fn open_windows(&self) -> Result<Vec<WindowHandle>> {
        self.driver.window_handles().await
    }

    pub async fn switch_to_newest_window(&self) -> Result<WindowHandle> {
        let handles = self.driver.window_handles().await?;
        let newest = handles
            .last()
            .cloned()
            .ok_or(BrowserError::NoActiveWindow)?;
        self.driver.switch_to_window(&newest).await?;
        Ok(newest)
    }

    pub async fn switch_to_oldest_window(&self) -> Result<WindowHandle> {
        let handles = self.driver.window_handles().await?;
        let oldest = handles
            .first()
            .cloned()
            .ok_or(BrowserError::NoActiveWindow)?;
        self.driver.switch_to_window(&oldest).await?;
        Ok(oldest)
    }

    pub async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        self.driver.switch_to_window(handle).await
    }
}

impl Page for WebPage {
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

impl fmt::Debug for WebPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebPage")
            .field("url", &self.url())
            .field("unique_locator", &self.unique_locator)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, ElementOptions};
    use crate::testing::{MockDriver, MockElement};
    use tokio::time::Instant;

    const BASE: &str = "https://shop.test";

    fn page(mock: &Arc<MockDriver>, locator: &Locator) -> WebPage {
        WebPage::new(mock.clone(), BASE, "/cart", locator.clone())
            .with_wait(WaitConfig::default().with_timeout(Duration::from_secs(3)))
    }

    #[tokio::test]
    async fn test_go_navigates_and_confirms() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::css("#cart").unwrap();
        mock.add_element(&locator, MockElement::new("section"));

        let cart = page(&mock, &locator).go().await.unwrap();
        assert_eq!(cart.url(), "https://shop.test/cart");
        assert_eq!(cart.state(), PageState::Confirmed);
        assert_eq!(mock.calls()[0], "navigate https://shop.test/cart");
        assert!(cart.is_current_page().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_go_raises_mismatch_with_expected_and_actual() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::css("#cart").unwrap();

        let start = Instant::now();
        match page(&mock, &locator).go().await {
            Err(BrowserError::PageMismatch { expected, actual }) => {
                assert_eq!(expected, "https://shop.test/cart");
                assert_eq!(actual, "https://shop.test/cart");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_query_answers_false_on_timeout() {
        let mock = Arc::new(MockDriver::new());
        let cart = page(&mock, &Locator::css("#cart").unwrap());
        assert!(!cart.is_current_page().await.unwrap());
        assert!(matches!(
            cart.confirm().await,
            Err(BrowserError::PageMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_captures_root_before_reloading() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::css("#cart").unwrap();
        mock.add_element(&locator, MockElement::new("section"));
        mock.strict_staleness();
        let cart = page(&mock, &locator).go().await.unwrap();
        mock.clear_calls();

        cart.refresh(None).await.unwrap();
        let calls = mock.calls();
        let position = |call: &str| calls.iter().position(|c| c == call).unwrap();
        let capture = position("find_element (css selector, html)");
        let reload = position("refresh");
        let stale = position("is_stale");
        assert!(capture < reload && reload < stale, "{:?}", calls);
    }

    #[tokio::test]
    async fn test_scrolls_are_plain_scripts() {
        let mock = Arc::new(MockDriver::new());
        let cart = page(&mock, &Locator::css("#cart").unwrap());
        cart.scroll_to_top().await.unwrap();
        cart.scroll_to_bottom().await.unwrap();
        cart.scroll_to_center().await.unwrap();

        let scripts: Vec<String> = mock.scripts().into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            scripts,
            vec![
                "window.scrollTo(0, 0);",
                "window.scrollTo(0, document.body.scrollHeight);",
                "window.scrollTo(0, document.body.scrollHeight/2);",
            ]
        );
    }

    #[tokio::test]
    async fn test_window_pass_throughs() {
        let mock = Arc::new(MockDriver::new());
        mock.open_window("window-1");
        let cart = page(&mock, &Locator::css("#cart").unwrap());

        assert_eq!(cart.open_windows().await.unwrap().len(), 2);
        assert_eq!(
            cart.switch_to_newest_window().await.unwrap(),
            WindowHandle::new("window-1")
        );
        assert_eq!(
            cart.switch_to_oldest_window().await.unwrap(),
            WindowHandle::new("window-0")
        );
    }

    #[tokio::test]
    async fn test_element_tree_requires_exactly_one_node() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::css("#cart").unwrap();
        mock.add_element(&locator, MockElement::new("section"));
        let cart = page(&mock, &locator);

        let paragraph = Locator::css("p").unwrap();
        mock.add_element(&paragraph, MockElement::new("p"));
        let element = Element::find(
            mock.clone(),
            ElementOptions::new(paragraph.clone()).with_tree_locator(paragraph),
        )
        .await
        .unwrap();

        mock.set_page_source("<html><body><p>Alpha</p><p>Beta</p></body></html>");
        match cart.get_element_tree(&element).await {
            Err(BrowserError::AmbiguousMatch { count, .. }) => assert_eq!(count, 2),
            other => panic!("unexpected result: {:?}", other),
        }

        mock.set_page_source("<html><body><p>Alpha</p></body></html>");
        assert_eq!(cart.get_element_tree(&element).await.unwrap().text, "Alpha");

        mock.set_page_source("<html><body></body></html>");
        assert!(matches!(
            cart.get_element_tree(&element).await,
            Err(BrowserError::NoMatchingNode { .. })
        ));
    }

    #[tokio::test]
    async fn test_element_tree_refuses_live_only_strategy_and_missing_locator() {
        let mock = Arc::new(MockDriver::new());
        let cart = page(&mock, &Locator::css("#cart").unwrap());
        let by_id = Locator::id("total").unwrap();
        mock.add_element(&by_id, MockElement::new("span"));

        let plain = Element::find(mock.clone(), ElementOptions::new(by_id.clone()))
            .await
            .unwrap();
        assert!(matches!(
            cart.get_element_tree(&plain).await,
            Err(BrowserError::MissingTreeLocator)
        ));

        let tree_by_id = Element::find(
            mock.clone(),
            ElementOptions::new(by_id.clone()).with_tree_locator(by_id),
        )
        .await
        .unwrap();
        assert!(matches!(
            cart.get_element_tree(&tree_by_id).await,
            Err(BrowserError::UnsupportedTreeStrategy { .. })
        ));
    }

    #[tokio::test]
    async fn test_text_exists_searches_page_source() {
        let mock = Arc::new(MockDriver::new());
        mock.set_page_source("<html><body><h1>Your cart is empty</h1></body></html>");
        let cart = page(&mock, &Locator::css("#cart").unwrap());
        assert!(cart.text_exists("cart is empty").await.unwrap());
        assert!(!cart.text_exists("Checkout").await.unwrap());
        assert_eq!(cart.html_tree().await.unwrap().root_tag(), "html");
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let mock = Arc::new(MockDriver::new());
        let locator = Locator::css("#cart").unwrap();
        assert!(matches!(
            WebPage::from_config(mock.clone(), &Config::default(), "/cart", locator.clone()),
            Err(BrowserError::ConfigurationError(_))
        ));

        let config = Config {
            base_url: Some(BASE.to_string()),
            ..Config::default()
        };
        let page = WebPage::from_config(mock, &config, "/cart", locator).unwrap();
        assert_eq!(page.url(), "https://shop.test/cart");
        assert_eq!(page.state(), PageState::Unconfirmed);
    }
}
