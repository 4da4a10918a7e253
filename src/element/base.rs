use crate::core::{Driver, Locator, WaitConfig};
use crate::element::{Clickable, Locatable, TextValued, Touchable};
use crate::errors::Result;
use crate::types::{ElementHandle, PointerAction, ScriptArg};
use crate::wait;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Horizontal distance covered by a swipe gesture.
pub const SWIPE_DISTANCE_PX: i64 = 200;

/// Where to find an element and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ElementOptions {
    pub locator: Locator,
    pub tree_locator: Option<Locator>,
    pub wait: WaitConfig,
}

impl ElementOptions {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            tree_locator: None,
            wait: WaitConfig::default(),
        }
    }

    pub fn with_tree_locator(mut self, tree_locator: Locator) -> Self {
        self.tree_locator = Some(tree_locator);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait = self.wait.with_timeout(timeout);
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }
}

/// A located live UI node.
///
/// The handle is bound once, when the element is found. It is not
/// re-resolved behind the caller's back; use [`Element::refind`] after the
/// node may have been replaced.
#[derive(Clone)]
pub struct Element {
    driver: Arc<dyn Driver>,
    locator: Locator,
    tree_locator: Option<Locator>,
    wait: WaitConfig,
    handle: ElementHandle,
}

impl Element {
    /// Wait for the node to be present and bind it.
    pub async fn find(driver: Arc<dyn Driver>, options: ElementOptions) -> Result<Self> {
        let handle = wait::until_present(driver.as_ref(), &options.locator, options.wait).await?;
        debug!(locator = %options.locator, %handle, "element located");

        Ok(Self {
            driver,
            locator: options.locator,
            tree_locator: options.tree_locator,
            wait: options.wait,
            handle,
        })
    }

    pub async fn refind(&mut self) -> Result<()> {
        self.handle = wait::until_present(self.driver.as_ref(), &self.locator, self.wait).await?;
        Ok(())
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn handle(&self) -> &ElementHandle {
        &self.handle
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn tree_locator(&self) -> Option<&Locator> {
        self.tree_locator.as_ref()
    }

    pub fn wait_config(&self) -> WaitConfig {
        self.wait
    }

    /// Rendered text of the node
    pub async fn text(&self) -> Result<String> {
        self.driver.element_text(&self.handle).await
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.driver.element_attribute(&self.handle, name).await
    }

    pub async fn is_displayed(&self) -> Result<bool> {
        self.driver.is_displayed(&self.handle).await
    }

    /// Scroll the node into the viewport, then optionally scroll the
    /// viewport by `offset` pixels on the Y axis.
    pub async fn scroll_into_view(&self, offset: Option<i64>) -> Result<()> {
        self.driver
            .execute_script(
                "arguments[0].scrollIntoView(true);",
                vec![ScriptArg::from(&self.handle)],
            )
            .await?;

        if let Some(offset) = offset.filter(|offset| *offset != 0) {
            self.driver
                .execute_script(&format!("window.scrollBy(0, {});", offset), vec![])
                .await?;
        }
        Ok(())
    }

    /// Wait for the node to be clickable, then click it once.
    pub async fn click(&self) -> Result<()> {
        let target = self.until_clickable().await?;
        self.driver.click(&target).await
    }

    /// Click at a vertical offset from the node's top-left corner.
    pub async fn click_with_offset(&self, y_offset: i64) -> Result<()> {
        let target = self.until_clickable().await?;
        self.driver
            .perform_actions(vec![
                PointerAction::MoveTo {
                    element: target.clone(),
                    offset: Some((0, y_offset)),
                },
                PointerAction::Click { element: target },
            ])
            .await
    }

    pub async fn tap(&self, x: i64, y: i64) -> Result<()> {
        let target = self.until_clickable().await?;
        self.driver
            .perform_actions(vec![PointerAction::Tap {
                element: target,
                x,
                y,
            }])
            .await
    }

    pub async fn swipe_left(&self, x: i64, y: i64) -> Result<()> {
        self.swipe(-SWIPE_DISTANCE_PX, x, y).await
    }

    pub async fn swipe_right(&self, x: i64, y: i64) -> Result<()> {
        self.swipe(SWIPE_DISTANCE_PX, x, y).await
    }

    async fn swipe(&self, pixels: i64, x: i64, y: i64) -> Result<()> {
        let target = self.until_clickable().await?;
        self.driver
            .perform_actions(vec![
                PointerAction::Press {
                    element: target.clone(),
                    x,
                    y,
                },
                PointerAction::MoveTo {
                    element: target,
                    offset: Some((x + pixels, y)),
                },
                PointerAction::Release,
            ])
            .await
    }

    /// Run a script with this node as `arguments[0]`.
    pub async fn execute_script(&self, script: &str) -> Result<Value> {
        self.driver
            .execute_script(script, vec![ScriptArg::from(&self.handle)])
            .await
    }

    pub(crate) async fn until_clickable(&self) -> Result<ElementHandle> {
        wait::until_clickable(self.driver.as_ref(), &self.locator, self.wait).await
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("locator", &self.locator)
            .field("tree_locator", &self.tree_locator)
            .field("handle", &self.handle)
            .finish()
    }
}

impl Locatable for Element {
    fn element(&self) -> &Element {
        self
    }
}

impl Clickable for Element {}

impl Touchable for Element {}

#[async_trait]
impl TextValued for Element {
    async fn text(&self) -> Result<String> {
        Element::text(self).await
    }
}

pub type LabelElement = Element;
pub type ButtonElement = Element;
pub type LinkElement = Element;
pub type AnchorElement = Element;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BrowserError;
    use crate::testing::{MockDriver, MockElement};
    use tokio::time::Instant;

    fn driver() -> Arc<MockDriver> {
        Arc::new(MockDriver::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_times_out_within_one_poll_of_deadline() {
        let mock = driver();
        let options = ElementOptions::new(Locator::css("#missing").unwrap())
            .with_timeout(Duration::from_secs(5));

        let start = Instant::now();
        let result = Element::find(mock.clone(), options).await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(BrowserError::Timeout { .. })));
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed <= Duration::from_millis(5_500));
    }

    #[tokio::test]
    async fn test_click_rechecks_clickability_after_construction() {
        let mock = driver();
        let locator = Locator::css("button.go").unwrap();
        mock.add_element(&locator, MockElement::new("button"));

        let element = Element::find(mock.clone(), ElementOptions::new(locator.clone()))
            .await
            .unwrap();
        assert_eq!(mock.call_count(&format!("find_element {}", locator)), 1);
        assert_eq!(mock.call_count("is_enabled"), 0);

        element.click().await.unwrap();
        assert_eq!(mock.call_count(&format!("find_element {}", locator)), 2);
        assert_eq!(mock.call_count("is_enabled"), 1);
        assert_eq!(mock.call_count("click"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_on_element_hidden_since_construction_times_out() {
        let mock = driver();
        let locator = Locator::css("button.gone").unwrap();
        mock.add_element(&locator, MockElement::new("button").hidden());

        let element = Element::find(
            mock.clone(),
            ElementOptions::new(locator).with_timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap();

        assert!(matches!(
            element.click().await,
            Err(BrowserError::Timeout { .. })
        ));
        assert_eq!(mock.call_count("click"), 0);
    }

    #[tokio::test]
    async fn test_text_and_display_read_the_bound_node() {
        let mock = driver();
        let locator = Locator::css("h1").unwrap();
        mock.add_element(&locator, MockElement::new("h1").with_text("Welcome"));

        let element = Element::find(mock.clone(), ElementOptions::new(locator))
            .await
            .unwrap();
        assert_eq!(element.text().await.unwrap(), "Welcome");
        assert!(element.is_displayed().await.unwrap());
    }

    #[tokio::test]
    async fn test_scroll_into_view_with_offset_issues_second_scroll() {
        let mock = driver();
        let locator = Locator::css("footer").unwrap();
        mock.add_element(&locator, MockElement::new("footer"));
        let element = Element::find(mock.clone(), ElementOptions::new(locator))
            .await
            .unwrap();

        element.scroll_into_view(Some(200)).await.unwrap();
        let scripts = mock.scripts();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].0, "arguments[0].scrollIntoView(true);");
        assert_eq!(scripts[0].1, vec![ScriptArg::Element(element.handle().clone())]);
        assert_eq!(scripts[1].0, "window.scrollBy(0, 200);");

        element.scroll_into_view(None).await.unwrap();
        assert_eq!(mock.scripts().len(), 3);
    }

    #[tokio::test]
    async fn test_swipe_is_press_move_release_with_fixed_delta() {
        let mock = driver();
        let locator = Locator::accessibility_id("carousel").unwrap();
        mock.add_element(&locator, MockElement::new("XCUIElementTypeOther"));
        let element = Element::find(mock.clone(), ElementOptions::new(locator))
            .await
            .unwrap();

        element.swipe_left(5, 5).await.unwrap();
        let actions = mock.actions();
        assert_eq!(actions.len(), 3);
        assert!(matches!(actions[0], PointerAction::Press { x: 5, y: 5, .. }));
        assert!(matches!(
            actions[1],
            PointerAction::MoveTo {
                offset: Some((-195, 5)),
                ..
            }
        ));
        assert_eq!(actions[2], PointerAction::Release);

        element.tap(5, 5).await.unwrap();
        assert!(matches!(
            mock.actions()[3],
            PointerAction::Tap { x: 5, y: 5, .. }
        ));
    }

    #[tokio::test]
    async fn test_refind_binds_fresh_handle_after_reload() {
        let mock = driver();
        let locator = Locator::css("main").unwrap();
        mock.add_element(&locator, MockElement::new("main").with_text("body"));
        let mut element = Element::find(mock.clone(), ElementOptions::new(locator))
            .await
            .unwrap();

        mock.refresh().await.unwrap();
        assert!(matches!(
            element.text().await,
            Err(BrowserError::StaleElement(_))
        ));

        element.refind().await.unwrap();
        assert_eq!(element.text().await.unwrap(), "body");
    }
}
