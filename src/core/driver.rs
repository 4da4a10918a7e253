use crate::core::Locator;
use crate::errors::Result;
use crate::types::{ElementHandle, PointerAction, ScriptArg, WindowHandle};
use async_trait::async_trait;
use serde_json::Value;

/// Capability surface of a remote automation driver.
///
/// Pages and elements hold an `Arc<dyn Driver>`; several of them may share
/// one session, provided the caller serializes their use.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the current window to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn back(&self) -> Result<()>;

    async fn forward(&self) -> Result<()>;

    /// Reload the current document
    async fn refresh(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Serialized markup of the current document
    async fn page_source(&self) -> Result<String>;

    /// Locate the first matching node. Fails with `ElementNotFound` when absent.
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle>;

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Locate matching nodes below `parent`, in document order.
    async fn find_child_elements(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>>;

    /// Execute a script; element arguments are visible as `arguments[i]`.
    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> Result<Value>;

    async fn element_text(&self, element: &ElementHandle) -> Result<String>;

    async fn element_tag_name(&self, element: &ElementHandle) -> Result<String>;

    /// `Ok(None)` when the attribute is absent.
    async fn element_attribute(&self, element: &ElementHandle, name: &str)
        -> Result<Option<String>>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool>;

    /// Whether the node behind `element` has left the document.
    async fn is_stale(&self, element: &ElementHandle) -> Result<bool>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// All open windows, oldest first
    async fn window_handles(&self) -> Result<Vec<WindowHandle>>;

    async fn current_window_handle(&self) -> Result<WindowHandle>;

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()>;

    /// Close the current window
    async fn close_window(&self) -> Result<()>;

    /// Available mobile contexts, e.g. `NATIVE_APP`, `WEBVIEW_1234`
    async fn contexts(&self) -> Result<Vec<String>>;

    async fn current_context(&self) -> Result<String>;

    async fn switch_to_context(&self, name: &str) -> Result<()>;

    /// Perform a pointer/touch action chain as one gesture
    async fn perform_actions(&self, actions: Vec<PointerAction>) -> Result<()>;
}
