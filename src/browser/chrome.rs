use crate::browser::scripts;
use crate::core::{BrowserConfig, Driver, Locator};
use crate::errors::{BrowserError, Result};
use crate::types::{ElementHandle, PointerAction, ScriptArg, WindowHandle};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

/// [`Driver`] backed by a local Chrome over the DevTools protocol.
///
/// Windows are tabs, identified by their target id. Chrome has no mobile
/// contexts and no touch input, so those operations report `Unsupported`.
pub struct ChromeDriver {
    browser: Browser,
    current: Mutex<Arc<Tab>>,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        if config.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        info!(headless = config.headless, "chrome launched");

        Ok(Self {
            browser,
            current: Mutex::new(tab),
        })
    }

    fn tab(&self) -> Arc<Tab> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::DriverError(e.to_string()))?;
        Ok(tabs.clone())
    }

    fn handle_of(tab: &Tab) -> WindowHandle {
        WindowHandle::new(tab.get_target_id().to_string())
    }

    /// Evaluate one of the JSON-returning snippets.
    fn eval(&self, expression: &str) -> Result<Value> {
        let result = self
            .tab()
            .evaluate(expression, false)
            .map_err(|e| BrowserError::JavaScriptFailed(e.to_string()))?;
        scripts::decode(result.value)
    }

    fn eval_on(&self, element: &ElementHandle, body: &str) -> Result<Value> {
        let reply = self.eval(&scripts::on_element(element, body)?)?;
        scripts::element_reply(element, reply)
    }

    fn wait_navigated(&self) -> Result<()> {
        self.tab()
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    fn lookup(
        &self,
        locator: &Locator,
        parent: Option<&ElementHandle>,
        limit: Option<usize>,
    ) -> Result<Vec<ElementHandle>> {
        let prefix = Uuid::new_v4().to_string();
        let reply = self.eval(&scripts::find(locator, parent, &prefix, limit)?)?;
        if let Some(parent) = parent {
            scripts::element_reply(parent, reply.clone())?;
        }
        Ok(scripts::keys(&reply))
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        info!(%url, "navigating");
        self.tab()
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        self.wait_navigated()
    }

    async fn back(&self) -> Result<()> {
        self.eval(scripts::HISTORY_BACK)?;
        self.wait_navigated()
    }

    async fn forward(&self) -> Result<()> {
        self.eval(scripts::HISTORY_FORWARD)?;
        self.wait_navigated()
    }

    async fn refresh(&self) -> Result<()> {
        self.eval(scripts::RELOAD)?;
        self.wait_navigated()
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab().get_url())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.eval(scripts::TITLE)?.as_str().unwrap_or("").to_string())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self
            .eval(scripts::PAGE_SOURCE)?
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.lookup(locator, None, Some(1))?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.lookup(locator, None, None)
    }

    async fn find_child_elements(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        self.lookup(locator, Some(parent), None)
    }

    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> Result<Value> {
        if script.trim_start().starts_with("mobile:") {
            return Err(BrowserError::Unsupported(format!(
                "'{}' is a mobile command",
                script
            )));
        }
        self.eval(&scripts::user_script(script, &args)?)
    }

    async fn element_text(&self, element: &ElementHandle) -> Result<String> {
        Ok(self
            .eval_on(element, scripts::TEXT)?
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    async fn element_tag_name(&self, element: &ElementHandle) -> Result<String> {
        Ok(self
            .eval_on(element, scripts::TAG_NAME)?
            .as_str()
            .unwrap_or("")
            .to_string())
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>> {
        let reply = self.eval(&scripts::attribute(element, name)?)?;
        Ok(scripts::element_reply(element, reply)?
            .as_str()
            .map(str::to_string))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self
            .eval_on(element, scripts::IS_DISPLAYED)?
            .as_bool()
            .unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self
            .eval_on(element, scripts::IS_ENABLED)?
            .as_bool()
            .unwrap_or(false))
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self
            .eval_on(element, scripts::IS_SELECTED)?
            .as_bool()
            .unwrap_or(false))
    }

    async fn is_stale(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self
            .eval(&scripts::is_stale(element)?)?
            .as_bool()
            .unwrap_or(true))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.eval_on(element, scripts::CLICK).map(|_| ())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.eval_on(element, scripts::CLEAR).map(|_| ())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let reply = self.eval(&scripts::send_keys(element, text)?)?;
        scripts::element_reply(element, reply).map(|_| ())
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        Ok(self
            .tabs()?
            .iter()
            .map(|tab| Self::handle_of(tab))
            .collect())
    }

    async fn current_window_handle(&self) -> Result<WindowHandle> {
        Ok(Self::handle_of(&self.tab()))
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        let tab = self
            .tabs()?
            .into_iter()
            .find(|tab| Self::handle_of(tab) == *handle)
            .ok_or_else(|| BrowserError::WindowNotFound(handle.to_string()))?;
        tab.activate()
            .map_err(|e| BrowserError::DriverError(e.to_string()))?;

        debug!(%handle, "switched window");
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = tab;
        Ok(())
    }

    async fn close_window(&self) -> Result<()> {
        self.tab()
            .close(true)
            .map_err(|e| BrowserError::DriverError(e.to_string()))?;
        Ok(())
    }

    async fn contexts(&self) -> Result<Vec<String>> {
        Err(BrowserError::Unsupported("mobile contexts".to_string()))
    }

    async fn current_context(&self) -> Result<String> {
        Err(BrowserError::Unsupported("mobile contexts".to_string()))
    }

    async fn switch_to_context(&self, _name: &str) -> Result<()> {
        Err(BrowserError::Unsupported("mobile contexts".to_string()))
    }

    async fn perform_actions(&self, actions: Vec<PointerAction>) -> Result<()> {
        for (element, body) in scripts::pointer_steps(&actions)? {
            self.eval_on(&element, &body)?;
        }
        Ok(())
    }
}
