//! In-memory driver for exercising pages and elements without a browser.
//!
//! Nodes are registered against the locator that should find them. A
//! refresh starts a new document generation: every handle issued before it
//! reports stale, and lookups return fresh handles.

use crate::core::{Driver, Locator, Strategy};
use crate::errors::{BrowserError, Result};
use crate::types::{ElementHandle, PointerAction, ScriptArg, WindowHandle};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub const NATIVE_APP: &str = "NATIVE_APP";

#[derive(Debug, Clone)]
pub struct MockElement {
    pub tag_name: String,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
}

impl MockElement {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            text: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
            selected: false,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

#[derive(Debug)]
struct Node {
    element: MockElement,
    locator: Option<Locator>,
    parent: Option<usize>,
    appears_at: Option<Instant>,
}

#[derive(Debug)]
struct State {
    nodes: Vec<Node>,
    generation: u64,
    strict_staleness: bool,
    url: String,
    title: String,
    page_source: String,
    history: Vec<String>,
    history_pos: usize,
    windows: Vec<WindowHandle>,
    current_window: WindowHandle,
    contexts: Vec<String>,
    current_context: String,
    context_failures: u32,
    calls: Vec<String>,
    scripts: Vec<(String, Vec<ScriptArg>)>,
    actions: Vec<PointerAction>,
}

#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<State>,
}

impl MockDriver {
    /// A driver on `about:blank` with one window and an `<html>` root node.
    pub fn new() -> Self {
        let main = WindowHandle::new("window-0");
        let driver = Self {
            state: Mutex::new(State {
                nodes: Vec::new(),
                generation: 0,
                strict_staleness: false,
                url: "about:blank".to_string(),
                title: String::new(),
                page_source: "<html><head></head><body></body></html>".to_string(),
                history: vec!["about:blank".to_string()],
                history_pos: 0,
                windows: vec![main.clone()],
                current_window: main,
                contexts: vec![NATIVE_APP.to_string()],
                current_context: NATIVE_APP.to_string(),
                context_failures: 0,
                calls: Vec::new(),
                scripts: Vec::new(),
                actions: Vec::new(),
            }),
        };
        if let Ok(root) = Locator::css("html") {
            driver.add_element(&root, MockElement::new("html"));
        }
        driver
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a node found by `locator`. Returns its index.
    pub fn add_element(&self, locator: &Locator, element: MockElement) -> usize {
        self.push_node(element, Some(locator.clone()), None, None)
    }

    /// Register a node that only becomes findable after `delay`.
    pub fn add_element_after(
        &self,
        locator: &Locator,
        element: MockElement,
        delay: Duration,
    ) -> usize {
        self.push_node(element, Some(locator.clone()), None, Some(Instant::now() + delay))
    }

    /// Register a child node, found below its parent by tag name.
    pub fn add_child(&self, parent: usize, element: MockElement) -> usize {
        self.push_node(element, None, Some(parent), None)
    }

    /// Register a `<select>` with one `<option>` per label.
    pub fn add_select(&self, locator: &Locator, labels: &[&str], selected: Option<usize>) -> usize {
        let select = self.add_element(locator, MockElement::new("select"));
        for (i, label) in labels.iter().enumerate() {
            let mut option = MockElement::new("option").with_text(label);
            option.selected = selected == Some(i);
            self.add_child(select, option);
        }
        select
    }

    fn push_node(
        &self,
        element: MockElement,
        locator: Option<Locator>,
        parent: Option<usize>,
        appears_at: Option<Instant>,
    ) -> usize {
        let mut state = self.state();
        state.nodes.push(Node {
            element,
            locator,
            parent,
            appears_at,
        });
        state.nodes.len() - 1
    }

    pub fn set_attribute(&self, index: usize, name: &str, value: &str) {
        if let Some(node) = self.state().nodes.get_mut(index) {
            node.element
                .attributes
                .insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, index: usize, name: &str) {
        if let Some(node) = self.state().nodes.get_mut(index) {
            node.element.attributes.remove(name);
        }
    }

    pub fn set_selected(&self, index: usize, selected: bool) {
        if let Some(node) = self.state().nodes.get_mut(index) {
            node.element.selected = selected;
        }
    }

    pub fn element(&self, index: usize) -> Option<MockElement> {
        self.state().nodes.get(index).map(|node| node.element.clone())
    }

    pub fn set_page_source(&self, source: &str) {
        self.state().page_source = source.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.state().title = title.to_string();
    }

    pub fn set_contexts(&self, contexts: &[&str], current: &str) {
        let mut state = self.state();
        state.contexts = contexts.iter().map(|c| c.to_string()).collect();
        state.current_context = current.to_string();
    }

    /// Make the next `times` context listings fail with a transient driver error.
    pub fn fail_contexts(&self, times: u32) {
        self.state().context_failures = times;
    }

    /// Fail `is_stale` on a handle from the current document, so a refresh
    /// that waits before capturing is caught.
    pub fn strict_staleness(&self) {
        self.state().strict_staleness = true;
    }

    /// Simulate a window opened by the page. The current window is unchanged.
    pub fn open_window(&self, handle: &str) {
        self.state().windows.push(WindowHandle::new(handle));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn scripts(&self) -> Vec<(String, Vec<ScriptArg>)> {
        self.state().scripts.clone()
    }

    pub fn actions(&self) -> Vec<PointerAction> {
        self.state().actions.clone()
    }

    fn record(state: &mut State, call: String) {
        state.calls.push(call);
    }

    fn handle_for(state: &State, index: usize) -> ElementHandle {
        ElementHandle::new(format!("node-{}-g{}", index, state.generation))
    }

    fn is_visible_now(node: &Node) -> bool {
        node.appears_at.map_or(true, |at| Instant::now() >= at)
    }

    fn resolve(state: &State, handle: &ElementHandle) -> Result<usize> {
        let (index, generation) = Self::parse_handle(handle)?;
        if generation != state.generation {
            return Err(BrowserError::StaleElement(handle.to_string()));
        }
        if index >= state.nodes.len() {
            return Err(BrowserError::ElementNotFound(handle.to_string()));
        }
        Ok(index)
    }

    fn parse_handle(handle: &ElementHandle) -> Result<(usize, u64)> {
        let invalid = || BrowserError::DriverError(format!("invalid handle {}", handle));
        let rest = handle.id().strip_prefix("node-").ok_or_else(invalid)?;
        let (index, generation) = rest.split_once("-g").ok_or_else(invalid)?;
        Ok((
            index.parse().map_err(|_| invalid())?,
            generation.parse().map_err(|_| invalid())?,
        ))
    }

    fn child_matches(node: &Node, locator: &Locator) -> bool {
        if node.locator.as_ref() == Some(locator) {
            return true;
        }
        matches!(locator.strategy(), Strategy::Css | Strategy::TagName)
            && node.element.tag_name == locator.value()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, format!("navigate {}", url));
        let pos = state.history_pos + 1;
        state.history.truncate(pos);
        state.history.push(url.to_string());
        state.history_pos = pos;
        state.url = url.to_string();
        Ok(())
    }

    async fn back(&self) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, "back".to_string());
        if state.history_pos > 0 {
            state.history_pos -= 1;
            state.url = state.history[state.history_pos].clone();
        }
        Ok(())
    }

    async fn forward(&self) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, "forward".to_string());
        if state.history_pos + 1 < state.history.len() {
            state.history_pos += 1;
            state.url = state.history[state.history_pos].clone();
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, "refresh".to_string());
        state.generation += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn page_source(&self) -> Result<String> {
        let mut state = self.state();
        Self::record(&mut state, "page_source".to_string());
        Ok(state.page_source.clone())
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        let mut state = self.state();
        Self::record(&mut state, format!("find_element {}", locator));
        let index = state
            .nodes
            .iter()
            .position(|node| node.locator.as_ref() == Some(locator) && Self::is_visible_now(node))
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))?;
        Ok(Self::handle_for(&state, index))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut state = self.state();
        Self::record(&mut state, format!("find_elements {}", locator));
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.locator.as_ref() == Some(locator) && Self::is_visible_now(node)
            })
            .map(|(index, _)| Self::handle_for(&state, index))
            .collect())
    }

    async fn find_child_elements(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let mut state = self.state();
        let parent = Self::resolve(&state, parent)?;
        Self::record(&mut state, format!("find_child_elements {}", locator));
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent == Some(parent) && Self::child_matches(node, locator))
            .map(|(index, _)| Self::handle_for(&state, index))
            .collect())
    }

    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> Result<Value> {
        let mut state = self.state();
        Self::record(&mut state, format!("execute_script {}", script));
        state.scripts.push((script.to_string(), args));
        Ok(Value::Null)
    }

    async fn element_text(&self, element: &ElementHandle) -> Result<String> {
        let state = self.state();
        let index = Self::resolve(&state, element)?;
        Ok(state.nodes[index].element.text.clone())
    }

    async fn element_tag_name(&self, element: &ElementHandle) -> Result<String> {
        let state = self.state();
        let index = Self::resolve(&state, element)?;
        Ok(state.nodes[index].element.tag_name.clone())
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>> {
        let mut state = self.state();
        let index = Self::resolve(&state, element)?;
        Self::record(&mut state, format!("element_attribute {}", name));
        Ok(state.nodes[index].element.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        let mut state = self.state();
        let index = Self::resolve(&state, element)?;
        Self::record(&mut state, "is_displayed".to_string());
        Ok(state.nodes[index].element.displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        let mut state = self.state();
        let index = Self::resolve(&state, element)?;
        Self::record(&mut state, "is_enabled".to_string());
        Ok(state.nodes[index].element.enabled)
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        let state = self.state();
        let index = Self::resolve(&state, element)?;
        Ok(state.nodes[index].element.selected)
    }

    async fn is_stale(&self, element: &ElementHandle) -> Result<bool> {
        let mut state = self.state();
        Self::record(&mut state, "is_stale".to_string());
        let (_, generation) = Self::parse_handle(element)?;
        let stale = generation != state.generation;
        if !stale && state.strict_staleness {
            return Err(BrowserError::DriverError(
                "staleness awaited on a handle captured after the reload".to_string(),
            ));
        }
        Ok(stale)
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let mut state = self.state();
        let index = Self::resolve(&state, element)?;
        Self::record(&mut state, format!("click {}", element));

        if state.nodes[index].element.tag_name == "option" {
            let parent = state.nodes[index].parent;
            for node in state.nodes.iter_mut().filter(|node| node.parent == parent) {
                node.element.selected = false;
            }
            state.nodes[index].element.selected = true;
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        let mut state = self.state();
        let index = Self::resolve(&state, element)?;
        Self::record(&mut state, format!("clear {}", element));
        state.nodes[index]
            .element
            .attributes
            .insert("value".to_string(), String::new());
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let mut state = self.state();
        let index = Self::resolve(&state, element)?;
        Self::record(&mut state, format!("send_keys {}", element));
        state.nodes[index]
            .element
            .attributes
            .entry("value".to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        Ok(self.state().windows.clone())
    }

    async fn current_window_handle(&self) -> Result<WindowHandle> {
        Ok(self.state().current_window.clone())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, format!("switch_to_window {}", handle));
        if !state.windows.contains(handle) {
            return Err(BrowserError::DriverError(format!("no such window {}", handle)));
        }
        state.current_window = handle.clone();
        Ok(())
    }

    async fn close_window(&self) -> Result<()> {
        let mut state = self.state();
        let current = state.current_window.clone();
        Self::record(&mut state, format!("close_window {}", current));
        state.windows.retain(|handle| *handle != current);
        Ok(())
    }

    async fn contexts(&self) -> Result<Vec<String>> {
        let mut state = self.state();
        Self::record(&mut state, "contexts".to_string());
        if state.context_failures > 0 {
            state.context_failures -= 1;
            return Err(BrowserError::DriverError(
                "context listing not ready".to_string(),
            ));
        }
        Ok(state.contexts.clone())
    }

    async fn current_context(&self) -> Result<String> {
        Ok(self.state().current_context.clone())
    }

    async fn switch_to_context(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, format!("switch_to_context {}", name));
        if !state.contexts.iter().any(|context| context == name) {
            return Err(BrowserError::DriverError(format!("no such context {}", name)));
        }
        state.current_context = name.to_string();
        Ok(())
    }

    async fn perform_actions(&self, actions: Vec<PointerAction>) -> Result<()> {
        let mut state = self.state();
        for action in &actions {
            if let PointerAction::MoveTo { element, .. }
            | PointerAction::Press { element, .. }
            | PointerAction::Click { element }
            | PointerAction::Tap { element, .. } = action
            {
                Self::resolve(&state, element)?;
            }
        }
        Self::record(&mut state, format!("perform_actions {}", actions.len()));
        state.actions.extend(actions);
        Ok(())
    }
}
