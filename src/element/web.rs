use crate::core::{Driver, Locator};
use crate::element::{
    Clickable, Editable, Element, ElementOptions, Locatable, Selectable, TextValued, Toggleable,
    Touchable,
};
use crate::errors::{BrowserError, Result};
use crate::types::{ElementHandle, PointerAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Text input. Its text is the `value` attribute, not the rendered text.
#[derive(Debug, Clone)]
pub struct InputElement {
    element: Element,
}

impl InputElement {
    pub async fn find(driver: Arc<dyn Driver>, options: ElementOptions) -> Result<Self> {
        Ok(Self {
            element: Element::find(driver, options).await?,
        })
    }

    /// Type into the field, optionally clearing it first.
    pub async fn type_text(&self, text: &str, clear_first: bool) -> Result<()> {
        if clear_first {
            self.clear().await?;
        }
        self.element
            .driver()
            .send_keys(self.element.handle(), text)
            .await
    }
}

impl Locatable for InputElement {
    fn element(&self) -> &Element {
        &self.element
    }
}

impl Clickable for InputElement {}

impl Touchable for InputElement {}

#[async_trait]
impl TextValued for InputElement {
    async fn text(&self) -> Result<String> {
        Ok(self.element.attribute("value").await?.unwrap_or_default())
    }
}

#[async_trait]
impl Editable for InputElement {
    async fn clear(&self) -> Result<()> {
        self.element.driver().clear(self.element.handle()).await
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        self.type_text(text, true).await
    }
}

#[derive(Debug, Clone)]
pub struct CheckboxElement {
    input: InputElement,
}

impl CheckboxElement {
    pub async fn find(driver: Arc<dyn Driver>, options: ElementOptions) -> Result<Self> {
        Ok(Self {
            input: InputElement::find(driver, options).await?,
        })
    }

    /// Checked when a `checked` attribute is present and not `"false"`.
    pub async fn is_checked(&self) -> Result<bool> {
        let checked = self.input.element.attribute("checked").await?;
        Ok(checked.map_or(false, |value| value != "false"))
    }
}

impl Locatable for CheckboxElement {
    fn element(&self) -> &Element {
        &self.input.element
    }
}

impl Clickable for CheckboxElement {}

#[async_trait]
impl TextValued for CheckboxElement {
    async fn text(&self) -> Result<String> {
        self.input.text().await
    }
}

#[async_trait]
impl Toggleable for CheckboxElement {
    async fn is_on(&self) -> Result<bool> {
        self.is_checked().await
    }
}

#[derive(Debug, Clone)]
pub struct RadioInputElement {
    input: InputElement,
}

impl RadioInputElement {
    pub async fn find(driver: Arc<dyn Driver>, options: ElementOptions) -> Result<Self> {
        Ok(Self {
            input: InputElement::find(driver, options).await?,
        })
    }

    pub async fn selected(&self) -> Result<bool> {
        let element = &self.input.element;
        element.driver().is_selected(element.handle()).await
    }
}

impl Locatable for RadioInputElement {
    fn element(&self) -> &Element {
        &self.input.element
    }
}

impl Clickable for RadioInputElement {}

#[async_trait]
impl TextValued for RadioInputElement {
    async fn text(&self) -> Result<String> {
        self.input.text().await
    }
}

#[async_trait]
impl Toggleable for RadioInputElement {
    async fn is_on(&self) -> Result<bool> {
        self.selected().await
    }
}

/// A group of radio inputs.
#[derive(Debug, Clone, Default)]
pub struct RadioField {
    inputs: Vec<RadioInputElement>,
}

impl RadioField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, input: RadioInputElement) {
        self.inputs.push(input);
    }

    pub fn inputs(&self) -> &[RadioInputElement] {
        &self.inputs
    }

    /// The first selected input, or `None` when nothing is selected.
    pub async fn selected(&self) -> Result<Option<&RadioInputElement>> {
        for input in &self.inputs {
            if input.selected().await? {
                return Ok(Some(input));
            }
        }
        Ok(None)
    }

    /// Every selected input, in insertion order.
    pub async fn selected_all(&self) -> Result<Vec<&RadioInputElement>> {
        let mut selected = Vec::new();
        for input in &self.inputs {
            if input.selected().await? {
                selected.push(input);
            }
        }
        Ok(selected)
    }
}

/// Dropdown backed by a `<select>` tag.
#[derive(Debug, Clone)]
pub struct SelectElement {
    element: Element,
}

impl SelectElement {
    /// Fails with `NotASelect` when the located node is not a `<select>`.
    pub async fn find(driver: Arc<dyn Driver>, options: ElementOptions) -> Result<Self> {
        let element = Element::find(driver, options).await?;
        let tag = element
            .driver()
            .element_tag_name(element.handle())
            .await?
            .to_lowercase();
        if tag != "select" {
            return Err(BrowserError::NotASelect { tag });
        }
        Ok(Self { element })
    }

    async fn option_handles(&self) -> Result<Vec<ElementHandle>> {
        let option = Locator::css("option")?;
        self.element
            .driver()
            .find_child_elements(self.element.handle(), &option)
            .await
    }

    async fn option_labels(&self, handles: &[ElementHandle]) -> Result<Vec<String>> {
        let driver = self.element.driver();
        let mut labels = Vec::with_capacity(handles.len());
        for handle in handles {
            labels.push(driver.element_text(handle).await?);
        }
        Ok(labels)
    }
}

impl Locatable for SelectElement {
    fn element(&self) -> &Element {
        &self.element
    }
}

impl Clickable for SelectElement {}

#[async_trait]
impl TextValued for SelectElement {
    /// Label of the first selected option
    async fn text(&self) -> Result<String> {
        let driver = self.element.driver();
        for handle in self.option_handles().await? {
            if driver.is_selected(&handle).await? {
                return driver.element_text(&handle).await;
            }
        }
        Err(BrowserError::ElementNotFound(format!(
            "no option is selected in {}",
            self.element.locator()
        )))
    }
}

#[async_trait]
impl Selectable for SelectElement {
    async fn options(&self) -> Result<Vec<String>> {
        let handles = self.option_handles().await?;
        self.option_labels(&handles).await
    }

    /// Select the option whose visible text is `text`.
    async fn choose(&self, text: &str) -> Result<()> {
        let driver = self.element.driver();
        let handles = self.option_handles().await?;
        let labels = self.option_labels(&handles).await?;

        let Some(index) = labels.iter().position(|label| label.trim() == text.trim()) else {
            return Err(BrowserError::InvalidSelectOption {
                value: text.to_string(),
                options: labels,
            });
        };

        debug!(locator = %self.element.locator(), option = text, "choosing option");
        if !driver.is_selected(&handles[index]).await? {
            driver.click(&handles[index]).await?;
        }
        Ok(())
    }
}

/// Hover menu. The option set depends on the concrete menu.
#[async_trait]
pub trait Menu: Locatable {
    async fn options(&self) -> Result<Vec<String>>;

    /// Move to the trigger and click it, then optionally read the options.
    async fn hover(&self, return_options: bool) -> Result<Option<Vec<String>>> {
        let element = self.element();
        element
            .driver()
            .perform_actions(vec![
                PointerAction::MoveTo {
                    element: element.handle().clone(),
                    offset: None,
                },
                PointerAction::Click {
                    element: element.handle().clone(),
                },
            ])
            .await?;

        if return_options {
            Ok(Some(self.options().await?))
        } else {
            Ok(None)
        }
    }
}

/// A modal dialog. Every concrete modal decides how it is shown and closed.
#[async_trait]
pub trait Modal: Locatable {
    async fn is_open(&self) -> Result<bool>;

    async fn close_button(&self) -> Result<Element>;
}
