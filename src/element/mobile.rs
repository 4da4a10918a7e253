use crate::core::Driver;
use crate::element::{Clickable, Element, ElementOptions, Locatable, Toggleable, Touchable};
use crate::errors::{BrowserError, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use crate::element::web::InputElement;

/// On/off switch whose state lives in its `value` attribute (`1` is on).
#[derive(Debug, Clone)]
pub struct SwitchElement {
    element: Element,
}

impl SwitchElement {
    pub async fn find(driver: Arc<dyn Driver>, options: ElementOptions) -> Result<Self> {
        Ok(Self {
            element: Element::find(driver, options).await?,
        })
    }

    /// Fails with `AttributeNotFound` when the switch has no `value` at all.
    pub async fn on(&self) -> Result<bool> {
        let value = self.element.attribute("value").await?.ok_or_else(|| {
            BrowserError::AttributeNotFound {
                attribute: "value".to_string(),
                locator: self.element.locator().to_string(),
            }
        })?;
        let value = value.trim();
        Ok(value == "1" || value.eq_ignore_ascii_case("true"))
    }
}

impl Locatable for SwitchElement {
    fn element(&self) -> &Element {
        &self.element
    }
}

impl Clickable for SwitchElement {}

impl Touchable for SwitchElement {}

#[async_trait]
impl Toggleable for SwitchElement {
    async fn is_on(&self) -> Result<bool> {
        self.on().await
    }
}
