//! Capabilities an element variant may support.
//!
//! Variants implement only what they can do; callers that need one
//! behaviour take `&dyn Clickable`, `&dyn Toggleable` and so on.

use crate::core::Locator;
use crate::element::Element;
use crate::errors::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Locatable: Send + Sync {
    fn element(&self) -> &Element;

    fn locator(&self) -> &Locator {
        self.element().locator()
    }

    /// Locator used only against the structured tree, never the live driver
    fn tree_locator(&self) -> Option<&Locator> {
        self.element().tree_locator()
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.element().is_displayed().await
    }

    async fn scroll_into_view(&self, offset: Option<i64>) -> Result<()> {
        self.element().scroll_into_view(offset).await
    }
}

#[async_trait]
pub trait Clickable: Locatable {
    async fn click(&self) -> Result<()> {
        self.element().click().await
    }
}

#[async_trait]
pub trait TextValued: Locatable {
    async fn text(&self) -> Result<String>;
}

#[async_trait]
pub trait Editable: TextValued {
    async fn clear(&self) -> Result<()>;

    /// Replace the current contents with `text`
    async fn set_text(&self, text: &str) -> Result<()>;
}

#[async_trait]
pub trait Toggleable: Locatable {
    async fn is_on(&self) -> Result<bool>;
}

#[async_trait]
pub trait Selectable: Locatable {
    async fn options(&self) -> Result<Vec<String>>;

    async fn choose(&self, text: &str) -> Result<()>;
}

#[async_trait]
pub trait Touchable: Locatable {
    async fn tap(&self, x: i64, y: i64) -> Result<()> {
        self.element().tap(x, y).await
    }

    async fn swipe_left(&self, x: i64, y: i64) -> Result<()> {
        self.element().swipe_left(x, y).await
    }

    async fn swipe_right(&self, x: i64, y: i64) -> Result<()> {
        self.element().swipe_right(x, y).await
    }
}
