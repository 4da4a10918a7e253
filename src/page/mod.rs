//! Page objects: one navigable screen each, identified by a unique locator.

pub mod mobile;
pub mod web;

use crate::core::{Driver, Locator, WaitConfig};
use crate::dom::{ParseTree, TreeNode};
use crate::element::Locatable;
use crate::errors::{BrowserError, Result};
use crate::wait;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use mobile::{Context, MobilePage};
pub use web::WebPage;

/// Where a page instance is in its identity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Unconfirmed,
    Confirmed,
    /// Terminal. The probe failed and the instance should be dropped.
    Rejected,
}

#[async_trait]
pub trait Page: Send + Sync {
    fn driver(&self) -> &Arc<dyn Driver>;

    /// Locator that is present only when this page is showing.
    fn unique_locator(&self) -> &Locator;

    fn wait_config(&self) -> WaitConfig {
        WaitConfig::default()
    }

    /// Query form of the identity probe. A timeout answers `false`; any
    /// other failure is returned as an error.
    async fn is_current_page(&self) -> Result<bool> {
        let probe =
            wait::until_present(self.driver().as_ref(), self.unique_locator(), self.wait_config())
                .await;
        match probe {
            Ok(_) => Ok(true),
            Err(err) if err.is_timeout() => {
                debug!(locator = %self.unique_locator(), "page identity probe timed out");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Assertion form of the identity probe.
    async fn confirm(&self) -> Result<()> {
        if self.is_current_page().await? {
            return Ok(());
        }
        Err(BrowserError::PageMismatch {
            expected: self.unique_locator().to_string(),
            actual: self.driver().current_url().await?,
        })
    }

    async fn page_source(&self) -> Result<String> {
        self.driver().page_source().await
    }

    async fn text_exists(&self, text: &str) -> Result<bool> {
        Ok(self.page_source().await?.contains(text))
    }

    /// Snapshot of the current markup.
    async fn html_tree(&self) -> Result<ParseTree> {
        let source = self.page_source().await?;
        Ok(ParseTree::parse(&source))
    }

    /// Resolve `element`'s tree locator against a fresh snapshot.
    ///
    /// Exactly one node must match. Nothing here waits; call again after
    /// the UI changes.
    async fn get_element_tree(&self, element: &dyn Locatable) -> Result<TreeNode> {
        let tree_locator = element
            .tree_locator()
            .cloned()
            .ok_or(BrowserError::MissingTreeLocator)?;
        let source = self.page_source().await?;
        resolve_in_snapshot(&source, &tree_locator)
    }
}

fn resolve_in_snapshot(markup: &str, locator: &Locator) -> Result<TreeNode> {
    let tree = ParseTree::parse(markup);
    debug!(%locator, captured_at = %tree.captured_at(), "resolving tree locator");
    tree.find_unique(locator)
}
