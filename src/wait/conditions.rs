//! Single-shot probes over driver state, and their bounded-wait forms.

use super::wait_until;
use crate::core::{Driver, Locator, WaitConfig};
use crate::errors::{ErrorKind, Result};
use crate::types::{ElementHandle, WindowHandle};

/// `Some(handle)` once a node matching `locator` is in the document.
pub async fn presence_of(driver: &dyn Driver, locator: &Locator) -> Result<Option<ElementHandle>> {
    match driver.find_element(locator).await {
        Ok(handle) => Ok(Some(handle)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// `Some(handle)` once the node is present, displayed and enabled.
pub async fn clickable(driver: &dyn Driver, locator: &Locator) -> Result<Option<ElementHandle>> {
    let Some(handle) = presence_of(driver, locator).await? else {
        return Ok(None);
    };

    let ready = async {
        Ok::<_, crate::errors::BrowserError>(
            driver.is_displayed(&handle).await? && driver.is_enabled(&handle).await?,
        )
    };
    match ready.await {
        Ok(true) => Ok(Some(handle)),
        Ok(false) => Ok(None),
        // Replaced between lookup and query; look again on the next poll.
        Err(err) if err.kind() == ErrorKind::Stale => Ok(None),
        Err(err) => Err(err),
    }
}

/// `Some(())` once the node behind `handle` has left the document.
pub async fn staleness_of(driver: &dyn Driver, handle: &ElementHandle) -> Result<Option<()>> {
    Ok(driver.is_stale(handle).await?.then_some(()))
}

/// `Some(newest)` once the newest window differs from `previous`.
pub async fn new_window_after(
    driver: &dyn Driver,
    previous: Option<&WindowHandle>,
) -> Result<Option<WindowHandle>> {
    let handles = driver.window_handles().await?;
    Ok(handles.last().filter(|newest| Some(*newest) != previous).cloned())
}

pub async fn until_present(
    driver: &dyn Driver,
    locator: &Locator,
    config: WaitConfig,
) -> Result<ElementHandle> {
    let description = format!("presence of {}", locator);
    wait_until(config, &description, || presence_of(driver, locator)).await
}

pub async fn until_clickable(
    driver: &dyn Driver,
    locator: &Locator,
    config: WaitConfig,
) -> Result<ElementHandle> {
    let description = format!("{} to be clickable", locator);
    wait_until(config, &description, || clickable(driver, locator)).await
}

pub async fn until_stale(
    driver: &dyn Driver,
    handle: &ElementHandle,
    config: WaitConfig,
) -> Result<()> {
    let description = format!("staleness of {}", handle);
    wait_until(config, &description, || staleness_of(driver, handle)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BrowserError;
    use crate::testing::{MockDriver, MockElement};
    use std::time::Duration;

    fn short() -> WaitConfig {
        WaitConfig::new(Duration::from_secs(2), Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_waits_for_late_element() {
        let driver = MockDriver::new();
        let locator = Locator::css("#late").unwrap();
        driver.add_element_after(&locator, MockElement::new("div"), Duration::from_secs(1));

        let handle = until_present(&driver, &locator, short()).await.unwrap();
        assert!(!handle.id().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clickable_rejects_hidden_element() {
        let driver = MockDriver::new();
        let locator = Locator::css("button").unwrap();
        driver.add_element(&locator, MockElement::new("button").hidden());

        let result = until_clickable(&driver, &locator, short()).await;
        assert!(matches!(result, Err(BrowserError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_new_window_after_compares_newest_handle() {
        let driver = MockDriver::new();
        let main = driver.current_window_handle().await.unwrap();
        assert!(new_window_after(&driver, Some(&main)).await.unwrap().is_none());

        driver.open_window("popup");
        let newest = new_window_after(&driver, Some(&main)).await.unwrap();
        assert_eq!(newest, Some(WindowHandle::new("popup")));
    }
}
