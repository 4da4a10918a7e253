use crate::core::{Driver, WaitConfig};
use crate::errors::{BrowserError, Result};
use crate::types::WindowHandle;
use crate::wait::{self, new_window_after};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const MAIN_WINDOW_NAME: &str = "main";

/// How long a triggering action has to produce its window.
pub const WINDOW_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSession {
    pub name: String,
    pub handle: WindowHandle,
    pub active: bool,
}

/// Named registry of the windows a test has opened.
///
/// One per driver session. Names are lowercased; `main` is the window that
/// was current when the helper was created and is always registered.
pub struct WindowHelper {
    driver: Arc<dyn Driver>,
    sessions: Vec<WindowSession>,
    wait: WaitConfig,
}

impl WindowHelper {
    pub async fn new(driver: Arc<dyn Driver>) -> Result<Self> {
        let handle = driver.current_window_handle().await?;
        Ok(Self {
            driver,
            sessions: vec![WindowSession {
                name: MAIN_WINDOW_NAME.to_string(),
                handle,
                active: true,
            }],
            wait: WaitConfig::default().with_timeout(WINDOW_OPEN_TIMEOUT),
        })
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// The single active session.
    pub fn active_session(&self) -> Result<&WindowSession> {
        let mut active = self.sessions.iter().filter(|session| session.active);
        match (active.next(), active.next()) {
            (Some(session), None) => Ok(session),
            _ => Err(BrowserError::NoActiveWindow),
        }
    }

    pub fn current_sessions(&self) -> Vec<&str> {
        self.sessions.iter().map(|session| session.name.as_str()).collect()
    }

    pub fn is_name_in_use(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.sessions.iter().any(|session| session.name == name)
    }

    /// Run `action`, wait for the window it opens, and register that window
    /// as `name`. The new window becomes the active one.
    pub async fn open_window<T, F, Fut>(&mut self, name: &str, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let name = name.to_lowercase();
        if name == MAIN_WINDOW_NAME {
            return Err(BrowserError::ReservedWindowName(name));
        }
        if self.is_name_in_use(&name) {
            return Err(BrowserError::DuplicateWindowName(name));
        }

        let previous = self.driver.window_handles().await?.last().cloned();
        let value = action().await?;

        let driver = self.driver.as_ref();
        let description = format!("window '{}' to open", name);
        let handle = wait::wait_until(self.wait, &description, || {
            new_window_after(driver, previous.as_ref())
        })
        .await?;

        self.driver.switch_to_window(&handle).await?;
        self.deactivate_all();
        debug!(window = %name, %handle, "window registered");
        self.sessions.push(WindowSession {
            name,
            handle,
            active: true,
        });
        Ok(value)
    }

    pub async fn switch_to(&mut self, name: &str) -> Result<()> {
        let name = name.to_lowercase();
        let handle = self.session(&name)?.handle.clone();
        self.driver.switch_to_window(&handle).await?;

        for session in &mut self.sessions {
            session.active = session.name == name;
        }
        Ok(())
    }

    /// Close `name` and return to whichever window was active before, or
    /// to `main` if `name` itself was active.
    pub async fn close_window(&mut self, name: &str) -> Result<()> {
        let name = name.to_lowercase();
        if name == MAIN_WINDOW_NAME {
            return Err(BrowserError::CloseMainWindow);
        }
        let target = self.session(&name)?.handle.clone();

        let active = self.active_session()?;
        let return_to = if active.handle == target {
            MAIN_WINDOW_NAME.to_string()
        } else {
            active.name.clone()
        };

        self.switch_to(&name).await?;
        self.driver.close_window().await?;
        self.switch_to(&return_to).await?;
        self.sessions.retain(|session| session.name != name);
        debug!(window = %name, active = %return_to, "window closed");
        Ok(())
    }

    fn session(&self, name: &str) -> Result<&WindowSession> {
        self.sessions
            .iter()
            .find(|session| session.name == name)
            .ok_or_else(|| BrowserError::WindowNotFound(name.to_string()))
    }

    fn deactivate_all(&mut self) {
        for session in &mut self.sessions {
            session.active = false;
        }
    }
}
