use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a live UI node, as issued by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Driver-level identifier of a browser window or tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Argument passed to a script. Elements are exposed to the script as `arguments[i]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Element(ElementHandle),
    Value(serde_json::Value),
}

impl From<&ElementHandle> for ScriptArg {
    fn from(handle: &ElementHandle) -> Self {
        ScriptArg::Element(handle.clone())
    }
}

impl From<serde_json::Value> for ScriptArg {
    fn from(value: serde_json::Value) -> Self {
        ScriptArg::Value(value)
    }
}

/// One step of a pointer/touch action chain. Offsets are relative to the
/// element's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerAction {
    MoveTo {
        element: ElementHandle,
        offset: Option<(i64, i64)>,
    },
    Press {
        element: ElementHandle,
        x: i64,
        y: i64,
    },
    Release,
    Click {
        element: ElementHandle,
    },
    Tap {
        element: ElementHandle,
        x: i64,
        y: i64,
    },
}
