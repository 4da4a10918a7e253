use crate::errors::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a driver should search for a node.
///
/// The string forms are the W3C WebDriver / Appium wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "css selector")]
    Css,
    #[serde(rename = "xpath")]
    XPath,
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "class name")]
    ClassName,
    #[serde(rename = "tag name")]
    TagName,
    #[serde(rename = "link text")]
    LinkText,
    #[serde(rename = "partial link text")]
    PartialLinkText,
    #[serde(rename = "accessibility id")]
    AccessibilityId,
    #[serde(rename = "-ios predicate string")]
    IosPredicate,
    #[serde(rename = "-ios class chain")]
    IosClassChain,
    #[serde(rename = "-android uiautomator")]
    AndroidUiAutomator,
}

impl Strategy {
    pub const ALL: [Strategy; 12] = [
        Strategy::Css,
        Strategy::XPath,
        Strategy::Id,
        Strategy::Name,
        Strategy::ClassName,
        Strategy::TagName,
        Strategy::LinkText,
        Strategy::PartialLinkText,
        Strategy::AccessibilityId,
        Strategy::IosPredicate,
        Strategy::IosClassChain,
        Strategy::AndroidUiAutomator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Css => "css selector",
            Strategy::XPath => "xpath",
            Strategy::Id => "id",
            Strategy::Name => "name",
            Strategy::ClassName => "class name",
            Strategy::TagName => "tag name",
            Strategy::LinkText => "link text",
            Strategy::PartialLinkText => "partial link text",
            Strategy::AccessibilityId => "accessibility id",
            Strategy::IosPredicate => "-ios predicate string",
            Strategy::IosClassChain => "-ios class chain",
            Strategy::AndroidUiAutomator => "-android uiautomator",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| BrowserError::InvalidLocator(format!("unknown strategy '{}'", s)))
    }
}

/// Immutable (strategy, value) pair identifying a UI node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLocator")]
pub struct Locator {
    strategy: Strategy,
    value: String,
}

#[derive(Deserialize)]
struct RawLocator {
    strategy: Strategy,
    value: String,
}

impl TryFrom<RawLocator> for Locator {
    type Error = BrowserError;

    fn try_from(raw: RawLocator) -> Result<Self> {
        Locator::new(raw.strategy, raw.value)
    }
}

impl Locator {
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(BrowserError::InvalidLocator(format!(
                "empty value for strategy '{}'",
                strategy
            )));
        }
        Ok(Self { strategy, value })
    }

    pub fn css(value: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::XPath, value)
    }

    pub fn id(value: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::Id, value)
    }

    pub fn accessibility_id(value: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::AccessibilityId, value)
    }

    pub fn ios_predicate(value: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::IosPredicate, value)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.strategy, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_needs_strategy_and_value() {
        let a = Locator::css("p").unwrap();
        let b = Locator::css("p").unwrap();
        let c = Locator::xpath("p").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_value_rejected() {
        assert!(matches!(
            Locator::css("  "),
            Err(BrowserError::InvalidLocator(_))
        ));
    }

    #[test]
    fn test_strategy_parses_wire_names() {
        assert_eq!(
            "-ios predicate string".parse::<Strategy>().unwrap(),
            Strategy::IosPredicate
        );
        assert!("by magic".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let loc = Locator::accessibility_id("login").unwrap();
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, r#"{"strategy":"accessibility id","value":"login"}"#);
        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);

        let empty = serde_json::from_str::<Locator>(r#"{"strategy":"xpath","value":""}"#);
        assert!(empty.is_err());
    }
}
