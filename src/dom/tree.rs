use crate::core::{Locator, Strategy};
use crate::dom::xpath::PathExpr;
use crate::errors::{BrowserError, Result};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategies a [`ParseTree`] can answer.
pub const TREE_STRATEGIES: [Strategy; 2] = [Strategy::Css, Strategy::XPath];

/// Static snapshot of a page's markup.
///
/// Built from the page source at a point in time and never refreshed. It
/// is not `Send`; build and query it without holding it across an await.
pub struct ParseTree {
    document: Html,
    captured_at: DateTime<Utc>,
}

impl ParseTree {
    pub fn parse(markup: &str) -> Self {
        Self {
            document: Html::parse_document(markup),
            captured_at: Utc::now(),
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn root(&self) -> TreeNode {
        TreeNode::from_element(self.document.root_element())
    }

    pub fn root_tag(&self) -> String {
        self.document.root_element().value().name().to_string()
    }

    /// Every node matching `locator`, in document order.
    pub fn select(&self, locator: &Locator) -> Result<Vec<ElementRef<'_>>> {
        match locator.strategy() {
            Strategy::Css => {
                let selector = Selector::parse(locator.value()).map_err(|e| {
                    BrowserError::InvalidSelector(format!("{}: {:?}", locator.value(), e))
                })?;
                Ok(self.document.select(&selector).collect())
            }
            Strategy::XPath => Ok(PathExpr::parse(locator.value())?.evaluate(&self.document)),
            other => Err(BrowserError::UnsupportedTreeStrategy {
                strategy: other.to_string(),
                supported: TREE_STRATEGIES.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// The single node matching `locator`.
    pub fn find_unique(&self, locator: &Locator) -> Result<TreeNode> {
        let mut matches = self.select(locator)?;
        match matches.len() {
            0 => Err(BrowserError::NoMatchingNode {
                locator: locator.to_string(),
            }),
            1 => Ok(TreeNode::from_element(matches.remove(0))),
            count => Err(BrowserError::AmbiguousMatch {
                locator: locator.to_string(),
                count,
                matches: matches.iter().map(|el| el.html()).collect(),
            }),
        }
    }

    pub fn find_all(&self, locator: &Locator) -> Result<Vec<TreeNode>> {
        Ok(self
            .select(locator)?
            .into_iter()
            .map(TreeNode::from_element)
            .collect())
    }

    /// Whether any node's own text contains `text`.
    pub fn contains_text(&self, text: &str) -> bool {
        self.document
            .root_element()
            .text()
            .any(|fragment| fragment.contains(text))
    }
}

/// Owned copy of one node from a [`ParseTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub tag_name: String,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub html: String,
}

impl TreeNode {
    fn from_element(el: ElementRef<'_>) -> Self {
        Self {
            tag_name: el.value().name().to_string(),
            text: el.text().collect::<String>(),
            attributes: el
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            html: el.html(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"<html><body>
        <div class="row"><span class="name">Alpha</span></div>
        <div class="row"><span class="name">Beta</span></div>
        <a id="home" href="/">Home</a>
    </body></html>"#;

    #[test]
    fn test_unique_css_match_becomes_owned_node() {
        let tree = ParseTree::parse(LIST);
        let node = tree.find_unique(&Locator::css("#home").unwrap()).unwrap();
        assert_eq!(node.tag_name, "a");
        assert_eq!(node.text, "Home");
        assert_eq!(node.attribute("href"), Some("/"));
        assert!(node.html.starts_with("<a"));
    }

    #[test]
    fn test_ambiguous_css_match_lists_candidates() {
        let tree = ParseTree::parse(LIST);
        match tree.find_unique(&Locator::css("div.row").unwrap()) {
            Err(BrowserError::AmbiguousMatch { count, matches, .. }) => {
                assert_eq!(count, 2);
                assert!(matches[0].contains("Alpha"));
                assert!(matches[1].contains("Beta"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_xpath_match_and_miss() {
        let tree = ParseTree::parse(LIST);
        let beta = tree
            .find_unique(&Locator::xpath("//span[text()='Beta']").unwrap())
            .unwrap();
        assert_eq!(beta.attribute("class"), Some("name"));

        assert!(matches!(
            tree.find_unique(&Locator::xpath("//span[text()='Gamma']").unwrap()),
            Err(BrowserError::NoMatchingNode { .. })
        ));
    }

    #[test]
    fn test_ambiguous_path_match_lists_candidates_in_page_order() {
        let tree = ParseTree::parse("<div><p><span>first</span></p><span>second</span></div>");
        match tree.find_unique(&Locator::xpath("//span").unwrap()) {
            Err(BrowserError::AmbiguousMatch { count, matches, .. }) => {
                assert_eq!(count, 2);
                assert_eq!(matches, vec!["<span>first</span>", "<span>second</span>"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_live_only_strategies_are_refused() {
        let tree = ParseTree::parse(LIST);
        match tree.find_unique(&Locator::id("home").unwrap()) {
            Err(BrowserError::UnsupportedTreeStrategy { strategy, supported }) => {
                assert_eq!(strategy, "id");
                assert_eq!(supported, vec!["css selector", "xpath"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_css_is_reported() {
        let tree = ParseTree::parse(LIST);
        assert!(matches!(
            tree.select(&Locator::css("div[").unwrap()),
            Err(BrowserError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_fragment_is_wrapped_in_html_root() {
        let tree = ParseTree::parse("<p>loose text</p>");
        assert_eq!(tree.root_tag(), "html");
        assert!(tree.contains_text("loose"));
        assert!(!tree.contains_text("absent"));
        assert_eq!(tree.root().tag_name, "html");
    }
}
