//! JavaScript snippets the Chrome driver evaluates in the page.
//!
//! Located nodes are kept in an in-page registry object keyed by handle id.
//! A node keeps the key it was first registered under, and disconnected
//! nodes are dropped on the next lookup. A reload replaces `window`, so every
//! handle issued before it resolves to nothing and reads as stale.
//!
//! Every snippet returns a JSON string so that results survive the protocol
//! round trip unchanged.

use crate::core::{Locator, Strategy};
use crate::errors::{BrowserError, Result};
use crate::types::{ElementHandle, PointerAction, ScriptArg};
use serde_json::Value;

pub const REGISTRY: &str = "window.__slimleaf";
pub const REGISTRY_KEYS: &str = "window.__slimleafKeys";

pub const PAGE_SOURCE: &str = "JSON.stringify(document.documentElement.outerHTML)";
pub const TITLE: &str = "JSON.stringify(document.title)";
pub const RELOAD: &str = "JSON.stringify(location.reload())";
pub const HISTORY_BACK: &str = "JSON.stringify(history.back())";
pub const HISTORY_FORWARD: &str = "JSON.stringify(history.forward())";

pub const TEXT: &str = "return el.innerText !== undefined ? el.innerText : el.textContent;";
pub const TAG_NAME: &str = "return el.tagName.toLowerCase();";
pub const IS_ENABLED: &str = "return !el.disabled;";
pub const IS_SELECTED: &str = "return !!(el.selected || el.checked);";
pub const IS_DISPLAYED: &str = r#"
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return style.display !== 'none' && style.visibility !== 'hidden'
        && (rect.width > 0 || rect.height > 0);"#;
pub const CLICK: &str = "el.scrollIntoView({ block: 'center' }); el.click(); return null;";
pub const HOVER: &str = r#"
    el.scrollIntoView({ block: 'center' });
    for (const type of ['mouseover', 'mouseenter', 'mousemove']) {
        el.dispatchEvent(new MouseEvent(type, { bubbles: true }));
    }
    return null;"#;

const HOVER_EVENTS: [&str; 3] = ["mouseover", "mouseenter", "mousemove"];
const CLICK_EVENTS: [&str; 3] = ["mousedown", "mouseup", "click"];
pub const CLEAR: &str = r#"
    el.value = '';
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return null;"#;

/// Encode `value` as a JavaScript string literal.
pub fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Expression yielding an array of the nodes under `root` that match.
fn finder(locator: &Locator, root: &str) -> Result<String> {
    let value = js_string(locator.value())?;
    let by_all = |predicate: &str| {
        format!(
            "Array.from({}.querySelectorAll('*')).filter(n => {})",
            root, predicate
        )
    };

    Ok(match locator.strategy() {
        Strategy::Css => format!("Array.from({}.querySelectorAll({}))", root, value),
        Strategy::XPath => format!(
            "(() => {{ const r = document.evaluate({}, {}, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
             return out; }})()",
            value, root
        ),
        Strategy::Id => by_all(&format!("n.id === {}", value)),
        Strategy::Name => by_all(&format!("n.getAttribute('name') === {}", value)),
        Strategy::ClassName => format!("Array.from({}.getElementsByClassName({}))", root, value),
        Strategy::TagName => format!("Array.from({}.getElementsByTagName({}))", root, value),
        Strategy::LinkText => format!(
            "Array.from({}.querySelectorAll('a')).filter(n => n.textContent.trim() === {})",
            root, value
        ),
        Strategy::PartialLinkText => format!(
            "Array.from({}.querySelectorAll('a')).filter(n => n.textContent.includes({}))",
            root, value
        ),
        other => {
            return Err(BrowserError::Unsupported(format!(
                "locator strategy '{}' needs a mobile driver",
                other
            )))
        }
    })
}

/// Register the matches and return their handle ids.
///
/// Fresh ids are `{prefix}-{index}`; the caller supplies a new prefix per
/// call. A node found again keeps its earlier id. `limit` caps how many
/// matches are registered.
pub fn find(
    locator: &Locator,
    parent: Option<&ElementHandle>,
    prefix: &str,
    limit: Option<usize>,
) -> Result<String> {
    let (lookup_root, guard) = match parent {
        Some(parent) => {
            let key = js_string(parent.id())?;
            (
                format!("registry[{}]", key),
                format!(
                    "if (!registry[{key}] || !registry[{key}].isConnected) \
                     return JSON.stringify({{ stale: true }});",
                    key = key
                ),
            )
        }
        None => ("document".to_string(), String::new()),
    };
    let nodes = match limit {
        Some(limit) => format!("({}).slice(0, {})", finder(locator, &lookup_root)?, limit),
        None => finder(locator, &lookup_root)?,
    };

    Ok(format!(
        "(() => {{ const registry = {reg} || ({reg} = {{}}); \
         const known = {keys} || ({keys} = new WeakMap()); {guard} \
         for (const key of Object.keys(registry)) \
         if (!registry[key].isConnected) delete registry[key]; \
         const nodes = {nodes}; const prefix = {prefix}; \
         return JSON.stringify({{ keys: nodes.map((n, i) => {{ \
         let key = known.get(n); \
         if (key === undefined) {{ key = prefix + '-' + i; known.set(n, key); }} \
         registry[key] = n; return key; }}) }}); }})()",
        reg = REGISTRY,
        keys = REGISTRY_KEYS,
        guard = guard,
        nodes = nodes,
        prefix = js_string(prefix)?,
    ))
}

/// Run `body` with the registered node bound to `el`.
pub fn on_element(handle: &ElementHandle, body: &str) -> Result<String> {
    Ok(format!(
        "(() => {{ const el = ({reg} || {{}})[{key}]; \
         if (!el || !el.isConnected) return JSON.stringify({{ stale: true }}); \
         const value = (() => {{ {body} }})(); \
         return JSON.stringify({{ value: value === undefined ? null : value }}); }})()",
        reg = REGISTRY,
        key = js_string(handle.id())?,
        body = body,
    ))
}

/// Read `name` the way WebDriver does: the live property when there is
/// one, else the markup attribute.
pub fn attribute(handle: &ElementHandle, name: &str) -> Result<String> {
    let name = js_string(name)?;
    on_element(
        handle,
        &format!(
            "const name = {name}; \
             if (name in el) {{ const p = el[name]; \
             if (typeof p === 'boolean') return p ? 'true' : null; \
             if (typeof p === 'string' || typeof p === 'number') return String(p); }} \
             return el.getAttribute(name);",
            name = name
        ),
    )
}

/// Dispatch `events` at the point `(dx, dy)` away from the centre of `el`,
/// on whichever node is rendered there.
fn pointer_at(events: &[&str], dx: i64, dy: i64) -> String {
    format!(
        "el.scrollIntoView({{ block: 'center' }}); \
         const rect = el.getBoundingClientRect(); \
         const x = rect.left + rect.width / 2 + ({dx}); \
         const y = rect.top + rect.height / 2 + ({dy}); \
         const target = document.elementFromPoint(x, y) || el; \
         for (const type of {events}) \
         target.dispatchEvent(new MouseEvent(type, {{ bubbles: true, cancelable: true, \
         view: window, clientX: x, clientY: y }})); \
         return null;",
        dx = dx,
        dy = dy,
        events = Value::from(events.to_vec()),
    )
}

pub fn hover_at(dx: i64, dy: i64) -> String {
    pointer_at(&HOVER_EVENTS, dx, dy)
}

pub fn click_at(dx: i64, dy: i64) -> String {
    pointer_at(&CLICK_EVENTS, dx, dy)
}

/// Translate a pointer sequence into element snippets, in order.
///
/// Moves become hover events and clicks become DOM clicks. A move with an
/// offset aims at that point from the element's centre, and a click on the
/// same element right after it lands there too. Presses, releases and taps
/// need touch input.
pub fn pointer_steps(actions: &[PointerAction]) -> Result<Vec<(ElementHandle, String)>> {
    let mut steps = Vec::with_capacity(actions.len());
    let mut aimed: Option<(&ElementHandle, (i64, i64))> = None;
    for action in actions {
        match action {
            PointerAction::MoveTo { element, offset } => {
                let body = match offset {
                    Some((dx, dy)) => hover_at(*dx, *dy),
                    None => HOVER.to_string(),
                };
                steps.push((element.clone(), body));
                aimed = offset.map(|offset| (element, offset));
            }
            PointerAction::Click { element } => {
                let body = match aimed {
                    Some((at, (dx, dy))) if at == element => click_at(dx, dy),
                    _ => CLICK.to_string(),
                };
                steps.push((element.clone(), body));
                aimed = None;
            }
            PointerAction::Press { .. } | PointerAction::Release | PointerAction::Tap { .. } => {
                return Err(BrowserError::Unsupported(format!(
                    "{:?} needs touch input",
                    action
                )))
            }
        }
    }
    Ok(steps)
}

pub fn send_keys(handle: &ElementHandle, text: &str) -> Result<String> {
    on_element(
        handle,
        &format!(
            "el.focus(); el.value = (el.value || '') + {text}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return null;",
            text = js_string(text)?
        ),
    )
}

pub fn is_stale(handle: &ElementHandle) -> Result<String> {
    Ok(format!(
        "(() => {{ const el = ({reg} || {{}})[{key}]; \
         return JSON.stringify(!el || !el.isConnected); }})()",
        reg = REGISTRY,
        key = js_string(handle.id())?,
    ))
}

/// Wrap a caller script as a function body; `arguments[i]` are `args`.
pub fn user_script(script: &str, args: &[ScriptArg]) -> Result<String> {
    let args = args
        .iter()
        .map(|arg| match arg {
            ScriptArg::Element(handle) => Ok(format!("registry[{}]", js_string(handle.id())?)),
            ScriptArg::Value(value) => Ok(serde_json::to_string(value)?),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "(() => {{ const registry = {reg} || {{}}; \
         const result = (function() {{ {script} }}).apply(null, [{args}]); \
         return JSON.stringify(result === undefined ? null : result); }})()",
        reg = REGISTRY,
        script = script,
        args = args.join(", "),
    ))
}

/// Decode the JSON string a snippet returned.
pub fn decode(raw: Option<Value>) -> Result<Value> {
    match raw {
        Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
        Some(other) => Err(BrowserError::JavaScriptFailed(format!(
            "expected a JSON string result, got {}",
            other
        ))),
        None => Ok(Value::Null),
    }
}

/// Unwrap an [`on_element`] or [`find`] reply, turning a stale marker into
/// `StaleElement`.
pub fn element_reply(handle: &ElementHandle, reply: Value) -> Result<Value> {
    if reply.get("stale").and_then(Value::as_bool) == Some(true) {
        return Err(BrowserError::StaleElement(handle.to_string()));
    }
    Ok(reply.get("value").cloned().unwrap_or(Value::Null))
}

pub fn keys(reply: &Value) -> Vec<ElementHandle> {
    reply
        .get("keys")
        .and_then(Value::as_array)
        .map(|keys| {
            keys.iter()
                .filter_map(Value::as_str)
                .map(ElementHandle::new)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_quotes_locator_value() {
        let locator = Locator::css(r#"a[title="it's"]"#).unwrap();
        let script = find(&locator, None, "abc", None).unwrap();
        assert!(script.contains(r#"document.querySelectorAll("a[title=\"it's\"]")"#));
        assert!(script.contains(r#"const prefix = "abc""#));
    }

    #[test]
    fn test_child_find_guards_against_stale_parent() {
        let locator = Locator::css("option").unwrap();
        let parent = ElementHandle::new("p-0");
        let script = find(&locator, Some(&parent), "abc", None).unwrap();
        assert!(script.contains(r#"registry["p-0"].querySelectorAll("option")"#));
        assert!(script.contains("stale: true"));
    }

    #[test]
    fn test_single_lookup_registers_first_match_only() {
        let locator = Locator::css("li").unwrap();
        let script = find(&locator, None, "abc", Some(1)).unwrap();
        assert!(script.contains(r#"(Array.from(document.querySelectorAll("li"))).slice(0, 1)"#));

        let all = find(&locator, None, "abc", None).unwrap();
        assert!(!all.contains("slice("));
    }

    #[test]
    fn test_lookup_reuses_keys_and_drops_detached_nodes() {
        let script = find(&Locator::css("li").unwrap(), None, "abc", None).unwrap();
        assert!(script.contains("window.__slimleafKeys = new WeakMap()"));
        assert!(script.contains("let key = known.get(n);"));
        assert!(script.contains("if (!registry[key].isConnected) delete registry[key];"));
    }

    #[test]
    fn test_pointer_scripts_aim_at_offset_from_centre() {
        let click = click_at(0, 40);
        assert!(click.contains("rect.left + rect.width / 2 + (0)"));
        assert!(click.contains("rect.top + rect.height / 2 + (40)"));
        assert!(click.contains(r#"["mousedown","mouseup","click"]"#));

        let hover = hover_at(-5, 3);
        assert!(hover.contains("+ (-5)"));
        assert!(hover.contains(r#"["mouseover","mouseenter","mousemove"]"#));
    }

    #[test]
    fn test_offset_move_carries_into_following_click() {
        let button = ElementHandle::new("k-1");
        let steps = pointer_steps(&[
            PointerAction::MoveTo {
                element: button.clone(),
                offset: Some((0, 40)),
            },
            PointerAction::Click {
                element: button.clone(),
            },
        ])
        .unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], (button.clone(), hover_at(0, 40)));
        assert_eq!(steps[1], (button.clone(), click_at(0, 40)));

        let plain = pointer_steps(&[
            PointerAction::MoveTo {
                element: button.clone(),
                offset: None,
            },
            PointerAction::Click {
                element: button.clone(),
            },
        ])
        .unwrap();
        assert_eq!(plain[0].1, HOVER);
        assert_eq!(plain[1].1, CLICK);
    }

    #[test]
    fn test_offset_does_not_leak_to_other_elements() {
        let steps = pointer_steps(&[
            PointerAction::MoveTo {
                element: ElementHandle::new("k-1"),
                offset: Some((0, 40)),
            },
            PointerAction::Click {
                element: ElementHandle::new("k-2"),
            },
        ])
        .unwrap();
        assert_eq!(steps[1].1, CLICK);
    }

    #[test]
    fn test_touch_steps_are_unsupported() {
        let result = pointer_steps(&[PointerAction::Release]);
        assert!(matches!(result, Err(BrowserError::Unsupported(_))));
    }

    #[test]
    fn test_mobile_strategies_are_unsupported() {
        let locator = Locator::accessibility_id("login").unwrap();
        assert!(matches!(
            find(&locator, None, "abc", None),
            Err(BrowserError::Unsupported(_))
        ));
    }

    #[test]
    fn test_user_script_binds_arguments_in_order() {
        let script = user_script(
            "arguments[0].scrollIntoView(true);",
            &[
                ScriptArg::Element(ElementHandle::new("k-1")),
                ScriptArg::Value(json!({ "direction": "up" })),
            ],
        )
        .unwrap();
        assert!(script.contains(r#"[registry["k-1"], {"direction":"up"}]"#));
    }

    #[test]
    fn test_replies_decode_and_detect_staleness() {
        let handle = ElementHandle::new("k-1");
        let reply = decode(Some(Value::String(r#"{"value":"hello"}"#.to_string()))).unwrap();
        assert_eq!(element_reply(&handle, reply).unwrap(), json!("hello"));

        let stale = decode(Some(Value::String(r#"{"stale":true}"#.to_string()))).unwrap();
        assert!(matches!(
            element_reply(&handle, stale),
            Err(BrowserError::StaleElement(_))
        ));

        let found = json!({ "keys": ["x-0", "x-1"] });
        assert_eq!(keys(&found), vec![ElementHandle::new("x-0"), ElementHandle::new("x-1")]);
        assert_eq!(decode(None).unwrap(), Value::Null);
    }
}
