//! Path expressions over a parsed document.
//!
//! Supports the subset page objects actually use: absolute and relative
//! location paths, `//` descendant steps, `*`, `.`, `..`, and predicates
//! made of positions, `last()`, attribute and text tests, `contains()`,
//! `starts-with()` and `normalize-space()`, joined with `and`.
//!
//! Relative paths start at the `<html>` element.

use crate::errors::{BrowserError, Result};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    OwnText,
    StringValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    HasAttribute(String),
    Equals(Operand, String),
    NormalizedEquals(Operand, String),
    Contains(Operand, String),
    StartsWith(Operand, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    All(Vec<Condition>),
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A compiled path expression.
#[derive(Debug, Clone)]
pub struct PathExpr {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Clone, Copy)]
enum Context<'a> {
    Document,
    Element(ElementRef<'a>),
}

const LITERAL: &str = r#"(?:'([^']*)'|"([^"]*)")"#;
const OPERAND: &str = r"(@[A-Za-z_][\w\-.:]*|text\(\)|\.)";

struct ConditionPatterns {
    has_attribute: Regex,
    equals: Regex,
    function: Regex,
    normalized: Regex,
}

static CONDITION_PATTERNS: LazyLock<std::result::Result<ConditionPatterns, regex::Error>> =
    LazyLock::new(condition_patterns);

fn condition_patterns() -> std::result::Result<ConditionPatterns, regex::Error> {
    Ok(ConditionPatterns {
        has_attribute: Regex::new(r"^@([A-Za-z_][\w\-.:]*)$")?,
        equals: Regex::new(&format!(r"^{}\s*=\s*{}$", OPERAND, LITERAL))?,
        function: Regex::new(&format!(
            r"^(contains|starts-with)\(\s*{}\s*,\s*{}\s*\)$",
            OPERAND, LITERAL
        ))?,
        normalized: Regex::new(&format!(
            r"^normalize-space\(\s*{}?\s*\)\s*=\s*{}$",
            OPERAND, LITERAL
        ))?,
    })
}

impl PathExpr {
    pub fn parse(source: &str) -> Result<Self> {
        let expr = source.trim();
        if expr.is_empty() {
            return Err(invalid(source, "empty expression"));
        }

        let segments = split_steps(expr).map_err(|reason| invalid(source, reason))?;
        let absolute = expr.starts_with('/');
        let mut steps = Vec::with_capacity(segments.len());
        for (descendant, text) in segments {
            steps.push(parse_step(source, descendant, &text)?);
        }

        Ok(Self {
            source: source.to_string(),
            absolute,
            steps,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Matching elements in document order, without duplicates.
    pub fn evaluate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let root = document.root_element();
        let order: HashMap<_, usize> = root
            .descendants()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();

        let mut contexts = if self.absolute {
            vec![Context::Document]
        } else {
            vec![Context::Element(root)]
        };

        for step in &self.steps {
            let mut next: Vec<ElementRef<'a>> = Vec::new();
            let mut seen = HashSet::new();
            for context in &contexts {
                for group in candidate_groups(document, *context, step.axis) {
                    let matched = group
                        .into_iter()
                        .filter(|el| node_test(&step.test, *el))
                        .collect::<Vec<_>>();
                    for el in apply_predicates(matched, &step.predicates) {
                        if seen.insert(el.id()) {
                            next.push(el);
                        }
                    }
                }
            }
            next.sort_by_key(|el| order.get(&el.id()).copied().unwrap_or(usize::MAX));
            contexts = next.into_iter().map(Context::Element).collect();
        }

        contexts
            .into_iter()
            .filter_map(|context| match context {
                Context::Element(el) => Some(el),
                Context::Document => None,
            })
            .collect()
    }
}

fn invalid(source: &str, reason: impl std::fmt::Display) -> BrowserError {
    BrowserError::InvalidPath(format!("{}: {}", source, reason))
}

/// Split on `/` outside brackets and quotes. Each entry records whether it
/// was introduced by `//`.
fn split_steps(expr: &str) -> std::result::Result<Vec<(bool, String)>, &'static str> {
    let chars: Vec<char> = expr.chars().collect();
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut descendant = false;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '[' => {
                    depth += 1;
                    current.push(c);
                }
                ']' => {
                    depth = depth.checked_sub(1).ok_or("unbalanced ']'")?;
                    current.push(c);
                }
                '/' if depth == 0 => {
                    if !current.is_empty() {
                        steps.push((descendant, std::mem::take(&mut current)));
                    } else if i > 0 && !(i == 1 && chars[0] == '/') {
                        return Err("empty step");
                    }
                    descendant = chars.get(i + 1) == Some(&'/');
                    if descendant {
                        i += 1;
                    }
                }
                _ => current.push(c),
            },
        }
        i += 1;
    }

    if quote.is_some() {
        return Err("unterminated string literal");
    }
    if depth != 0 {
        return Err("unbalanced '['");
    }
    if current.is_empty() {
        return Err("expression ends with '/'");
    }
    steps.push((descendant, current));
    Ok(steps)
}

fn parse_step(source: &str, descendant: bool, text: &str) -> Result<Step> {
    let text = text.trim();
    let (head, mut rest) = match text.find('[') {
        Some(index) => (text[..index].trim(), &text[index..]),
        None => (text, ""),
    };

    let (axis, test) = match head {
        "." => (Axis::SelfNode, NodeTest::Any),
        ".." => (Axis::Parent, NodeTest::Any),
        "*" | "node()" => (child_or_descendant(descendant), NodeTest::Any),
        name if is_name(name) => (
            child_or_descendant(descendant),
            NodeTest::Name(name.to_ascii_lowercase()),
        ),
        other => {
            return Err(invalid(
                source,
                format!("unsupported step '{}', only element steps are supported", other),
            ))
        }
    };
    if descendant && matches!(axis, Axis::SelfNode | Axis::Parent) {
        return Err(invalid(source, "'//' cannot precede '.' or '..'"));
    }

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = matching_bracket(rest).ok_or_else(|| invalid(source, "unbalanced '['"))?;
        predicates.push(parse_predicate(source, rest[1..close].trim())?);
        rest = rest[close + 1..].trim_start();
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(invalid(source, format!("unexpected '{}'", rest)));
        }
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn child_or_descendant(descendant: bool) -> Axis {
    if descendant {
        Axis::Descendant
    } else {
        Axis::Child
    }
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Index of the `]` closing the `[` at the start of `text`.
fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_predicate(source: &str, text: &str) -> Result<Predicate> {
    if let Ok(position) = text.parse::<usize>() {
        if position == 0 {
            return Err(invalid(source, "positions start at 1"));
        }
        return Ok(Predicate::Position(position));
    }
    if text == "last()" {
        return Ok(Predicate::Last);
    }

    let conditions = split_and(text)
        .into_iter()
        .map(|part| parse_condition(source, part.trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Predicate::All(conditions))
}

/// Split on ` and ` outside string literals.
fn split_and(text: &str) -> Vec<&str> {
    const AND: &str = " and ";
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if i < start {
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if text[i..].starts_with(AND) => {
                parts.push(&text[start..i]);
                start = i + AND.len();
            }
            None => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn literal(captures: &regex::Captures<'_>, first: usize) -> String {
    captures
        .get(first)
        .or_else(|| captures.get(first + 1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn operand(text: &str) -> Operand {
    match text {
        "text()" => Operand::OwnText,
        "." => Operand::StringValue,
        attribute => Operand::Attribute(attribute.trim_start_matches('@').to_string()),
    }
}

fn parse_condition(source: &str, text: &str) -> Result<Condition> {
    let patterns = CONDITION_PATTERNS.as_ref().map_err(|e| invalid(source, e))?;

    if let Some(caps) = patterns.has_attribute.captures(text) {
        return Ok(Condition::HasAttribute(caps[1].to_string()));
    }

    if let Some(caps) = patterns.equals.captures(text) {
        return Ok(Condition::Equals(operand(&caps[1]), literal(&caps, 2)));
    }

    if let Some(caps) = patterns.function.captures(text) {
        let op = operand(&caps[2]);
        let value = literal(&caps, 3);
        return Ok(match &caps[1] {
            "contains" => Condition::Contains(op, value),
            _ => Condition::StartsWith(op, value),
        });
    }

    if let Some(caps) = patterns.normalized.captures(text) {
        let op = caps
            .get(1)
            .map(|m| operand(m.as_str()))
            .unwrap_or(Operand::StringValue);
        return Ok(Condition::NormalizedEquals(op, literal(&caps, 2)));
    }

    Err(invalid(source, format!("unsupported predicate '{}'", text)))
}

fn element_children<'a>(el: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap).collect()
}

fn candidate_groups<'a>(
    document: &'a Html,
    context: Context<'a>,
    axis: Axis,
) -> Vec<Vec<ElementRef<'a>>> {
    let root = document.root_element();
    match (axis, context) {
        (Axis::Child, Context::Document) => vec![vec![root]],
        (Axis::Child, Context::Element(el)) => vec![element_children(el)],
        (Axis::Descendant, Context::Document) => {
            let mut groups = vec![vec![root]];
            groups.extend(
                root.descendants()
                    .filter_map(ElementRef::wrap)
                    .map(element_children),
            );
            groups
        }
        (Axis::Descendant, Context::Element(el)) => el
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(element_children)
            .collect(),
        (Axis::SelfNode, Context::Element(el)) => vec![vec![el]],
        (Axis::Parent, Context::Element(el)) => {
            vec![el.parent().and_then(ElementRef::wrap).into_iter().collect()]
        }
        (Axis::SelfNode | Axis::Parent, Context::Document) => vec![],
    }
}

fn node_test(test: &NodeTest, el: ElementRef<'_>) -> bool {
    match test {
        NodeTest::Any => true,
        NodeTest::Name(name) => el.value().name().eq_ignore_ascii_case(name),
    }
}

fn apply_predicates<'a>(
    mut nodes: Vec<ElementRef<'a>>,
    predicates: &[Predicate],
) -> Vec<ElementRef<'a>> {
    for predicate in predicates {
        nodes = match predicate {
            Predicate::Position(position) => nodes.get(position - 1).copied().into_iter().collect(),
            Predicate::Last => nodes.last().copied().into_iter().collect(),
            Predicate::All(conditions) => nodes
                .into_iter()
                .filter(|el| conditions.iter().all(|condition| holds(condition, *el)))
                .collect(),
        };
    }
    nodes
}

fn operand_values(op: &Operand, el: ElementRef<'_>) -> Vec<String> {
    match op {
        Operand::Attribute(name) => el.value().attr(name).map(str::to_string).into_iter().collect(),
        Operand::OwnText => el
            .children()
            .filter_map(|node| node.value().as_text().map(|text| String::from(&**text)))
            .collect(),
        Operand::StringValue => vec![el.text().collect::<String>()],
    }
}

fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn holds(condition: &Condition, el: ElementRef<'_>) -> bool {
    match condition {
        Condition::HasAttribute(name) => el.value().attr(name).is_some(),
        Condition::Equals(op, expected) => operand_values(op, el).iter().any(|v| v == expected),
        Condition::NormalizedEquals(op, expected) => {
            let joined = operand_values(op, el).concat();
            normalize_space(&joined) == *expected
        }
        Condition::Contains(op, needle) => operand_values(op, el)
            .iter()
            .any(|v| v.contains(needle.as_str())),
        Condition::StartsWith(op, prefix) => operand_values(op, el)
            .iter()
            .any(|v| v.starts_with(prefix.as_str())),
    }
}
