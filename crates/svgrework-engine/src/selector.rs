//! Selector resolution over an SVG document.
//!
//! Supported selectors are paths of whitespace-separated levels joined by the
//! descendant combinator. Each level is
//!
//! ```text
//! tag ( '#' id )? ( '[' name ( '=' value )? ']' )?
//! ```
//!
//! where `tag`, `id` and `name` are runs of `[A-Za-z0-9_:-]` and `value` is any
//! run of characters other than `]`. Quotes around `value` are ignored.

use std::collections::BTreeSet;
use svgrework_dom::{Document, NodeId};
use tracing::trace;

/// Attribute test of a selector level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeTest {
    /// `[name]`: the attribute is present, any value.
    Exists,
    /// `[name=value]`
    Equals(String),
}

/// `[name]` or `[name=value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePredicate {
    pub name: String,
    pub test: AttributeTest,
}

/// One compound level of a selector path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorLevel {
    pub tag: String,
    pub id: Option<String>,
    pub attribute: Option<AttributePredicate>,
}

impl SelectorLevel {
    /// Parse a single level. Returns `None` when the text does not fit the
    /// grammar; such a level matches nothing.
    pub fn parse(text: &str) -> Option<Self> {
        let mut rest = text;

        let tag = take_name(&mut rest)?;

        let id = match rest.strip_prefix('#') {
            Some(after) => {
                rest = after;
                Some(take_name(&mut rest)?.to_string())
            }
            None => None,
        };

        let attribute = match rest.strip_prefix('[') {
            Some(after) => {
                rest = after;
                let name = take_name(&mut rest)?.to_string();
                let test = match rest.strip_prefix('=') {
                    Some(after) => {
                        let end = after.find(']').filter(|&end| end > 0)?;
                        rest = &after[end..];
                        AttributeTest::Equals(strip_quotes(&after[..end]).to_string())
                    }
                    None => AttributeTest::Exists,
                };
                rest = rest.strip_prefix(']')?;
                Some(AttributePredicate { name, test })
            }
            None => None,
        };

        if !rest.is_empty() {
            return None;
        }

        Some(Self {
            tag: tag.to_string(),
            id,
            attribute,
        })
    }

    /// Whether `element` satisfies this level's tag, id and attribute tests.
    pub fn matches(&self, doc: &Document, element: NodeId) -> bool {
        if doc.tag_name(element) != Some(self.tag.as_str()) {
            return false;
        }
        if let Some(id) = &self.id {
            if doc.get_attribute(element, "id") != Some(id.as_str()) {
                return false;
            }
        }
        match &self.attribute {
            Some(AttributePredicate { name, test }) => match (doc.get_attribute(element, name), test) {
                (Some(_), AttributeTest::Exists) => true,
                (Some(actual), AttributeTest::Equals(expected)) => actual == expected,
                (None, _) => false,
            },
            None => true,
        }
    }

    /// Descendants of any candidate that match this level.
    ///
    /// Filtering the tag matches by the id and attribute tests gives the same
    /// set as intersecting separate tag, id and attribute searches over the
    /// same candidates.
    pub fn resolve(&self, doc: &Document, candidates: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
        candidates
            .iter()
            .flat_map(|&candidate| doc.find_descendants_by_tag_name(candidate, &self.tag))
            .filter(|&element| self.matches(doc, element))
            .collect()
    }
}

/// A whitespace-separated selector path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPath {
    pub levels: Vec<SelectorLevel>,
}

impl SelectorPath {
    /// Parse a path. `None` if the path is empty or any level is invalid.
    pub fn parse(selector: &str) -> Option<Self> {
        let levels = selector
            .split_whitespace()
            .map(SelectorLevel::parse)
            .collect::<Option<Vec<_>>>()?;
        if levels.is_empty() {
            return None;
        }
        Some(Self { levels })
    }

    /// Resolve the path below `root`.
    pub fn resolve(&self, doc: &Document, root: NodeId) -> BTreeSet<NodeId> {
        let mut current = BTreeSet::from([root]);
        for level in &self.levels {
            current = level.resolve(doc, &current);
            trace!(tag = %level.tag, matches = current.len(), "resolved selector level");
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

/// All elements below `root` matching `selector`.
///
/// The result is a set ordered by node id, which is document order. A selector
/// that does not parse or matches nothing yields an empty set.
pub fn query_selector_all(doc: &Document, root: NodeId, selector: &str) -> BTreeSet<NodeId> {
    match SelectorPath::parse(selector) {
        Some(path) => path.resolve(doc, root),
        None => {
            trace!(selector, "selector does not parse; matching nothing");
            BTreeSet::new()
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-')
}

/// Split a non-empty name off the front of `rest`.
fn take_name<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let (name, after) = rest.split_at(end);
    *rest = after;
    Some(name)
}

/// Drop one leading and one trailing quote character.
fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<svg>
  <g id="outer">
    <rect id="foo" width="1"/>
    <g class="inner">
      <rect id="bar" data-part="tail"/>
      <circle id="foo"/>
      <g><rect data-part="head"/></g>
    </g>
  </g>
  <rect id="loose"/>
</svg>"#;

    fn ids(doc: &Document, set: &BTreeSet<NodeId>) -> Vec<String> {
        set.iter()
            .map(|&n| doc.get_attribute(n, "id").unwrap_or("-").to_string())
            .collect()
    }

    fn query(selector: &str) -> Vec<String> {
        let doc = Document::parse_xml(DOC).unwrap();
        let found = query_selector_all(&doc, doc.root_element(), selector);
        ids(&doc, &found)
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(
            SelectorLevel::parse("rect"),
            Some(SelectorLevel {
                tag: "rect".into(),
                id: None,
                attribute: None,
            })
        );
        assert_eq!(
            SelectorLevel::parse("rect#foo[data-part='tail']"),
            Some(SelectorLevel {
                tag: "rect".into(),
                id: Some("foo".into()),
                attribute: Some(AttributePredicate {
                    name: "data-part".into(),
                    test: AttributeTest::Equals("tail".into()),
                }),
            })
        );
        assert_eq!(
            SelectorLevel::parse("svg:path[fill]").unwrap().attribute,
            Some(AttributePredicate {
                name: "fill".into(),
                test: AttributeTest::Exists,
            })
        );
    }

    #[test]
    fn test_invalid_levels() {
        for text in ["", "#foo", "[fill]", "rect#", "rect[", "rect[fill=]", "rect.cls", "*"] {
            assert_eq!(SelectorLevel::parse(text), None, "{text:?}");
        }
        assert_eq!(SelectorPath::parse("   "), None);
        assert_eq!(SelectorPath::parse("g #foo"), None);
    }

    #[test]
    fn test_tag_matches_any_depth() {
        assert_eq!(query("rect"), vec!["foo", "bar", "-", "loose"]);
        assert_eq!(query("g rect"), vec!["foo", "bar", "-"]);
        assert!(query("Rect").is_empty());
    }

    #[test]
    fn test_root_is_not_its_own_descendant() {
        assert!(query("svg").is_empty());
        assert!(query("svg rect").is_empty());
    }

    #[test]
    fn test_id_narrows_tag_matches() {
        assert_eq!(query("rect#foo"), vec!["foo"]);
        assert_eq!(query("circle#foo"), vec!["foo"]);
        assert!(query("rect#missing").is_empty());
    }

    #[test]
    fn test_attribute_predicates() {
        assert_eq!(query("rect[data-part=tail]"), vec!["bar"]);
        assert_eq!(query("rect[data-part]"), vec!["bar", "-"]);
        assert!(query("rect[data-part=undefined]").is_empty());
        assert_eq!(query("rect#bar[data-part=\"tail\"]"), vec!["bar"]);
    }

    #[test]
    fn test_descendant_levels_chain() {
        assert_eq!(query("g#outer g rect"), vec!["bar", "-"]);
        assert_eq!(query("g g g rect"), vec!["-"]);
        assert!(query("circle rect").is_empty());
        assert!(query("nope rect").is_empty());
    }

    #[test]
    fn test_matches_are_deduplicated() {
        // The nested rect is a descendant of three matching `g` elements.
        assert_eq!(query("g rect[data-part=head]"), vec!["-"]);
    }
}
