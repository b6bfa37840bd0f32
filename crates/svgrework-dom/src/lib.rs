//! # SVG Rework DOM
//!
//! XML element tree for the svgrework transform.
//! Uses quick-xml for reading and writing markup and keeps the parsed nodes in an
//! arena addressed by [`NodeId`].
//!
//! ## Design Goals
//!
//! 1. **Faithful serialization**: untouched text, comments and prolog nodes are
//!    written back as they were read
//! 2. **Arena tree**: nodes live in one `Vec`, ids are cheap to copy, hash and order
//! 3. **Query support**: descendant lookup by tag name or attribute, walked
//!    with an explicit stack so nesting depth is not limited by the call stack
//! 4. **Mutation support**: attribute writes on elements

use quick_xml::events::{
    BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event,
};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in DOM operations.
#[derive(Error, Debug)]
pub enum DomError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Node not found")]
    NodeNotFound,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Unique identifier for a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Type of DOM node.
///
/// Text-like payloads are stored in their escaped source form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Element {
        tag_name: String,
        /// Attribute name/value pairs in source order. Names are unique;
        /// values are unescaped.
        attributes: Vec<(String, String)>,
        /// Written as `<tag/>` while the element has no children.
        self_closing: bool,
    },
    Text(String),
    CData(String),
    Comment(String),
    /// `<?target data?>`, content between the delimiters.
    ProcessingInstruction(String),
    /// `<?xml ...?>`, content between the delimiters.
    Declaration(String),
    DocumentType(String),
}

/// A DOM node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique ID for this node.
    pub id: NodeId,
    /// Node type and associated data.
    pub node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Get the tag name for element nodes.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        match &self.node_type {
            NodeType::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Check if this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element { .. })
    }

    /// Get the parent node.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Get child nodes.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    /// Prolog, root element and trailing misc nodes, in source order.
    top_level: Vec<NodeId>,
    root: NodeId,
}

impl Document {
    /// Parse XML markup into a document.
    pub fn parse_xml(xml: &str) -> Result<Self, DomError> {
        debug!(len = xml.len(), "Parsing XML");

        let mut reader = Reader::from_str(xml);
        let mut builder = TreeBuilder::default();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                DomError::ParseError(format!("{} at byte {}", e, reader.buffer_position()))
            })?;
            let parent = open.last().copied();

            match event {
                Event::Start(e) => {
                    let node_type = element_from_start(&e, false)?;
                    let id = builder.push(node_type, parent);
                    open.push(id);
                }
                Event::Empty(e) => {
                    let node_type = element_from_start(&e, true)?;
                    builder.push(node_type, parent);
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(e) => builder.push_text(utf8(&e)?, parent),
                Event::GeneralRef(e) => {
                    let reference = format!("&{};", utf8(&e)?);
                    builder.push_text(&reference, parent);
                }
                Event::CData(e) => {
                    builder.push(NodeType::CData(utf8(&e)?.to_string()), parent);
                }
                Event::Comment(e) => {
                    builder.push(NodeType::Comment(utf8(&e)?.to_string()), parent);
                }
                Event::Decl(e) => {
                    builder.push(NodeType::Declaration(utf8(&e)?.to_string()), parent);
                }
                Event::PI(e) => {
                    builder.push(NodeType::ProcessingInstruction(utf8(&e)?.to_string()), parent);
                }
                Event::DocType(e) => {
                    let doctype = utf8(&e)?.trim_start().to_string();
                    builder.push(NodeType::DocumentType(doctype), parent);
                }
                Event::Eof => break,
            }
        }

        if let Some(&unclosed) = open.last() {
            let tag = builder.nodes[unclosed.0].tag_name().unwrap_or_default();
            return Err(DomError::ParseError(format!("Unclosed element <{tag}>")));
        }

        let doc = builder.finish()?;
        debug!(node_count = doc.nodes.len(), "XML parsed");
        Ok(doc)
    }

    /// Get the root element.
    pub fn root_element(&self) -> NodeId {
        self.root
    }

    /// Get node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get the tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)?.tag_name()
    }

    /// Get an attribute value of an element.
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get_node(id)?.get_attribute(name)
    }

    /// Set an attribute, overwriting an existing value in place or appending a
    /// new attribute after the existing ones.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let node = self.nodes.get_mut(id.0).ok_or(DomError::NodeNotFound)?;
        let NodeType::Element { attributes, .. } = &mut node.node_type else {
            return Err(DomError::InvalidOperation(format!(
                "cannot set attribute `{name}` on a non-element node"
            )));
        };

        let value = value.into();
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((name.to_string(), value)),
        }
        Ok(())
    }

    /// Get child nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_node(id).map(Node::children).unwrap_or_default()
    }

    /// All descendant elements of `id` in document order, not including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut |_| true, &mut out);
        out
    }

    /// Descendant elements of `id` whose tag name equals `tag_name` exactly.
    pub fn find_descendants_by_tag_name(&self, id: NodeId, tag_name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut |node| node.tag_name() == Some(tag_name), &mut out);
        out
    }

    /// Descendant elements of `id` carrying attribute `name`.
    ///
    /// With `Some(value)` the attribute must equal `value`; with `None` any
    /// value matches.
    pub fn find_descendants_with_attribute(
        &self,
        id: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(
            id,
            &mut |node| match (node.get_attribute(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
            &mut out,
        );
        out
    }

    /// Pre-order walk below `id`, collecting the elements `filter` accepts.
    fn collect_descendants<F>(&self, id: NodeId, filter: &mut F, out: &mut Vec<NodeId>)
    where
        F: FnMut(&Node) -> bool,
    {
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if !node.is_element() {
                continue;
            }
            if filter(node) {
                out.push(current);
            }
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Serialize the document back to markup.
    pub fn serialize(&self) -> Result<String, DomError> {
        let mut writer = Writer::new(Vec::new());
        let mut stack: Vec<WriteStep> = self
            .top_level
            .iter()
            .rev()
            .map(|&id| WriteStep::Open(id))
            .collect();

        while let Some(step) = stack.pop() {
            match step {
                WriteStep::Open(id) => self.write_open(&mut writer, id, &mut stack)?,
                WriteStep::Close(id) => {
                    let tag_name = self.tag_name(id).unwrap_or_default();
                    write_event(&mut writer, Event::End(BytesEnd::new(tag_name)))?;
                }
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| DomError::SerializeError(e.to_string()))
    }

    /// Write a node, or the start tag of an element whose children and end
    /// tag are scheduled on `stack`.
    fn write_open(
        &self,
        writer: &mut Writer<Vec<u8>>,
        id: NodeId,
        stack: &mut Vec<WriteStep>,
    ) -> Result<(), DomError> {
        let node = &self.nodes[id.0];
        match &node.node_type {
            NodeType::Element {
                tag_name,
                attributes,
                self_closing,
            } => {
                let mut start = BytesStart::new(tag_name.as_str());
                for (name, value) in attributes {
                    start.push_attribute((name.as_str(), value.as_str()));
                }
                if *self_closing && node.children.is_empty() {
                    write_event(writer, Event::Empty(start))?;
                } else {
                    write_event(writer, Event::Start(start))?;
                    stack.push(WriteStep::Close(id));
                    stack.extend(node.children.iter().rev().map(|&child| WriteStep::Open(child)));
                }
            }
            NodeType::Text(raw) => {
                write_event(writer, Event::Text(BytesText::from_escaped(raw.as_str())))?
            }
            NodeType::CData(text) => write_event(writer, Event::CData(BytesCData::new(text.as_str())))?,
            NodeType::Comment(raw) => {
                write_event(writer, Event::Comment(BytesText::from_escaped(raw.as_str())))?
            }
            NodeType::ProcessingInstruction(raw) => {
                write_event(writer, Event::PI(BytesPI::new(raw.as_str())))?
            }
            NodeType::Declaration(raw) => {
                let decl = BytesDecl::from_start(BytesStart::from_content(raw.as_str(), 3));
                write_event(writer, Event::Decl(decl))?
            }
            NodeType::DocumentType(raw) => {
                write_event(writer, Event::DocType(BytesText::from_escaped(raw.as_str())))?
            }
        }
        Ok(())
    }
}

enum WriteStep {
    Open(NodeId),
    Close(NodeId),
}

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<Node>,
    top_level: Vec<NodeId>,
}

impl TreeBuilder {
    fn push(&mut self, node_type: NodeType, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            id,
            node_type,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.top_level.push(id),
        }
        id
    }

    /// Append raw text, merging with a directly preceding text node so that
    /// entity references stay inside their surrounding text.
    fn push_text(&mut self, raw: &str, parent: Option<NodeId>) {
        let siblings = match parent {
            Some(parent) => &self.nodes[parent.0].children,
            None => &self.top_level,
        };
        if let Some(&last) = siblings.last() {
            if let NodeType::Text(existing) = &mut self.nodes[last.0].node_type {
                existing.push_str(raw);
                return;
            }
        }
        self.push(NodeType::Text(raw.to_string()), parent);
    }

    fn finish(self) -> Result<Document, DomError> {
        let mut roots = self
            .top_level
            .iter()
            .copied()
            .filter(|id| self.nodes[id.0].is_element());
        let root = roots
            .next()
            .ok_or_else(|| DomError::ParseError("No root element".into()))?;
        if roots.next().is_some() {
            return Err(DomError::ParseError("Multiple root elements".into()));
        }

        Ok(Document {
            nodes: self.nodes,
            top_level: self.top_level,
            root,
        })
    }
}

fn element_from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<NodeType, DomError> {
    let tag_name = utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DomError::ParseError(format!("<{tag_name}>: {e}")))?;
        let name = utf8(attr.key.as_ref())?.to_string();
        let value = quick_xml::escape::unescape(utf8(&attr.value)?)
            .map_err(|e| DomError::ParseError(format!("<{tag_name} {name}>: {e}")))?
            .into_owned();
        attributes.push((name, value));
    }

    Ok(NodeType::Element {
        tag_name,
        attributes,
        self_closing,
    })
}

fn utf8(bytes: &[u8]) -> Result<&str, DomError> {
    std::str::from_utf8(bytes).map_err(|e| DomError::ParseError(e.to_string()))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DomError> {
    writer
        .write_event(event)
        .map_err(|e| DomError::SerializeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- icon -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <g id="layer">
    <rect id="bg" width="10" height="10"/>
    <g>
      <rect class="dot" width="2" height="2"></rect>
    </g>
    <text>a &amp; b</text>
  </g>
</svg>
"#;

    #[test]
    fn test_parse_simple_svg() {
        let doc = Document::parse_xml(ICON).unwrap();
        let root = doc.root_element();
        assert_eq!(doc.tag_name(root), Some("svg"));
        assert_eq!(doc.get_attribute(root, "viewBox"), Some("0 0 10 10"));
        assert!(doc.get_node(root).unwrap().parent().is_none());
    }

    #[test]
    fn test_serialize_is_byte_faithful() {
        let doc = Document::parse_xml(ICON).unwrap();
        assert_eq!(doc.serialize().unwrap(), ICON);
    }

    #[test]
    fn test_find_descendants_by_tag_name() {
        let doc = Document::parse_xml(ICON).unwrap();
        let root = doc.root_element();

        let rects = doc.find_descendants_by_tag_name(root, "rect");
        assert_eq!(rects.len(), 2);
        assert_eq!(doc.get_attribute(rects[0], "id"), Some("bg"));
        assert_eq!(doc.get_attribute(rects[1], "class"), Some("dot"));

        // The search excludes the starting element itself.
        assert!(doc.find_descendants_by_tag_name(root, "svg").is_empty());
        assert!(doc.find_descendants_by_tag_name(root, "RECT").is_empty());
    }

    #[test]
    fn test_find_descendants_with_attribute() {
        let doc = Document::parse_xml(ICON).unwrap();
        let root = doc.root_element();

        let with_id = doc.find_descendants_with_attribute(root, "id", None);
        assert_eq!(with_id.len(), 2);

        let bg = doc.find_descendants_with_attribute(root, "id", Some("bg"));
        assert_eq!(bg.len(), 1);
        assert_eq!(doc.tag_name(bg[0]), Some("rect"));

        assert!(doc
            .find_descendants_with_attribute(root, "id", Some("missing"))
            .is_empty());
    }

    #[test]
    fn test_set_attribute_overwrites_in_place_and_appends() {
        let mut doc = Document::parse_xml(r#"<svg><rect fill="red" width="1"/></svg>"#).unwrap();
        let rect = doc.descendants(doc.root_element())[0];

        doc.set_attribute(rect, "fill", "blue").unwrap();
        doc.set_attribute(rect, "stroke", "a\"b").unwrap();

        assert_eq!(
            doc.serialize().unwrap(),
            r#"<svg><rect fill="blue" width="1" stroke="a&quot;b"/></svg>"#
        );
    }

    #[test]
    fn test_set_attribute_on_text_is_invalid() {
        let mut doc = Document::parse_xml("<svg>text</svg>").unwrap();
        let text = doc.children(doc.root_element())[0];
        assert!(matches!(
            doc.set_attribute(text, "fill", "red"),
            Err(DomError::InvalidOperation(_))
        ));
        assert!(matches!(
            doc.set_attribute(NodeId::new(99), "fill", "red"),
            Err(DomError::NodeNotFound)
        ));
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let doc = Document::parse_xml(r#"<svg><g data-x="a &amp; b"/></svg>"#).unwrap();
        let g = doc.descendants(doc.root_element())[0];
        assert_eq!(doc.get_attribute(g, "data-x"), Some("a & b"));
    }

    #[test]
    fn test_cdata_and_processing_instructions_survive() {
        let xml = "<?xml-stylesheet href=\"a.css\"?><svg><style><![CDATA[rect { fill: red }]]></style></svg>";
        let doc = Document::parse_xml(xml).unwrap();
        assert_eq!(doc.serialize().unwrap(), xml);
    }

    #[test]
    fn test_malformed_markup_is_error() {
        assert!(matches!(
            Document::parse_xml("<svg><g></svg>"),
            Err(DomError::ParseError(_))
        ));
        assert!(matches!(
            Document::parse_xml("<svg><g>"),
            Err(DomError::ParseError(_))
        ));
        assert!(matches!(
            Document::parse_xml("just text"),
            Err(DomError::ParseError(_))
        ));
    }

    #[test]
    fn test_deep_nesting_does_not_exhaust_the_stack() {
        const DEPTH: usize = 50_000;
        let xml = format!("<svg>{}<rect/>{}</svg>", "<g>".repeat(DEPTH), "</g>".repeat(DEPTH));

        let doc = Document::parse_xml(&xml).unwrap();
        let root = doc.root_element();

        assert_eq!(doc.find_descendants_by_tag_name(root, "g").len(), DEPTH);
        let rect = doc.find_descendants_by_tag_name(root, "rect");
        assert_eq!(rect.len(), 1);
        assert_eq!(doc.descendants(root).len(), DEPTH + 1);
        assert_eq!(doc.serialize().unwrap(), xml);
    }
}
