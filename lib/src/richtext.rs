//! Rendering for the structured rich-text document format.
//!
//! A document is a tree of typed nodes with a root `content` array. The
//! [`Renderer`] walks the tree and emits HTML; documents are read-only and
//! never mutated. Embedded component nodes (`blok`) are delegated to an
//! optional component resolver so they can be expanded through the same
//! path as the block tag (see [`crate::tags`]).

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub content: Vec<Node>,
    #[serde(default)]
    pub marks: Vec<Mark>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attrs: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    Text,
    Blockquote,
    OrderedList,
    BulletList,
    ListItem,
    HorizontalRule,
    HardBreak,
    Image,
    CodeBlock,
    Blok,
    Unknown,
}

impl From<&str> for NodeKind {
    fn from(name: &str) -> Self {
        match name {
            "doc" => NodeKind::Doc,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "text" => NodeKind::Text,
            "blockquote" => NodeKind::Blockquote,
            "ordered_list" => NodeKind::OrderedList,
            "bullet_list" => NodeKind::BulletList,
            "list_item" => NodeKind::ListItem,
            "horizontal_rule" => NodeKind::HorizontalRule,
            "hard_break" => NodeKind::HardBreak,
            "image" => NodeKind::Image,
            "code_block" => NodeKind::CodeBlock,
            "blok" => NodeKind::Blok,
            _ => NodeKind::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(NodeKind::from(&*name))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkKind,
    #[serde(default)]
    pub attrs: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Bold,
    Italic,
    Strike,
    Underline,
    Code,
    Link,
    Styled,
    Unknown,
}

impl From<&str> for MarkKind {
    fn from(name: &str) -> Self {
        match name {
            "bold" => MarkKind::Bold,
            "italic" => MarkKind::Italic,
            "strike" => MarkKind::Strike,
            "underline" => MarkKind::Underline,
            "code" => MarkKind::Code,
            "link" => MarkKind::Link,
            "styled" => MarkKind::Styled,
            _ => MarkKind::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for MarkKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(MarkKind::from(&*name))
    }
}

/// Expands an embedded component into markup: called with the component
/// name and the full descriptor of each `blok` body entry.
pub type ComponentResolver<'a> = dyn Fn(&str, &Value) -> Result<String> + 'a;

#[derive(Default)]
pub struct Renderer<'a> {
    component: Option<&'a ComponentResolver<'a>>,
}

impl<'a> Renderer<'a> {
    pub fn new() -> Self {
        Renderer::default()
    }

    pub fn with_component_resolver(resolver: &'a ComponentResolver<'a>) -> Self {
        Renderer { component: Some(resolver) }
    }

    /// Render a document to markup. Fails on a malformed document or a
    /// failed component expansion; callers that must not propagate render
    /// failures (the tags) collapse the error to empty output.
    pub fn render(&self, document: &Value) -> Result<String> {
        let document: Document = serde_json::from_value(document.clone())?;
        let mut output = String::new();
        for node in &document.content {
            self.node(node, &mut output)?;
        }

        Ok(output)
    }

    fn node(&self, node: &Node, out: &mut String) -> Result<()> {
        match node.kind {
            NodeKind::Doc => self.children(node, out)?,
            NodeKind::Paragraph => self.wrap(node, "p", out)?,
            NodeKind::Blockquote => self.wrap(node, "blockquote", out)?,
            NodeKind::OrderedList => self.wrap(node, "ol", out)?,
            NodeKind::BulletList => self.wrap(node, "ul", out)?,
            NodeKind::ListItem => self.wrap(node, "li", out)?,
            NodeKind::HorizontalRule => out.push_str("<hr />"),
            NodeKind::HardBreak => out.push_str("<br />"),
            NodeKind::Heading => {
                let level = node.attrs.get("level")
                    .and_then(Value::as_u64)
                    .filter(|level| (1..=6).contains(level))
                    .unwrap_or(1);

                out.push_str(&format!("<h{level}>"));
                self.children(node, out)?;
                out.push_str(&format!("</h{level}>"));
            }
            NodeKind::Text => self.text(node, out),
            NodeKind::Image => {
                out.push_str("<img");
                for attr in ["src", "alt", "title"] {
                    if let Some(value) = node.attrs.get(attr).and_then(Value::as_str) {
                        out.push_str(&format!(" {attr}=\"{}\"", escape(value)));
                    }
                }

                out.push_str(" />");
            }
            NodeKind::CodeBlock => {
                out.push_str("<pre><code");
                if let Some(class) = node.attrs.get("class").and_then(Value::as_str) {
                    out.push_str(&format!(" class=\"{}\"", escape(class)));
                }

                out.push('>');
                self.children(node, out)?;
                out.push_str("</code></pre>");
            }
            NodeKind::Blok => {
                let Some(resolver) = self.component else {
                    return Ok(());
                };

                let bodies = node.attrs.get("body")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                for body in bodies {
                    let Some(component) = body.get("component").and_then(Value::as_str) else {
                        continue;
                    };

                    out.push_str(&resolver(component, body)?);
                }
            }
            NodeKind::Unknown => { }
        }

        Ok(())
    }

    fn children(&self, node: &Node, out: &mut String) -> Result<()> {
        for child in &node.content {
            self.node(child, out)?;
        }

        Ok(())
    }

    fn wrap(&self, node: &Node, tag: &str, out: &mut String) -> Result<()> {
        out.push_str(&format!("<{tag}>"));
        self.children(node, out)?;
        out.push_str(&format!("</{tag}>"));
        Ok(())
    }

    /// Marks wrap the escaped text outside-in: the first mark is the
    /// outermost element.
    fn text(&self, node: &Node, out: &mut String) {
        let mut close = vec![];
        for mark in &node.marks {
            let tag: &str = match mark.kind {
                MarkKind::Bold => "b",
                MarkKind::Italic => "i",
                MarkKind::Strike => "strike",
                MarkKind::Underline => "u",
                MarkKind::Code => "code",
                MarkKind::Link => {
                    let mut href = mark.attrs.get("href")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();

                    if mark.attrs.get("linktype").and_then(Value::as_str) == Some("email") {
                        href = format!("mailto:{href}");
                    }

                    if let Some(anchor) = mark.attrs.get("anchor").and_then(Value::as_str) {
                        href = format!("{href}#{anchor}");
                    }

                    out.push_str(&format!("<a href=\"{}\"", escape(&href)));
                    if let Some(target) = mark.attrs.get("target").and_then(Value::as_str) {
                        out.push_str(&format!(" target=\"{}\"", escape(target)));
                    }

                    out.push('>');
                    close.push("a");
                    continue;
                }
                MarkKind::Styled => {
                    let class = mark.attrs.get("class")
                        .and_then(Value::as_str)
                        .unwrap_or_default();

                    out.push_str(&format!("<span class=\"{}\">", escape(class)));
                    close.push("span");
                    continue;
                }
                MarkKind::Unknown => continue,
            };

            out.push_str(&format!("<{tag}>"));
            close.push(tag);
        }

        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }

        for tag in close.into_iter().rev() {
            out.push_str(&format!("</{tag}>"));
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }

    escaped
}
