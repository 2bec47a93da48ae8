//! The `sb_blocks` and `sb_richtext` template tags.
//!
//! The algorithms here are engine-agnostic; an adapter per engine family
//! (one module per engine, feature-gated) registers them and supplies the
//! engine's way of rendering a template by path. Adapters share one
//! [`TagContext`], built once at registration time.

#[cfg(feature = "minijinja")]
pub mod minijinja;
#[cfg(feature = "tera")]
pub mod tera;

use serde_json::Value;

use crate::error::Result;
use crate::richtext::Renderer;
use crate::util::slugify;

/// Renders a block template by path with the descriptor bound as `block`.
pub type RenderInclude<'a> = dyn FnMut(&str, &Value) -> Result<String> + 'a;

/// Shared state for the tags of one engine: where block templates live.
#[derive(Debug, Clone)]
pub struct TagContext {
    blocks_folder: String,
}

impl TagContext {
    /// A leading `/` on the folder is stripped; an empty value falls back
    /// to `blocks/`. The folder is used as a verbatim prefix, so it should
    /// end with `/` unless block templates share a name prefix instead.
    pub fn new(blocks_folder: &str) -> Self {
        let folder = blocks_folder.trim_start_matches('/');
        TagContext {
            blocks_folder: match folder.is_empty() {
                true => "blocks/".into(),
                false => folder.into(),
            },
        }
    }

    pub fn blocks_folder(&self) -> &str {
        &self.blocks_folder
    }

    /// The template path for a component: folder prefix plus slug.
    pub fn template_path(&self, component: &str) -> String {
        format!("{}{}", self.blocks_folder, slugify(component))
    }

    /// Expand block descriptors into concatenated markup.
    ///
    /// `value` may be one descriptor, an array of them, or anything else
    /// (which renders as empty output, not an error). Descriptors render
    /// in input order and concatenate in input order; each is passed to
    /// `render` with its `component` field already slugified. A descriptor
    /// without a `component` renders nothing.
    pub fn render_blocks(&self, value: &Value, render: &mut RenderInclude<'_>) -> Result<String> {
        let blocks = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(_) => std::slice::from_ref(value),
            _ => return Ok(String::new()),
        };

        let mut output = String::new();
        for block in blocks {
            let Some(component) = block.get("component").and_then(Value::as_str) else {
                continue;
            };

            let path = self.template_path(component);
            let mut block = block.clone();
            block["component"] = Value::String(slugify(component));
            output.push_str(&render(&path, &block)?);
        }

        Ok(output)
    }

    /// Expand a rich-text value into markup.
    ///
    /// A plain string passes through unchanged (fields that used to be
    /// textareas); null or absent renders empty; a document with a
    /// `content` array is handed to `render_document`, and any failure in
    /// there is swallowed into empty output.
    pub fn render_rich_text<R>(&self, value: &Value, render_document: R) -> String
        where R: FnOnce(&Value) -> Result<String>
    {
        match value {
            Value::String(text) => text.clone(),
            Value::Object(map) if map.get("content").is_some_and(Value::is_array) => {
                render_document(value).unwrap_or_default()
            }
            _ => String::new(),
        }
    }

    /// The rich-text document renderer wired so embedded `blok` nodes
    /// route back through [`TagContext::render_blocks`].
    pub fn render_document(&self, document: &Value, render: &mut RenderInclude<'_>) -> Result<String> {
        let render = std::cell::RefCell::new(render);
        let resolver = |_component: &str, body: &Value| {
            self.render_blocks(body, &mut **render.borrow_mut())
        };

        Renderer::with_component_resolver(&resolver).render(document)
    }
}

/// One implementation per supported template engine family. The adapters
/// differ only in how tags are registered and how "render this template
/// path" is invoked; the expansion logic lives in [`TagContext`].
pub trait TagAdapter {
    fn register_block_tag(&mut self) -> Result<()>;
    fn register_rich_text_tag(&mut self) -> Result<()>;

    fn register(&mut self) -> Result<()> {
        self.register_block_tag()?;
        self.register_rich_text_tag()
    }
}
