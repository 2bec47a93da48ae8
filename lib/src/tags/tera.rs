use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tera::{Context, Function, Tera};

use crate::error::Result;
use crate::tags::{TagAdapter, TagContext};

/// Block templates resolve as `<blocks_folder><component-slug>.html`.
const TEMPLATE_EXT: &str = ".html";

/// Registers the tags as tera functions: `{{ sb_blocks(blocks=value) }}`
/// and `{{ sb_richtext(data=value) }}`.
///
/// A tera function cannot reach the engine it is registered on, so block
/// includes render against a snapshot of the engine. The snapshot is
/// refreshed after each registration; register the tags after the block
/// templates are loaded.
pub struct TeraTags<'e> {
    tera: &'e mut Tera,
    context: Arc<TagContext>,
    snapshot: Arc<RwLock<Option<Tera>>>,
}

impl<'e> TeraTags<'e> {
    pub fn new(tera: &'e mut Tera, context: Arc<TagContext>) -> Self {
        TeraTags {
            tera,
            context,
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    fn refresh(&mut self) {
        *self.snapshot.write() = Some(self.tera.clone());
    }
}

fn render_include(snapshot: &RwLock<Option<Tera>>, path: &str, block: &Value) -> Result<String> {
    let guard = snapshot.read();
    let Some(tera) = guard.as_ref() else {
        return err!("block tag invoked before registration finished");
    };

    let mut context = Context::new();
    context.insert("block", block);
    Ok(tera.render(&format!("{path}{TEMPLATE_EXT}"), &context)?)
}

struct BlockFunction {
    tags: Arc<TagContext>,
    snapshot: Arc<RwLock<Option<Tera>>>,
}

impl Function for BlockFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let value = args.get("blocks").cloned().unwrap_or(Value::Null);
        let output = self.tags
            .render_blocks(&value, &mut |path, block| {
                render_include(&self.snapshot, path, block)
            })
            .map_err(|e| tera::Error::msg(format!("sb_blocks failed:\n{e}")))?;

        Ok(Value::String(output))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

struct RichTextFunction {
    tags: Arc<TagContext>,
    snapshot: Arc<RwLock<Option<Tera>>>,
}

impl Function for RichTextFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let value = args.get("data").cloned().unwrap_or(Value::Null);
        let output = self.tags.render_rich_text(&value, |document| {
            self.tags.render_document(document, &mut |path, block| {
                render_include(&self.snapshot, path, block)
            })
        });

        Ok(Value::String(output))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

impl TagAdapter for TeraTags<'_> {
    fn register_block_tag(&mut self) -> Result<()> {
        self.tera.register_function("sb_blocks", BlockFunction {
            tags: self.context.clone(),
            snapshot: self.snapshot.clone(),
        });

        self.refresh();
        Ok(())
    }

    fn register_rich_text_tag(&mut self) -> Result<()> {
        self.tera.register_function("sb_richtext", RichTextFunction {
            tags: self.context.clone(),
            snapshot: self.snapshot.clone(),
        });

        self.refresh();
        Ok(())
    }
}

impl_error_detail_with_std_error!(tera::Error);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn engine() -> Tera {
        let mut tera = Tera::default();
        tera.add_raw_template("blocks/hero-block.html", "<h1>{{ block.title }}</h1>").unwrap();
        tera.add_raw_template("blocks/cta.html", "<a>{{ block.label }}</a>").unwrap();
        tera.add_raw_template("page.html", "{{ sb_blocks(blocks=body) }}").unwrap();
        tera.add_raw_template("rich.html", "{{ sb_richtext(data=doc) }}").unwrap();

        let context = Arc::new(TagContext::new("blocks/"));
        TeraTags::new(&mut tera, context).register().unwrap();
        tera
    }

    #[test]
    fn renders_blocks_in_order() {
        let tera = engine();
        let mut context = Context::new();
        context.insert("body", &json!([
            { "component": "Hero Block", "title": "Hi" },
            { "component": "cta", "label": "Go" },
        ]));

        assert_eq!(tera.render("page.html", &context).unwrap(), "<h1>Hi</h1><a>Go</a>");
    }

    #[test]
    fn single_block_descriptor() {
        let tera = engine();
        let mut context = Context::new();
        context.insert("body", &json!({ "component": "cta", "label": "Go" }));

        assert_eq!(tera.render("page.html", &context).unwrap(), "<a>Go</a>");
    }

    #[test]
    fn non_array_value_renders_empty() {
        let tera = engine();
        let mut context = Context::new();
        context.insert("body", &json!("junk"));

        assert_eq!(tera.render("page.html", &context).unwrap(), "");
    }

    #[test]
    fn rich_text_with_embedded_block() {
        let tera = engine();
        let mut context = Context::new();
        context.insert("doc", &json!({
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "intro" }] },
                { "type": "blok", "attrs": { "body": [
                    { "component": "cta", "label": "Go" },
                ]}},
            ],
        }));

        assert_eq!(tera.render("rich.html", &context).unwrap(), "<p>intro</p><a>Go</a>");
    }

    #[test]
    fn rich_text_string_passes_through_unescaped() {
        let tera = engine();
        let mut context = Context::new();
        context.insert("doc", &json!("<p>legacy</p>"));

        assert_eq!(tera.render("rich.html", &context).unwrap(), "<p>legacy</p>");
    }

    #[test]
    fn malformed_rich_text_renders_empty() {
        let tera = engine();
        let mut context = Context::new();
        context.insert("doc", &json!({ "content": 42 }));

        assert_eq!(tera.render("rich.html", &context).unwrap(), "");
    }
}
