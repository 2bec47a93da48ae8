use std::sync::Arc;

use minijinja::value::Value;
use minijinja::{context, Environment, ErrorKind, State};

use crate::error::Result;
use crate::tags::{TagAdapter, TagContext};

/// Block templates resolve as `<blocks_folder><component-slug>.html`.
const TEMPLATE_EXT: &str = ".html";

/// Registers the tags as minijinja functions: `{{ sb_blocks(value) }}` and
/// `{{ sb_richtext(value) }}`. Includes render live through the calling
/// state's environment, so templates added after registration are seen.
pub struct MiniJinjaTags<'e> {
    env: &'e mut Environment<'static>,
    context: Arc<TagContext>,
}

impl<'e> MiniJinjaTags<'e> {
    pub fn new(env: &'e mut Environment<'static>, context: Arc<TagContext>) -> Self {
        MiniJinjaTags { env, context }
    }
}

fn tag_error(tag: &str, error: crate::error::Error) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, format!("{tag} failed:\n{error}"))
}

fn render_include(state: &State, path: &str, block: &serde_json::Value) -> Result<String> {
    let template = state.env().get_template(&format!("{path}{TEMPLATE_EXT}"))?;
    let block = Value::from_serializable(block);
    Ok(template.render(context! { block })?)
}

fn json_argument(tag: &str, value: &Value) -> std::result::Result<serde_json::Value, minijinja::Error> {
    serde_json::to_value(value).map_err(|e| tag_error(tag, e.into()))
}

impl TagAdapter for MiniJinjaTags<'_> {
    fn register_block_tag(&mut self) -> Result<()> {
        let tags = self.context.clone();
        self.env.add_function("sb_blocks", move |state: &State, value: Value| {
            let value = json_argument("sb_blocks", &value)?;
            let output = tags
                .render_blocks(&value, &mut |path, block| render_include(state, path, block))
                .map_err(|e| tag_error("sb_blocks", e))?;

            Ok(Value::from_safe_string(output))
        });

        Ok(())
    }

    fn register_rich_text_tag(&mut self) -> Result<()> {
        let tags = self.context.clone();
        self.env.add_function("sb_richtext", move |state: &State, value: Value| {
            let value = json_argument("sb_richtext", &value)?;
            let output = tags.render_rich_text(&value, |document| {
                tags.render_document(document, &mut |path, block| {
                    render_include(state, path, block)
                })
            });

            Ok::<_, minijinja::Error>(Value::from_safe_string(output))
        });

        Ok(())
    }
}

impl_error_detail_with_std_error!(minijinja::Error);
