//! Message Catalog - Templated User-Facing Text
//!
//! Templates are keyed by message id and use `%{name}` placeholders.

use std::collections::BTreeMap;

pub const SANITISED_SVG_WARNING: &str = "txt.apps.admin.warning.sanitised_svg";
pub const DIRTY_SVG_ERROR: &str = "txt.apps.admin.error.app_build.dirty_svg";

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    (
        SANITISED_SVG_WARNING,
        "The markup in %{svg} has been edited for use in Zendesk, and may not display as intended.",
    ),
    (
        DIRTY_SVG_ERROR,
        "%{svg} contains invalid markup and could not be automatically regenerated.",
    ),
];

#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: BTreeMap<String, String>,
}

impl MessageCatalog {
    /// Catalog holding only the built-in English templates.
    pub fn new() -> Self {
        let templates = DEFAULT_MESSAGES
            .iter()
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect();
        Self { templates }
    }

    /// Built-in templates with `overrides` layered on top.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut catalog = Self::new();
        for (id, text) in overrides {
            catalog.templates.insert(id.clone(), text.clone());
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(String::as_str)
    }

    /// Render message `id`, replacing each `%{key}` with its value.
    pub fn translate(&self, id: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.get(id) else {
            tracing::warn!(message_id = id, "no template for message id");
            return format!("translation missing: {id}");
        };

        args.iter().fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("%{{{key}}}"), value)
        })
    }

    pub fn templates(&self) -> &BTreeMap<String, String> {
        &self.templates
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}
