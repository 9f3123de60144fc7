//! Endpoint template model
//!
//! A parsed template is an ordered list of path components plus an ordered,
//! name-keyed list of query components.

use serde::Serialize;

/// One piece of an endpoint template.
///
/// Exactly one of `literal_text` / `variable_name` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateComponent {
    /// Fixed text (literal path segment or constant query value)
    pub literal_text: Option<String>,
    /// Name of the bound variable
    pub variable_name: Option<String>,
    /// Whether a binding must be supplied
    pub required: bool,
    /// Comma-split the bound value into repeated query parameters
    pub split: bool,
    /// Placeholder text shown to users; never sent on the wire
    pub default_value: Option<String>,
    /// Literal text glued after the bound value (e.g. `.json`)
    pub extension_suffix: Option<String>,
}

impl TemplateComponent {
    /// Create a literal component
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            literal_text: Some(text.into()),
            variable_name: None,
            required: true,
            split: false,
            default_value: None,
            extension_suffix: None,
        }
    }

    /// Create a required variable component
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            literal_text: None,
            variable_name: Some(name.into()),
            required: true,
            split: false,
            default_value: None,
            extension_suffix: None,
        }
    }

    /// Mark as optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the placeholder text (makes the variable optional)
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self.required = false;
        self
    }

    /// Mark as comma-split
    #[must_use]
    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }

    /// Attach a trailing literal suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.extension_suffix = Some(suffix.into());
        self
    }

    /// Check if this component is a variable
    pub fn is_variable(&self) -> bool {
        self.variable_name.is_some()
    }

    /// Check if this component is a literal
    pub fn is_literal(&self) -> bool {
        self.literal_text.is_some()
    }
}

/// Parsed endpoint template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointTemplate {
    /// Path components in order
    pub path: Vec<TemplateComponent>,
    /// Query components keyed by parameter name, in template order
    pub query: Vec<(String, TemplateComponent)>,
}

impl EndpointTemplate {
    /// Get the query component for a parameter name
    pub fn query_param(&self, name: &str) -> Option<&TemplateComponent> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, component)| component)
    }

    /// Parameter names of the query part, in template order
    pub fn query_names(&self) -> impl Iterator<Item = &str> {
        self.query.iter().map(|(key, _)| key.as_str())
    }

    /// All variable components (path first, then query)
    pub fn variables(&self) -> impl Iterator<Item = &TemplateComponent> {
        self.path
            .iter()
            .chain(self.query.iter().map(|(_, c)| c))
            .filter(|c| c.is_variable())
    }

    /// Names of variables that must be bound before rendering
    pub fn required_variables(&self) -> Vec<&str> {
        self.variables()
            .filter(|c| c.required)
            .filter_map(|c| c.variable_name.as_deref())
            .collect()
    }

    /// Insert or replace a query component
    pub(crate) fn set_query(&mut self, name: String, component: TemplateComponent) {
        if let Some(slot) = self.query.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = component;
        } else {
            self.query.push((name, component));
        }
    }
}

/// A template rendered against concrete bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedEndpoint {
    /// Unencoded path segments
    pub segments: Vec<String>,
    /// Query pairs in emission order (split parameters repeat their name)
    pub query: Vec<(String, String)>,
}
