//! Rendering and re-serialization of parsed templates

use super::types::{EndpointTemplate, RenderedEndpoint, TemplateComponent};
use crate::error::{Error, Result};
use crate::types::StringMap;
use std::fmt;
use url::Url;

impl EndpointTemplate {
    /// Render the template against variable bindings.
    ///
    /// Empty bindings count as unbound. Unbound optional path variables drop
    /// their segment, unbound optional query variables drop the parameter.
    pub fn render(&self, bindings: &StringMap) -> Result<RenderedEndpoint> {
        let mut rendered = RenderedEndpoint::default();

        for component in &self.path {
            if let Some(value) = resolve(component, bindings)? {
                rendered.segments.push(value);
            }
        }

        for (name, component) in &self.query {
            let Some(value) = resolve(component, bindings)? else {
                continue;
            };
            if component.split {
                let suffix = component.extension_suffix.as_deref().unwrap_or_default();
                let raw = value.strip_suffix(suffix).unwrap_or(&value);
                for piece in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    rendered.query.push((name.clone(), format!("{piece}{suffix}")));
                }
            } else {
                rendered.query.push((name.clone(), value));
            }
        }

        Ok(rendered)
    }
}

/// Value of a component under the bindings, `None` when it is skipped
fn resolve(component: &TemplateComponent, bindings: &StringMap) -> Result<Option<String>> {
    if let Some(literal) = &component.literal_text {
        return Ok(Some(literal.clone()));
    }

    let name = component.variable_name.as_deref().unwrap_or_default();
    match bindings.get(name).filter(|v| !v.is_empty()) {
        Some(value) => {
            let suffix = component.extension_suffix.as_deref().unwrap_or_default();
            Ok(Some(format!("{value}{suffix}")))
        }
        None if component.required => Err(Error::undefined_var(name)),
        None => Ok(None),
    }
}

impl RenderedEndpoint {
    /// Append the rendered path to a base URL.
    ///
    /// Segments are percent-encoded; query pairs are left to the request so
    /// pagination can add its own parameters.
    pub fn join_url(&self, base_url: &str) -> Result<Url> {
        let mut url = Url::parse(base_url)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::invalid_value("base_url", "URL cannot be a base"))?;
            path.pop_if_empty();
            path.extend(self.segments.iter());
        }
        Ok(url)
    }
}

// ============================================================================
// Serialization back to the template grammar
// ============================================================================

const PATH_RESERVED: &[char] = &['{', '}', '/', '?', '\\'];
const QUERY_RESERVED: &[char] = &['{', '}', '&', '=', '\\'];
const NAME_RESERVED: &[char] = &['{', '}', '?', ',', ':', '\\'];
const DEFAULT_RESERVED: &[char] = &['{', '}', '\\'];

fn escape(text: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if reserved.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn write_component(
    f: &mut fmt::Formatter<'_>,
    component: &TemplateComponent,
    reserved: &[char],
) -> fmt::Result {
    if let Some(literal) = &component.literal_text {
        return f.write_str(&escape(literal, reserved));
    }

    let name = component.variable_name.as_deref().unwrap_or_default();
    write!(f, "{{{}", escape(name, NAME_RESERVED))?;
    if !component.required {
        f.write_str("?")?;
    }
    let default_splits = component
        .default_value
        .as_deref()
        .is_some_and(|d| d.contains(','));
    if component.split && !default_splits {
        f.write_str(",")?;
    }
    if let Some(default) = &component.default_value {
        write!(f, ":{}", escape(default, DEFAULT_RESERVED))?;
    }
    f.write_str("}")?;
    if let Some(suffix) = &component.extension_suffix {
        f.write_str(&escape(suffix, reserved))?;
    }
    Ok(())
}

impl fmt::Display for EndpointTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, component) in self.path.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write_component(f, component, PATH_RESERVED)?;
        }

        for (idx, (name, component)) in self.query.iter().enumerate() {
            f.write_str(if idx == 0 { "?" } else { "&" })?;
            write!(f, "{}=", escape(name, QUERY_RESERVED))?;
            write_component(f, component, QUERY_RESERVED)?;
        }

        Ok(())
    }
}
