//! Resource registry: static URIs and `{placeholder}` templates.
//!
//! Templates compile to a regex capturing each placeholder as `[^/]+`.
//! A URI that exactly matches a static resource always wins over a
//! template that would also match it; among templates the first
//! registered wins. Captures are not percent-decoded.

use crate::param::{coerce, ParamSpec, ToolArgs};
use crate::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// Immutable descriptor for a registered resource.
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    /// Exact URI, or a template containing `{name}` placeholders.
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: Option<String>,
    /// Optional coercion specs for placeholders, matched by name.
    pub params: Vec<ParamSpec>,
}

impl ResourceSpec {
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: None,
            params: Vec::new(),
        }
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn is_template(&self) -> bool {
        self.uri.contains('{')
    }

    fn definition(&self) -> Value {
        let key = if self.is_template() { "uriTemplate" } else { "uri" };
        let mut obj = Map::new();
        obj.insert(key.to_string(), Value::from(self.uri.clone()));
        obj.insert("name".to_string(), Value::from(self.name.clone()));
        if !self.description.is_empty() {
            obj.insert("description".to_string(), Value::from(self.description.clone()));
        }
        if let Some(mime) = &self.mime_type {
            obj.insert("mimeType".to_string(), Value::from(mime.clone()));
        }
        Value::Object(obj)
    }
}

/// Content returned by a resource read.
#[derive(Debug, Clone)]
pub struct ResourceContent {
    pub mime_type: Option<String>,
    pub body: ResourceBody,
}

#[derive(Debug, Clone)]
pub enum ResourceBody {
    Text(String),
    /// Pre-encoded base64 payload.
    Blob(String),
}

impl ResourceContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            mime_type: None,
            body: ResourceBody::Text(text.into()),
        }
    }

    /// Compact JSON text with an `application/json` MIME type.
    pub fn json(value: &Value) -> Self {
        Self {
            mime_type: Some("application/json".to_string()),
            body: ResourceBody::Text(value.to_string()),
        }
    }

    pub fn blob(blob: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime_type.into()),
            body: ResourceBody::Blob(blob.into()),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Resource read callback. `params` holds the coerced placeholder values;
/// it is empty for static URIs.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str, params: ToolArgs) -> Result<ResourceContent>;
}

struct StaticEntry {
    spec: ResourceSpec,
    handler: Arc<dyn ResourceHandler>,
}

struct TemplateEntry {
    spec: ResourceSpec,
    pattern: Regex,
    placeholders: Vec<String>,
    handler: Arc<dyn ResourceHandler>,
}

impl TemplateEntry {
    fn extract(&self, uri: &str) -> Option<Vec<(String, String)>> {
        let captures = self.pattern.captures(uri)?;
        let mut values = Vec::with_capacity(self.placeholders.len());
        for (i, name) in self.placeholders.iter().enumerate() {
            values.push((name.clone(), captures.get(i + 1)?.as_str().to_string()));
        }
        Some(values)
    }
}

#[derive(Default)]
struct Inner {
    statics: FxHashMap<String, Arc<StaticEntry>>,
    templates: Vec<Arc<TemplateEntry>>,
}

/// Registry of resources, matched by exact URI or template.
pub struct ResourceRegistry {
    inner: Mutex<Inner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register a resource. Returns Ok(false) when the URI is already
    /// taken (first registration wins).
    pub fn register(&self, spec: ResourceSpec, handler: Arc<dyn ResourceHandler>) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if spec.is_template() {
            let (pattern, placeholders) = compile_uri_template(&spec.uri)?;
            if inner
                .templates
                .iter()
                .any(|t| t.spec.uri == spec.uri || t.pattern.as_str() == pattern.as_str())
            {
                tracing::warn!(uri = %spec.uri, "duplicate or overlapping resource template skipped");
                return Ok(false);
            }
            inner.templates.push(Arc::new(TemplateEntry {
                spec,
                pattern,
                placeholders,
                handler,
            }));
        } else {
            if inner.statics.contains_key(&spec.uri) {
                tracing::warn!(uri = %spec.uri, "duplicate resource registration skipped");
                return Ok(false);
            }
            inner
                .statics
                .insert(spec.uri.clone(), Arc::new(StaticEntry { spec, handler }));
        }

        Ok(true)
    }

    /// `resources/list` items (static URIs only), ordered by URI.
    pub fn definitions(&self) -> Vec<Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<&Arc<StaticEntry>> = inner.statics.values().collect();
        entries.sort_by(|a, b| a.spec.uri.cmp(&b.spec.uri));
        entries.iter().map(|e| e.spec.definition()).collect()
    }

    /// `resources/templates/list` items, in registration order.
    pub fn template_definitions(&self) -> Vec<Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.templates.iter().map(|t| t.spec.definition()).collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.statics.len() + inner.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.statics.clear();
        inner.templates.clear();
    }

    /// Read the resource matching `uri`. Returns the content plus the
    /// effective MIME type (content override, then descriptor, then
    /// `text/plain`).
    pub async fn read(&self, uri: &str) -> Result<(ResourceContent, String)> {
        let resolved = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = inner.statics.get(uri) {
                Some((entry.spec.clone(), entry.handler.clone(), Vec::new()))
            } else {
                inner.templates.iter().find_map(|t| {
                    t.extract(uri)
                        .map(|captures| (t.spec.clone(), t.handler.clone(), captures))
                })
            }
        };

        let (spec, handler, captures) =
            resolved.ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

        let mut values = Vec::with_capacity(captures.len());
        for (name, raw) in captures {
            let value = match spec.params.iter().find(|p| p.name == name) {
                Some(param) => coerce(&Value::String(raw), &param.kind, &name)?,
                None => Value::String(raw),
            };
            values.push((name, value));
        }

        let content = handler.read(uri, ToolArgs::from_values(values)).await?;
        let mime = content
            .mime_type
            .clone()
            .or_else(|| spec.mime_type.clone())
            .unwrap_or_else(|| "text/plain".to_string());
        Ok((content, mime))
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a URI template to a regex. Each `{name}` placeholder captures
/// one path segment (`[^/]+`); everything else matches literally.
fn compile_uri_template(template: &str) -> Result<(Regex, Vec<String>)> {
    let mut pattern = String::from("^");
    let mut placeholders = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => name.push(c),
                    None => {
                        return Err(Error::Handler(format!(
                            "Unterminated placeholder in URI template '{}'",
                            template
                        )));
                    }
                }
            }
            if name.is_empty() {
                return Err(Error::Handler(format!(
                    "Empty placeholder name in URI template '{}'",
                    template
                )));
            }
            if placeholders.contains(&name) {
                return Err(Error::Handler(format!(
                    "Duplicate placeholder '{}' in URI template '{}'",
                    name, template
                )));
            }
            placeholders.push(name);
            pattern.push_str("([^/]+)");
        } else {
            if ".*+?^$[](){}|\\".contains(ch) {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
    }

    pattern.push('$');

    let regex = Regex::new(&pattern)
        .map_err(|e| Error::Handler(format!("Invalid URI template regex: {}", e)))?;

    Ok((regex, placeholders))
}
