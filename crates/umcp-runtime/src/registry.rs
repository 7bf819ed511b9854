//! Tool registry: named handlers with published JSON schemas.
//!
//! Registration is explicit. Duplicate names are skipped with a warning and
//! the first registration wins. The map is guarded by a mutex; list
//! operations work on a snapshot taken under the lock so a rescan never
//! tears a reader.

use crate::param::{coerce_args, ParamSpec, ToolArgs};
use crate::{Error, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// Semantic hints published under `annotations` in `tools/list`.
#[derive(Debug, Clone, Default)]
pub struct ToolAnnotations {
    pub title: Option<String>,
    pub read_only_hint: Option<bool>,
    pub destructive_hint: Option<bool>,
    pub idempotent_hint: Option<bool>,
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.read_only_hint.is_none()
            && self.destructive_hint.is_none()
            && self.idempotent_hint.is_none()
            && self.open_world_hint.is_none()
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(title) = &self.title {
            obj.insert("title".to_string(), Value::from(title.clone()));
        }
        if let Some(v) = self.read_only_hint {
            obj.insert("readOnlyHint".to_string(), Value::from(v));
        }
        if let Some(v) = self.destructive_hint {
            obj.insert("destructiveHint".to_string(), Value::from(v));
        }
        if let Some(v) = self.idempotent_hint {
            obj.insert("idempotentHint".to_string(), Value::from(v));
        }
        if let Some(v) = self.open_world_hint {
            obj.insert("openWorldHint".to_string(), Value::from(v));
        }
        Value::Object(obj)
    }
}

/// Immutable descriptor for a registered tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub category: String,
    pub annotations: ToolAnnotations,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: "Uncategorized".to_string(),
            annotations: ToolAnnotations::default(),
            params: Vec::new(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.annotations.title = Some(title.into());
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.annotations.read_only_hint = Some(value);
        self
    }

    pub fn destructive(mut self, value: bool) -> Self {
        self.annotations.destructive_hint = Some(value);
        self
    }

    pub fn idempotent(mut self, value: bool) -> Self {
        self.annotations.idempotent_hint = Some(value);
        self
    }

    pub fn open_world(mut self, value: bool) -> Self {
        self.annotations.open_world_hint = Some(value);
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// JSON schema for the tool's input object. The `required` list holds
    /// exactly the parameters registered without a default.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            properties.insert(param.name.clone(), param.schema());
            if param.required {
                required.push(Value::from(param.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::from("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// The `tools/list` item for this tool.
    pub fn definition(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::from(self.name.clone()));
        obj.insert("description".to_string(), Value::from(self.description.clone()));
        obj.insert("inputSchema".to_string(), self.input_schema());
        if !self.annotations.is_empty() {
            obj.insert("annotations".to_string(), self.annotations.to_json());
        }
        Value::Object(obj)
    }
}

/// Tool invocation callback.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<Value>;
}

/// A registered tool: descriptor plus handler.
pub struct ToolEntry {
    pub spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry").field("spec", &self.spec).finish()
    }
}

impl ToolEntry {
    /// Coerce a raw arguments object against the tool's parameter specs.
    pub fn coerce(&self, arguments: Option<&Map<String, Value>>) -> Result<ToolArgs> {
        coerce_args(&self.spec.params, arguments)
    }

    pub async fn invoke(&self, args: ToolArgs) -> Result<Value> {
        self.handler.call(args).await
    }
}

/// Registry of tools, keyed by name.
pub struct ToolRegistry {
    tools: Mutex<FxHashMap<String, Arc<ToolEntry>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(FxHashMap::default()),
        }
    }

    /// Register a tool. Returns false (and keeps the existing entry) when
    /// the name is already taken.
    pub fn register(&self, spec: ToolSpec, handler: Arc<dyn ToolHandler>) -> bool {
        let mut tools = self.tools.lock().unwrap_or_else(|e| e.into_inner());
        if tools.contains_key(&spec.name) {
            tracing::warn!(tool = %spec.name, "duplicate tool registration skipped");
            return false;
        }
        let name = spec.name.clone();
        tools.insert(name, Arc::new(ToolEntry { spec, handler }));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Look up a tool by exact name.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolEntry>> {
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }

    /// `tools/list` items, ordered by category rank then name.
    pub fn definitions(&self) -> Vec<Value> {
        let mut entries: Vec<Arc<ToolEntry>> = {
            let tools = self.tools.lock().unwrap_or_else(|e| e.into_inner());
            tools.values().cloned().collect()
        };
        entries.sort_by(|a, b| {
            (category_rank(&a.spec.category), &a.spec.name)
                .cmp(&(category_rank(&b.spec.category), &b.spec.name))
        });
        entries.iter().map(|e| e.spec.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registration, ahead of a full re-registration pass.
    pub fn clear(&self) {
        self.tools.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordering hint for the built-in categories; unknown categories land in
/// the middle of the range.
pub fn category_rank(category: &str) -> usize {
    const ORDER: [&str; 13] = [
        "Scene",
        "GameObject",
        "Component",
        "Asset",
        "VFX",
        "Console",
        "Tests",
        "Profiler",
        "Build",
        "UIToolkit",
        "Editor",
        "Debug",
        "Uncategorized",
    ];
    ORDER
        .iter()
        .position(|c| *c == category)
        .unwrap_or(ORDER.len() / 2)
}
