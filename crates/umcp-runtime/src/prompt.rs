//! Prompt registry: named generators of role-tagged message sequences.

use crate::param::stringify;
use crate::{Error, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// String-valued argument descriptor.
#[derive(Debug, Clone)]
pub struct PromptArg {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PromptArg {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}

/// Immutable descriptor for a registered prompt.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub name: String,
    pub description: String,
    pub args: Vec<PromptArg>,
}

impl PromptSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: PromptArg) -> Self {
        self.args.push(arg);
        self
    }

    fn definition(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::from(self.name.clone()));
        obj.insert("description".to_string(), Value::from(self.description.clone()));
        if !self.args.is_empty() {
            let args: Vec<Value> = self
                .args
                .iter()
                .map(|a| {
                    let mut arg = Map::new();
                    arg.insert("name".to_string(), Value::from(a.name.clone()));
                    if !a.description.is_empty() {
                        arg.insert("description".to_string(), Value::from(a.description.clone()));
                    }
                    arg.insert("required".to_string(), Value::from(a.required));
                    Value::Object(arg)
                })
                .collect();
            obj.insert("arguments".to_string(), Value::Array(args));
        }
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub text: String,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Rendered prompt: an optional description plus ordered messages.
#[derive(Debug, Clone, Default)]
pub struct PromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl PromptResult {
    /// The `prompts/get` result object.
    pub fn to_json(&self) -> Value {
        let messages: Vec<Value> = self
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": {"type": "text", "text": m.text},
                })
            })
            .collect();

        let mut obj = Map::new();
        obj.insert("messages".to_string(), Value::Array(messages));
        if let Some(description) = &self.description {
            obj.insert("description".to_string(), Value::from(description.clone()));
        }
        Value::Object(obj)
    }
}

/// Prompt render callback. Arguments arrive stringified.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn render(&self, args: HashMap<String, String>) -> Result<PromptResult>;
}

struct PromptEntry {
    spec: PromptSpec,
    handler: Arc<dyn PromptHandler>,
}

/// Registry of prompts, keyed by name.
pub struct PromptRegistry {
    prompts: Mutex<FxHashMap<String, Arc<PromptEntry>>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(FxHashMap::default()),
        }
    }

    /// Register a prompt. Returns false when the name is taken.
    pub fn register(&self, spec: PromptSpec, handler: Arc<dyn PromptHandler>) -> bool {
        let mut prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
        if prompts.contains_key(&spec.name) {
            tracing::warn!(prompt = %spec.name, "duplicate prompt registration skipped");
            return false;
        }
        let name = spec.name.clone();
        prompts.insert(name, Arc::new(PromptEntry { spec, handler }));
        true
    }

    /// `prompts/list` items, ordered by name.
    pub fn definitions(&self) -> Vec<Value> {
        let mut entries: Vec<Arc<PromptEntry>> = {
            let prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
            prompts.values().cloned().collect()
        };
        entries.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        entries.iter().map(|e| e.spec.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Render a prompt. Missing required arguments fail before the
    /// handler runs; supplied values are stringified.
    pub async fn get(&self, name: &str, arguments: Option<&Map<String, Value>>) -> Result<Value> {
        let entry = {
            let prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
            prompts
                .get(name)
                .cloned()
                .ok_or_else(|| Error::PromptNotFound(name.to_string()))?
        };

        let mut args = HashMap::new();
        for arg in &entry.spec.args {
            let supplied = arguments
                .and_then(|m| m.get(&arg.name))
                .filter(|v| !v.is_null());
            match supplied {
                Some(value) => {
                    args.insert(arg.name.clone(), stringify(value));
                }
                None if arg.required => {
                    return Err(Error::InvalidParams(format!(
                        "Missing required argument '{}'",
                        arg.name
                    )));
                }
                None => {}
            }
        }

        let result = entry.handler.render(args).await?;
        Ok(result.to_json())
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}
