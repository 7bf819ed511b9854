//! Parameter descriptors, JSON-schema publication, and argument coercion.
//!
//! Tools and parameterized resources declare an ordered list of
//! [`ParamSpec`]s. The same descriptors drive both the schema published by
//! `tools/list` and the coercion of incoming JSON arguments before a
//! handler runs. A coercion failure never reaches the handler body.

use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// Declared type of a parameter, mapped to a JSON-schema type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Closed set of string values. Accepts the variant name
    /// (case-insensitive) or its zero-based index.
    Enum(Vec<String>),
    Array(Box<ParamKind>),
    Object,
}

impl ParamKind {
    /// JSON-schema `type` keyword for this kind. Enumerated parameters
    /// publish as `array`, with the value list carried on their `items`
    /// schema.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Enum(_) | ParamKind::Array(_) => "array",
            ParamKind::Object => "object",
        }
    }

    /// Zero value substituted for an absent optional parameter with no
    /// declared default.
    pub fn zero_value(&self) -> Value {
        match self {
            ParamKind::String => Value::String(String::new()),
            ParamKind::Integer => Value::from(0),
            ParamKind::Number => Value::from(0.0),
            ParamKind::Boolean => Value::Bool(false),
            ParamKind::Enum(variants) => {
                Value::String(variants.first().cloned().unwrap_or_default())
            }
            ParamKind::Array(_) => Value::Array(Vec::new()),
            ParamKind::Object => Value::Object(Map::new()),
        }
    }

    fn label(&self) -> String {
        match self {
            ParamKind::Enum(_) => "enum".to_string(),
            ParamKind::Array(item) => format!("array of {}", item.label()),
            other => other.json_type().to_string(),
        }
    }
}

/// Descriptor for one formal parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl ParamSpec {
    /// A parameter the caller must supply.
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            required: true,
            default: None,
            minimum: None,
            maximum: None,
        }
    }

    /// A parameter with a declared default. Not listed under `required`.
    pub fn optional(name: impl Into<String>, kind: ParamKind, default: Value) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            required: false,
            default: Some(default),
            minimum: None,
            maximum: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn bounds(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// JSON-schema fragment for this parameter.
    pub fn schema(&self) -> Value {
        let mut obj = kind_schema(&self.kind);

        if !self.description.is_empty() {
            obj.insert("description".to_string(), Value::from(self.description.clone()));
        }
        if let Some(min) = self.minimum {
            obj.insert("minimum".to_string(), number(min));
        }
        if let Some(max) = self.maximum {
            obj.insert("maximum".to_string(), number(max));
        }
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }

        Value::Object(obj)
    }
}

fn kind_schema(kind: &ParamKind) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::from(kind.json_type()));
    match kind {
        ParamKind::Enum(variants) => {
            let mut items = Map::new();
            items.insert("type".to_string(), Value::from("string"));
            items.insert(
                "enum".to_string(),
                Value::Array(variants.iter().cloned().map(Value::from).collect()),
            );
            obj.insert("items".to_string(), Value::Object(items));
        }
        ParamKind::Array(item) => {
            obj.insert("items".to_string(), Value::Object(kind_schema(item)));
        }
        _ => {}
    }
    obj
}

fn number(n: f64) -> Value {
    // Integral bounds render as integers in the published schema.
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Coerced arguments, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(FxHashMap<String, Value>);

impl ToolArgs {
    pub fn from_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        ToolArgs(values.into_iter().collect())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolve the full argument set for `specs` from a raw JSON `arguments`
/// object. A JSON `null` counts as absent. Unknown extra arguments are
/// ignored.
pub fn coerce_args(specs: &[ParamSpec], arguments: Option<&Map<String, Value>>) -> Result<ToolArgs> {
    let mut out = FxHashMap::default();

    for spec in specs {
        let supplied = arguments
            .and_then(|m| m.get(&spec.name))
            .filter(|v| !v.is_null());

        let value = match supplied {
            Some(v) => coerce(v, &spec.kind, &spec.name)?,
            None if spec.required => {
                return Err(Error::InvalidParams(format!(
                    "Missing required parameter '{}'",
                    spec.name
                )));
            }
            None => {
                let fallback = spec.default.clone().unwrap_or_else(|| spec.kind.zero_value());
                coerce(&fallback, &spec.kind, &spec.name)?
            }
        };

        out.insert(spec.name.clone(), value);
    }

    Ok(ToolArgs(out))
}

/// Coerce one JSON value to the declared kind.
pub fn coerce(value: &Value, kind: &ParamKind, param: &str) -> Result<Value> {
    match kind {
        ParamKind::String => Ok(Value::String(stringify(value))),
        ParamKind::Boolean => coerce_bool(value, param),
        ParamKind::Integer => coerce_integer(value, param),
        ParamKind::Number => coerce_number(value, param),
        ParamKind::Enum(variants) => coerce_enum(value, variants, param),
        ParamKind::Array(item) => coerce_array(value, item, param),
        ParamKind::Object => coerce_object(value, param),
    }
}

/// Canonical string form of a JSON value: strings pass through, scalars
/// use their lexical form, containers use compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn coerce_bool(value: &Value, param: &str) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(mismatch(param, value, "boolean")),
        },
        _ => Err(mismatch(param, value, "boolean")),
    }
}

fn coerce_integer(value: &Value, param: &str) -> Result<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::from(f.trunc() as i64))
            } else {
                Err(mismatch(param, value, "integer"))
            }
        }
        Value::String(s) => {
            if let Ok(i) = s.trim().parse::<i64>() {
                Ok(Value::from(i))
            } else if let Ok(f) = s.trim().parse::<f64>() {
                Ok(Value::from(f.trunc() as i64))
            } else {
                Err(mismatch(param, value, "integer"))
            }
        }
        _ => Err(mismatch(param, value, "integer")),
    }
}

fn coerce_number(value: &Value, param: &str) -> Result<Value> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| mismatch(param, value, "number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| mismatch(param, value, "number")),
        _ => Err(mismatch(param, value, "number")),
    }
}

fn coerce_enum(value: &Value, variants: &[String], param: &str) -> Result<Value> {
    match value {
        Value::String(s) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(s))
            .map(|v| Value::String(v.clone()))
            .ok_or_else(|| {
                Error::InvalidParams(format!(
                    "Parameter '{}': '{}' is not one of [{}]",
                    param,
                    s,
                    variants.join(", ")
                ))
            }),
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| variants.get(i as usize))
            .map(|v| Value::String(v.clone()))
            .ok_or_else(|| {
                Error::InvalidParams(format!(
                    "Parameter '{}': index {} is out of range for [{}]",
                    param,
                    value,
                    variants.join(", ")
                ))
            }),
        _ => Err(mismatch(param, value, "enum")),
    }
}

fn coerce_array(value: &Value, item: &ParamKind, param: &str) -> Result<Value> {
    match value {
        Value::Array(elements) => {
            let coerced = elements
                .iter()
                .map(|e| coerce(e, item, param))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(coerced))
        }
        _ => Err(mismatch(param, value, &ParamKind::Array(Box::new(item.clone())).label())),
    }
}

fn coerce_object(value: &Value, param: &str) -> Result<Value> {
    match value {
        Value::Object(_) => Ok(value.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(Value::Object(map)),
            _ => Err(Error::InvalidParams(format!(
                "Parameter '{}': string does not parse as a JSON object",
                param
            ))),
        },
        _ => Err(mismatch(param, value, "object")),
    }
}

fn mismatch(param: &str, value: &Value, target: &str) -> Error {
    Error::InvalidParams(format!(
        "Parameter '{}': cannot coerce {} to {}",
        param,
        type_name(value),
        target
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
