use serde_json::{Map, Value};

use crate::core::error::ChartError;

pub const DEFAULT_TITLE: &str = "Psychrometric Chart";
const DEFAULT_TEMP_MIN: i64 = 0;
const DEFAULT_TEMP_MAX: i64 = 40;

/// Parameters of one chart generation call, after defaulting.
///
/// Fields keep the JSON value they arrived as so the response can echo
/// `5` as `5`, `5.5` as `5.5` and a numeric title as a number.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartRequest {
    pub temp_min: Value,
    pub temp_max: Value,
    pub title: Value,
}

impl Default for ChartRequest {
    fn default() -> Self {
        Self {
            temp_min: Value::from(DEFAULT_TEMP_MIN),
            temp_max: Value::from(DEFAULT_TEMP_MAX),
            title: Value::from(DEFAULT_TITLE),
        }
    }
}

impl ChartRequest {
    /// Reads the request body. A missing, empty or unparsable body means
    /// "use the defaults"; it is never an error.
    pub fn from_body(body: &[u8]) -> Result<Self, ChartError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                if !body.is_empty() {
                    tracing::debug!("request body is not JSON, using defaults: {}", e);
                }
                Ok(Self::default())
            }
        }
    }

    pub fn from_value(value: Value) -> Result<Self, ChartError> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ChartError::invalid_input(format!(
                    "request body must be a JSON object, got {}",
                    json_type(&other)
                )));
            }
        };
        let defaults = Self::default();

        Ok(Self {
            temp_min: temperature_field(&fields, "temp_min")?.unwrap_or(defaults.temp_min),
            temp_max: temperature_field(&fields, "temp_max")?.unwrap_or(defaults.temp_max),
            title: fields.get("title").cloned().unwrap_or(defaults.title),
        })
    }

    /// The temperature range as floats for the chart limits. Booleans
    /// count as 0 and 1.
    pub fn temperature_range(&self) -> Result<(f64, f64), ChartError> {
        Ok((
            temperature_value("temp_min", &self.temp_min)?,
            temperature_value("temp_max", &self.temp_max)?,
        ))
    }

    /// The title as drawn on the chart. Strings are used as is; any other
    /// JSON value is drawn in its Python-style text form (`42`, `True`,
    /// `None`, `['a', 1]`).
    pub fn title_text(&self) -> String {
        match &self.title {
            Value::String(s) => s.clone(),
            other => python_repr(other),
        }
    }
}

/// Temperatures must be numbers or booleans.
fn temperature_field(fields: &Map<String, Value>, name: &str) -> Result<Option<Value>, ChartError> {
    match fields.get(name) {
        None => Ok(None),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(value.clone())),
        Some(other) => Err(ChartError::invalid_input(format!(
            "{} must be a number, got {}",
            name,
            json_type(other)
        ))),
    }
}

fn temperature_value(name: &str, value: &Value) -> Result<f64, ChartError> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ChartError::invalid_input(format!("{} is not representable as a float", name))),
        other => Err(ChartError::invalid_input(format!(
            "{} must be a number, got {}",
            name,
            json_type(other)
        ))),
    }
}

fn python_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(python_repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", python_repr(&Value::from(k.as_str())), python_repr(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
