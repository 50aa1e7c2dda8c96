use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single scalar generation parameter.
///
/// The backend reads every field as multipart text, so the only thing that
/// matters about a value on the wire is [`ParamValue::form_text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl ParamValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Converts a preset value into a parameter. Nested arrays/objects are
    /// kept as their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(raw) => Self::Bool(*raw),
            Value::Number(raw) => raw.as_f64().map(Self::Number).unwrap_or(Self::Null),
            Value::String(raw) => Self::Text(raw.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    /// Best-effort typing for keys without a field descriptor.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if !trimmed.is_empty() {
            if let Ok(number) = trimmed.parse::<f64>() {
                if number.is_finite() {
                    return Self::Number(number);
                }
            }
        }
        Self::Text(raw.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Text sent for this value in a multipart form field.
    ///
    /// Booleans become `true`/`false`, numbers use the shortest decimal form
    /// (`1024`, `0.22`), and null becomes the empty string.
    pub fn form_text(&self) -> String {
        match self {
            Self::Bool(raw) => raw.to_string(),
            Self::Number(raw) => number_text(*raw),
            Self::Text(raw) => raw.clone(),
            Self::Null => String::new(),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(raw) if raw.is_empty() => f.write_str("\"\""),
            Self::Null => f.write_str("null"),
            other => f.write_str(&other.form_text()),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn number_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // -0.0 prints as "-0" otherwise
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        return exponent_text(value);
    }
    format!("{value}")
}

/// `1e+21`, `-2.5e-7`: explicit sign on the exponent, shortest mantissa.
fn exponent_text(value: f64) -> String {
    let raw = format!("{value:e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ParamValue;

    #[test]
    fn form_text_uses_shortest_decimal_form() {
        assert_eq!(ParamValue::Number(1024.0).form_text(), "1024");
        assert_eq!(ParamValue::Number(0.22).form_text(), "0.22");
        assert_eq!(ParamValue::Number(1.0).form_text(), "1");
        assert_eq!(ParamValue::Number(-0.0).form_text(), "0");
        assert_eq!(ParamValue::Number(-90.0).form_text(), "-90");
        assert_eq!(ParamValue::Bool(true).form_text(), "true");
        assert_eq!(ParamValue::Bool(false).form_text(), "false");
        assert_eq!(ParamValue::text("#12cabf").form_text(), "#12cabf");
        assert_eq!(ParamValue::Null.form_text(), "");
    }

    #[test]
    fn form_text_switches_to_exponent_at_extremes() {
        assert_eq!(ParamValue::Number(1e21).form_text(), "1e+21");
        assert_eq!(ParamValue::Number(-1.5e22).form_text(), "-1.5e+22");
        assert_eq!(ParamValue::Number(1e-7).form_text(), "1e-7");
        assert_eq!(ParamValue::Number(2.5e-8).form_text(), "2.5e-8");
        assert_eq!(ParamValue::Number(1e20).form_text(), "100000000000000000000");
        assert_eq!(ParamValue::Number(0.000001).form_text(), "0.000001");
    }

    #[test]
    fn from_json_keeps_scalars_and_flattens_containers() {
        assert_eq!(ParamValue::from_json(&json!(0.95)), ParamValue::Number(0.95));
        assert_eq!(ParamValue::from_json(&json!(28)), ParamValue::Number(28.0));
        assert_eq!(ParamValue::from_json(&json!(false)), ParamValue::Bool(false));
        assert_eq!(ParamValue::from_json(&json!(null)), ParamValue::Null);
        assert_eq!(
            ParamValue::from_json(&json!("#1b0f0a")),
            ParamValue::text("#1b0f0a")
        );
        assert_eq!(
            ParamValue::from_json(&json!([1, 2])),
            ParamValue::text("[1,2]")
        );
    }

    #[test]
    fn infer_prefers_bool_then_number_then_text() {
        assert_eq!(ParamValue::infer("true"), ParamValue::Bool(true));
        assert_eq!(ParamValue::infer(" 12.5 "), ParamValue::Number(12.5));
        assert_eq!(ParamValue::infer("inf"), ParamValue::text("inf"));
        assert_eq!(ParamValue::infer(""), ParamValue::text(""));
        assert_eq!(ParamValue::infer("#fff"), ParamValue::text("#fff"));
    }
}
