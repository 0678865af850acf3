//! The output contract: which shape the model must answer in, and how the
//! answer is unwrapped for printing.
//!
//! The provider is always asked for an object with a single required
//! `result` property; the contract decides what `result` must be.

use serde_json::{Value, json};

use heyi_shared::{HeyiError, OutputFormat, Result};

use crate::schema::Schema;

/// Name of the single property the provider must return.
pub const RESULT_FIELD: &str = "result";

/// Response shape for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputContract {
    String,
    Number,
    /// One object matching the schema.
    Object(Schema),
    /// A list whose items match the schema.
    Array(Schema),
}

impl OutputContract {
    /// Build the contract for `format`, parsing `schema` where required.
    ///
    /// Fails before anything touches the network when a structured format
    /// has no schema or the schema does not parse.
    pub fn new(format: OutputFormat, schema: Option<&str>) -> Result<Self> {
        let schema_text = schema.map(str::trim).filter(|s| !s.is_empty());

        match format {
            OutputFormat::String => Ok(Self::String),
            OutputFormat::Number => Ok(Self::Number),
            OutputFormat::Object | OutputFormat::Array => {
                let text = schema_text.ok_or_else(|| {
                    HeyiError::config(format!(
                        "format '{format}' requires a schema (pass --schema or set \"schema\" in the preset)"
                    ))
                })?;
                let parsed = Schema::parse(text)?;

                if format == OutputFormat::Object {
                    if !parsed.is_object() {
                        return Err(HeyiError::config(
                            "format 'object' requires an object schema like '{ name: string }'",
                        ));
                    }
                    Ok(Self::Object(parsed))
                } else {
                    Ok(Self::Array(parsed))
                }
            }
        }
    }

    /// The format this contract was built from.
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::String => OutputFormat::String,
            Self::Number => OutputFormat::Number,
            Self::Object(_) => OutputFormat::Object,
            Self::Array(_) => OutputFormat::Array,
        }
    }

    /// JSON Schema of the wrapper object the provider must return.
    pub fn response_schema(&self) -> Value {
        let result = match self {
            Self::String => json!({ "type": "string" }),
            Self::Number => json!({ "type": "number" }),
            Self::Object(schema) => schema.to_json_schema(),
            Self::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
        };

        json!({
            "type": "object",
            "properties": { RESULT_FIELD: result },
            "required": [RESULT_FIELD],
            "additionalProperties": false,
        })
    }

    /// Pull `result` out of the provider's response and render it for output.
    pub fn unwrap_result(&self, response: &Value) -> Result<String> {
        let result = response.get(RESULT_FIELD).ok_or_else(|| {
            HeyiError::Provider(format!("response has no '{RESULT_FIELD}' field"))
        })?;

        match self {
            Self::String => result
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| contract_violation(self, "expected a string")),
            Self::Number => match result {
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(contract_violation(self, "expected a number")),
            },
            Self::Object(schema) => {
                schema
                    .validate(result)
                    .map_err(|e| contract_violation(self, &e))?;
                pretty(result)
            }
            Self::Array(item) => {
                let items = result
                    .as_array()
                    .ok_or_else(|| contract_violation(self, "expected an array"))?;
                for (i, value) in items.iter().enumerate() {
                    item.validate(value)
                        .map_err(|e| contract_violation(self, &format!("item {i}: {e}")))?;
                }
                pretty(result)
            }
        }
    }
}

fn contract_violation(contract: &OutputContract, detail: &str) -> HeyiError {
    HeyiError::Provider(format!(
        "response does not match the '{}' output format: {detail}",
        contract.format()
    ))
}

fn pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| HeyiError::Provider(format!("failed to render result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_formats_ignore_schema() {
        assert_eq!(OutputContract::new(OutputFormat::String, None).unwrap(), OutputContract::String);
        assert_eq!(
            OutputContract::new(OutputFormat::Number, Some("{ a: string }")).unwrap(),
            OutputContract::Number
        );
    }

    #[test]
    fn object_without_schema_is_rejected() {
        let err = OutputContract::new(OutputFormat::Object, None).unwrap_err();
        assert!(matches!(err, HeyiError::Config { .. }));
        assert!(err.to_string().contains("requires a schema"));

        let err = OutputContract::new(OutputFormat::Array, Some("   ")).unwrap_err();
        assert!(matches!(err, HeyiError::Config { .. }));
    }

    #[test]
    fn object_requires_object_root() {
        let err = OutputContract::new(OutputFormat::Object, Some("[string]")).unwrap_err();
        assert!(err.to_string().contains("object schema"));
        assert!(OutputContract::new(OutputFormat::Array, Some("string")).is_ok());
    }

    #[test]
    fn malformed_schema_is_a_schema_error() {
        let err = OutputContract::new(OutputFormat::Array, Some("{ name: text }")).unwrap_err();
        assert!(matches!(err, HeyiError::Schema { .. }));
    }

    #[test]
    fn response_schema_wraps_result() {
        let contract = OutputContract::new(OutputFormat::Array, Some("{ city: string }")).unwrap();
        let schema = contract.response_schema();
        assert_eq!(schema["required"], json!(["result"]));
        assert_eq!(schema["properties"]["result"]["type"], "array");
        assert_eq!(schema["properties"]["result"]["items"]["properties"]["city"]["type"], "string");

        let schema = OutputContract::Number.response_schema();
        assert_eq!(schema["properties"]["result"], json!({ "type": "number" }));
    }

    #[test]
    fn unwraps_string_verbatim() {
        let out = OutputContract::String
            .unwrap_result(&json!({ "result": "  line one\nline two " }))
            .unwrap();
        assert_eq!(out, "  line one\nline two ");
    }

    #[test]
    fn unwraps_number_without_formatting() {
        assert_eq!(OutputContract::Number.unwrap_result(&json!({ "result": 42 })).unwrap(), "42");
        assert_eq!(OutputContract::Number.unwrap_result(&json!({ "result": 3.14159 })).unwrap(), "3.14159");
        assert!(OutputContract::Number.unwrap_result(&json!({ "result": "42" })).is_err());
    }

    #[test]
    fn unwraps_object_pretty() {
        let contract =
            OutputContract::new(OutputFormat::Object, Some("{ name: string, age?: integer }")).unwrap();
        let out = contract
            .unwrap_result(&json!({ "result": { "name": "Ada" } }))
            .unwrap();
        assert_eq!(out, "{\n  \"name\": \"Ada\"\n}");

        let err = contract
            .unwrap_result(&json!({ "result": { "name": "Ada", "age": "old" } }))
            .unwrap_err();
        assert!(err.to_string().contains("$.age"));
    }

    #[test]
    fn unwraps_array_pretty_and_validates_items() {
        let contract = OutputContract::new(OutputFormat::Array, Some("string")).unwrap();
        let out = contract.unwrap_result(&json!({ "result": ["a", "b"] })).unwrap();
        assert_eq!(out, "[\n  \"a\",\n  \"b\"\n]");

        let err = contract.unwrap_result(&json!({ "result": ["a", 1] })).unwrap_err();
        assert!(err.to_string().contains("item 1"));
    }

    #[test]
    fn missing_result_is_a_provider_error() {
        let err = OutputContract::String.unwrap_result(&json!({ "answer": "x" })).unwrap_err();
        assert!(matches!(err, HeyiError::Provider(_)));
    }
}
