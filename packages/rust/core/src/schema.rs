//! A small schema language for structured model output.
//!
//! ```text
//! schema := type
//! type   := scalar | "[" type "]" | "{" [ field { "," field } [ "," ] ] "}"
//! scalar := "string" | "number" | "integer" | "boolean"
//! field  := key [ "?" ] ":" type [ "\"description\"" ]
//! key    := identifier | "\"quoted key\""
//! ```
//!
//! For example `{ title: string, year: integer "Year of release", tags?: [string] }`.
//! A parsed [`Schema`] renders to JSON Schema for the provider and validates
//! the values that come back.

use serde_json::{Map, Value, json};

use heyi_shared::{HeyiError, Result};

/// A parsed schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<Schema>),
    Object(Vec<Field>),
}

/// One named member of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// Optional fields may be absent or `null`.
    pub optional: bool,
    pub description: Option<String>,
}

impl Schema {
    /// Parse schema-language source text.
    pub fn parse(src: &str) -> Result<Self> {
        let mut parser = Parser {
            src,
            pos: 0,
            depth: 0,
        };
        let schema = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos < src.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(schema)
    }

    /// Whether the root of this schema is an object.
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Render as a JSON Schema document.
    ///
    /// Every object property is listed as required; optional ones accept
    /// `null` instead, which keeps the output usable for strict structured
    /// output modes.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Number => json!({ "type": "number" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            Self::Object(fields) => {
                let mut properties = Map::new();
                for field in fields {
                    properties.insert(field.name.clone(), field.to_json_schema());
                }
                let required: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                    "additionalProperties": false,
                })
            }
        }
    }

    /// Check `value` against this schema. The error names the offending path.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> std::result::Result<(), String> {
        let ok = match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
            Self::Array(item) => {
                let Some(items) = value.as_array() else {
                    return Err(mismatch(path, self, value));
                };
                for (i, v) in items.iter().enumerate() {
                    item.validate_at(v, &format!("{path}[{i}]"))?;
                }
                true
            }
            Self::Object(fields) => {
                let Some(map) = value.as_object() else {
                    return Err(mismatch(path, self, value));
                };
                for field in fields {
                    let field_path = format!("{path}.{}", field.name);
                    match map.get(&field.name) {
                        None | Some(Value::Null) if field.optional => {}
                        None => return Err(format!("{field_path}: missing required field")),
                        Some(v) => field.schema.validate_at(v, &field_path)?,
                    }
                }
                if let Some(extra) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                    return Err(format!("{path}: unexpected field '{extra}'"));
                }
                true
            }
        };

        if ok { Ok(()) } else { Err(mismatch(path, self, value)) }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl Field {
    fn to_json_schema(&self) -> Value {
        let mut schema = self.schema.to_json_schema();

        if self.optional {
            schema = nullable(schema, &self.schema);
        }
        if let (Some(desc), Some(obj)) = (&self.description, schema.as_object_mut()) {
            obj.insert("description".into(), Value::String(desc.clone()));
        }
        schema
    }
}

fn nullable(schema: Value, kind: &Schema) -> Value {
    match kind {
        Schema::Array(_) | Schema::Object(_) => json!({ "anyOf": [schema, { "type": "null" }] }),
        scalar => json!({ "type": [scalar.type_name(), "null"] }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &Schema, got: &Value) -> String {
    format!(
        "{path}: expected {}, got {}",
        expected.type_name(),
        json_type_name(got)
    )
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest allowed nesting of `[..]` and `{..}`.
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, msg: &str) -> HeyiError {
        HeyiError::schema(format!("{msg} at offset {} in '{}'", self.pos, self.src))
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(HeyiError::schema(format!(
                "schema nested too deeply (more than {MAX_DEPTH} levels) at offset {}",
                self.pos
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn parse_type(&mut self) -> Result<Schema> {
        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.enter()?;
                self.pos += 1;
                let item = self.parse_type()?;
                self.expect(']')?;
                self.depth -= 1;
                Ok(Schema::Array(Box::new(item)))
            }
            Some('{') => {
                self.enter()?;
                self.pos += 1;
                let fields = self.parse_fields()?;
                self.depth -= 1;
                Ok(fields)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.ident();
                match word {
                    "string" => Ok(Schema::String),
                    "number" => Ok(Schema::Number),
                    "integer" => Ok(Schema::Integer),
                    "boolean" => Ok(Schema::Boolean),
                    other => {
                        let msg = format!(
                            "unknown type '{other}' (expected string, number, integer, boolean, [..] or {{..}})"
                        );
                        self.pos = start;
                        Err(self.error(&msg))
                    }
                }
            }
            Some(_) => Err(self.error("expected a type")),
            None => Err(self.error("unexpected end of schema, expected a type")),
        }
    }

    fn parse_fields(&mut self) -> Result<Schema> {
        let mut fields: Vec<Field> = Vec::new();

        loop {
            if self.eat('}') {
                break;
            }

            let name = self.key()?;
            if fields.iter().any(|f| f.name == name) {
                return Err(self.error(&format!("duplicate field '{name}'")));
            }
            let optional = self.eat('?');
            self.expect(':')?;
            let schema = self.parse_type()?;

            self.skip_ws();
            let description = if self.peek() == Some('"') {
                Some(self.quoted()?)
            } else {
                None
            };

            fields.push(Field {
                name,
                schema,
                optional,
                description,
            });

            if !self.eat(',') {
                self.expect('}')?;
                break;
            }
        }

        if fields.is_empty() {
            return Err(self.error("object must declare at least one field"));
        }
        Ok(Schema::Object(fields))
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        self.pos += len;
        &self.src[start..self.pos]
    }

    fn key(&mut self) -> Result<String> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.quoted(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => Ok(self.ident().to_string()),
            _ => Err(self.error("expected a field name")),
        }
    }

    fn quoted(&mut self) -> Result<String> {
        // Caller has checked for the opening quote.
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                other => out.push(other),
            }
        }

        self.pos = self.src.len();
        Err(self.error("unterminated string"))
    }
}
