//! Schema-as-data request validation.
//!
//! Schemas are plain values (required fields, per-property constraints, or a set
//! of alternatives) interpreted by one generic checker, so adding an endpoint
//! means declaring data rather than writing validation code.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{ValidationError, ValidationResult};

pub const GENERATE_ORDER: &str = "generate_order";
pub const CHECK_STATUS: &str = "check_status";

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d{2}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Uri,
}

impl Format {
    fn matches(self, value: &str) -> bool {
        match self {
            Format::Uri => url::Url::parse(value).is_ok(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyRule {
    pub field_type: Option<FieldType>,
    pub pattern: Option<Regex>,
    pub min_length: Option<usize>,
    pub format: Option<Format>,
}

impl PropertyRule {
    pub fn string() -> Self {
        Self {
            field_type: Some(FieldType::String),
            ..Self::default()
        }
    }

    pub fn typed(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    fn check(&self, field: &'static str, value: &Value) -> ValidationResult {
        if let Some(field_type) = self.field_type {
            if !field_type.matches(value) {
                return Err(ValidationError::new(
                    field,
                    format!("must be of type {:?}", field_type),
                ));
            }
        }

        let needs_text = self.pattern.is_some() || self.min_length.is_some() || self.format.is_some();
        if !needs_text {
            return Ok(());
        }

        let text = value
            .as_str()
            .ok_or_else(|| ValidationError::new(field, "must be a string"))?;

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(text) {
                return Err(ValidationError::new(
                    field,
                    format!("must match pattern {}", pattern.as_str()),
                ));
            }
        }

        if let Some(min_length) = self.min_length {
            if text.chars().count() < min_length {
                return Err(ValidationError::new(
                    field,
                    format!("must be at least {} characters", min_length),
                ));
            }
        }

        if let Some(format) = self.format {
            if !format.matches(text) {
                return Err(ValidationError::new(
                    field,
                    format!("must be a valid {:?}", format),
                ));
            }
        }

        Ok(())
    }
}

/// Constraints on a flat string-keyed object.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    required: Vec<&'static str>,
    properties: Vec<(&'static str, PropertyRule)>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, field: &'static str) -> Self {
        self.required.push(field);
        self
    }

    pub fn property(mut self, field: &'static str, rule: PropertyRule) -> Self {
        self.properties.push((field, rule));
        self
    }

    pub fn check(&self, data: &Map<String, Value>) -> ValidationResult {
        for &field in &self.required {
            match data.get(field) {
                Some(value) if !value.is_null() => {}
                _ => return Err(ValidationError::new(field, "is required")),
            }
        }

        for (field, rule) in &self.properties {
            if let Some(value) = data.get(*field) {
                rule.check(*field, value)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum Schema {
    Object(ObjectSchema),
    /// Data must satisfy at least one alternative.
    OneOf(Vec<ObjectSchema>),
}

impl Schema {
    pub fn check(&self, data: &Map<String, Value>) -> ValidationResult {
        match self {
            Schema::Object(schema) => schema.check(data),
            Schema::OneOf(alternatives) => {
                if alternatives.iter().any(|alt| alt.check(data).is_ok()) {
                    Ok(())
                } else {
                    Err(ValidationError::new(
                        "oneOf",
                        "must satisfy at least one alternative",
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    schemas: HashMap<&'static str, Schema>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, name: &'static str, schema: Schema) -> Self {
        self.schemas.insert(name, schema);
        self
    }

    /// The request schemas of the MyPay checkout API.
    pub fn mypay() -> Self {
        let generate_order = ObjectSchema::new()
            .require("Amount")
            .require("OrderId")
            .require("UserName")
            .require("Password")
            .require("MerchantId")
            .property("Amount", PropertyRule::string().pattern(AMOUNT_PATTERN.clone()))
            .property("OrderId", PropertyRule::string().min_length(6))
            .property("UserName", PropertyRule::string())
            .property("Password", PropertyRule::string())
            .property("MerchantId", PropertyRule::string())
            .property("ReturnUrl", PropertyRule::string().format(Format::Uri));

        let check_status = Schema::OneOf(vec![
            ObjectSchema::new()
                .require("MerchantTransactionId")
                .property("MerchantTransactionId", PropertyRule::string()),
            ObjectSchema::new()
                .require("GatewayTransactionId")
                .property("GatewayTransactionId", PropertyRule::string()),
        ]);

        Self::new()
            .with_schema(GENERATE_ORDER, Schema::Object(generate_order))
            .with_schema(CHECK_STATUS, check_status)
    }

    /// Checks `data` against the named schema. Unknown schemas fail closed.
    pub fn check(&self, schema_name: &str, data: &Map<String, Value>) -> ValidationResult {
        match self.schemas.get(schema_name) {
            Some(schema) => schema.check(data),
            None => Err(ValidationError::new(
                "schema",
                format!("unknown schema {}", schema_name),
            )),
        }
    }

    pub fn validate(&self, schema_name: &str, data: &Map<String, Value>) -> bool {
        self.check(schema_name, data).is_ok()
    }
}
