//! # Validation Module
//!
//! Advisory checks of record values against field schemas.
//!
//! Validation never fails hard: every check yields a [`ValidationResult`]
//! that callers log, report or use to skip a record. Checks stop at the first
//! failure for a field.

use crate::record::{DynamicRecord, FieldMap, Value};
use crate::schema::{FieldSchema, FieldType, Profile, RelationshipConstraint};
use log::debug;
use std::fmt;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_message: String,
    pub suggestion: String,
}

impl ValidationResult {
    /// A passing result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    /// A failing result with a diagnostic and a hint for fixing it.
    pub fn invalid(error_message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: error_message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Attaches a note to a result without changing its outcome.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }
}

/// A failed field check, tagged with the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub result: ValidationResult,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.result.error_message)?;
        if !self.result.suggestion.is_empty() {
            write!(f, " ({})", self.result.suggestion)?;
        }
        Ok(())
    }
}

/// Checks one value against its schema.
///
/// `siblings` holds the other values of the same record and is only used to
/// resolve relationship constraints. A missing relationship target skips that
/// constraint.
///
/// # Examples
///
/// ```
/// use itemforge::{validate_field, FieldMap, FieldSchema, FieldType, Value};
///
/// let schema = FieldSchema::new("damageModifier", FieldType::Integer).with_range(-100.0, 100.0);
/// let result = validate_field(&schema, Some(&Value::from("150")), &FieldMap::new());
/// assert!(!result.is_valid);
/// assert!(result.error_message.contains("maximum of 100"));
/// ```
pub fn validate_field(
    schema: &FieldSchema,
    value: Option<&Value>,
    siblings: &FieldMap,
) -> ValidationResult {
    let value = match value {
        Some(value) if !value.is_blank() => value,
        _ if schema.is_required => {
            return ValidationResult::invalid(
                format!("field '{}' is required", schema.name),
                "provide a value",
            );
        }
        _ => return ValidationResult::valid(),
    };

    let typed = match schema.field_type {
        FieldType::String => check_string(schema, value),
        FieldType::Integer => check_integer(schema, value),
        FieldType::Float => check_float(schema, value),
        FieldType::Boolean => check_boolean(schema, value),
        FieldType::Array | FieldType::Object => ValidationResult::valid(),
    };
    if !typed.is_valid {
        return typed;
    }

    for constraint in &schema.relationship_constraints {
        let result = check_relationship(schema, value, constraint, siblings);
        if !result.is_valid {
            return result;
        }
    }

    if !schema.custom_constraint.trim().is_empty() {
        debug!(
            "Custom constraint on '{}' is not evaluated: {}",
            schema.name, schema.custom_constraint
        );
    }

    ValidationResult::valid()
}

/// Checks that a record carries the identity fields an asset needs.
///
/// `id` and `displayName` are mandatory. Missing `category`, `rarity` or
/// `description` keeps the record valid and is noted in the suggestion.
pub fn validate_record_identity(record: &DynamicRecord) -> ValidationResult {
    let present = |key: &str| record.get(key).is_some_and(|v| !v.is_blank());

    if !present("id") {
        return ValidationResult::invalid("record is missing 'id'", "add a unique 'id' value");
    }
    if !present("displayName") {
        return ValidationResult::invalid(
            format!("record '{}' is missing 'displayName'", record.id()),
            "add a 'displayName' value",
        );
    }

    let missing: Vec<&str> = ["category", "rarity", "description"]
        .into_iter()
        .filter(|key| !present(*key))
        .collect();

    if missing.is_empty() {
        ValidationResult::valid()
    } else {
        ValidationResult::valid()
            .with_suggestion(format!("optional identity fields not set: {}", missing.join(", ")))
    }
}

/// Checks every field a profile declares against a record.
///
/// Returns one issue per failing field, in profile order. Record keys the
/// profile does not declare are ignored.
pub fn validate_record(profile: &Profile, record: &DynamicRecord) -> Vec<FieldIssue> {
    profile
        .fields
        .iter()
        .filter_map(|schema| {
            let result = validate_field(schema, record.get(&schema.name), &record.fields);
            (!result.is_valid).then(|| FieldIssue {
                field: schema.name.clone(),
                result,
            })
        })
        .collect()
}

fn check_string(schema: &FieldSchema, value: &Value) -> ValidationResult {
    let text = value.as_text();
    let length = text.chars().count();

    if let Some(min) = schema.min_length {
        if length < min {
            return ValidationResult::invalid(
                format!(
                    "'{}' is {} characters, shorter than the minimum of {}",
                    schema.name, length, min
                ),
                format!("use at least {} characters", min),
            );
        }
    }
    if let Some(max) = schema.max_length {
        if length > max {
            return ValidationResult::invalid(
                format!(
                    "'{}' is {} characters, longer than the maximum of {}",
                    schema.name, length, max
                ),
                format!("use at most {} characters", max),
            );
        }
    }

    if !schema.allowed_values.is_empty() && !schema.allowed_values.contains(&text) {
        return ValidationResult::invalid(
            format!("'{}' value '{}' is not an allowed value", schema.name, text),
            format!("use one of: {}", schema.allowed_values.join(", ")),
        );
    }

    ValidationResult::valid()
}

fn check_integer(schema: &FieldSchema, value: &Value) -> ValidationResult {
    match value.to_int() {
        Some(number) => check_range(schema, number as f64),
        None => ValidationResult::invalid(
            format!("'{}' value '{}' is not an integer", schema.name, value),
            "use a whole number",
        ),
    }
}

fn check_float(schema: &FieldSchema, value: &Value) -> ValidationResult {
    match value.to_float() {
        Some(number) => check_range(schema, number),
        None => ValidationResult::invalid(
            format!("'{}' value '{}' is not a number", schema.name, value),
            "use a decimal number",
        ),
    }
}

fn check_boolean(schema: &FieldSchema, value: &Value) -> ValidationResult {
    match value.to_bool() {
        Some(_) => ValidationResult::valid(),
        None => ValidationResult::invalid(
            format!("'{}' value '{}' is not a boolean", schema.name, value),
            "use true or false",
        ),
    }
}

fn check_range(schema: &FieldSchema, number: f64) -> ValidationResult {
    let hint = match (schema.min_value, schema.max_value) {
        (Some(min), Some(max)) => format!("use a value between {} and {}", min, max),
        (Some(min), None) => format!("use a value of at least {}", min),
        (None, Some(max)) => format!("use a value of at most {}", max),
        (None, None) => return ValidationResult::valid(),
    };

    if let Some(min) = schema.min_value {
        if number < min {
            return ValidationResult::invalid(
                format!(
                    "'{}' value {} is below the minimum of {}",
                    schema.name, number, min
                ),
                hint,
            );
        }
    }
    if let Some(max) = schema.max_value {
        if number > max {
            return ValidationResult::invalid(
                format!(
                    "'{}' value {} is above the maximum of {}",
                    schema.name, number, max
                ),
                hint,
            );
        }
    }

    ValidationResult::valid()
}

fn check_relationship(
    schema: &FieldSchema,
    value: &Value,
    constraint: &RelationshipConstraint,
    siblings: &FieldMap,
) -> ValidationResult {
    let target_name = &constraint.target_field_name;

    let Some(this) = value.to_float() else {
        debug!(
            "Skipping relationship on '{}': value '{}' is not numeric",
            schema.name, value
        );
        return ValidationResult::valid();
    };
    let Some(target) = siblings.get(target_name).and_then(Value::to_float) else {
        debug!(
            "Skipping relationship on '{}': target '{}' has no numeric value",
            schema.name, target_name
        );
        return ValidationResult::valid();
    };

    let expected = target + constraint.numeric_offset;
    if constraint.operator.evaluate(this, expected) {
        return ValidationResult::valid();
    }

    let relation = if constraint.numeric_offset == 0.0 {
        format!("'{}' ({})", target_name, expected)
    } else {
        format!(
            "'{}' + {} ({})",
            target_name, constraint.numeric_offset, expected
        )
    };
    let suggestion = if constraint.description.is_empty() {
        format!("adjust '{}' or '{}'", schema.name, target_name)
    } else {
        constraint.description.clone()
    };

    ValidationResult::invalid(
        format!(
            "'{}' ({}) must be {} {}",
            schema.name, this, constraint.operator, relation
        ),
        suggestion,
    )
}
