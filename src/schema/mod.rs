//! # Schema Module
//!
//! Runtime type definitions for generated items.
//!
//! A [`FieldSchema`] declares one attribute of an item: its JSON key, value
//! type, presentation metadata and validation rules. A [`Profile`] is the
//! ordered collection of field schemas that defines a whole item family.

pub mod profile;
pub mod registry;

pub use profile::*;
pub use registry::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the identity fields every profile carries.
pub const IDENTITY_FIELDS: [&str; 5] = ["id", "displayName", "category", "rarity", "description"];

/// Rarity tiers offered for the synthesized `rarity` field.
pub const RARITY_TIERS: [&str; 5] = ["Common", "Uncommon", "Rare", "Epic", "Legendary"];

/// Returns true if `name` is one of the fixed identity fields.
pub fn is_identity_field(name: &str) -> bool {
    IDENTITY_FIELDS.contains(&name)
}

/// Value type declared for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FieldType {
    #[default]
    #[serde(alias = "string")]
    String,
    #[serde(alias = "integer", alias = "int")]
    Integer,
    #[serde(alias = "float")]
    Float,
    #[serde(alias = "boolean", alias = "bool")]
    Boolean,
    #[serde(alias = "array")]
    Array,
    #[serde(alias = "object")]
    Object,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "String",
            FieldType::Integer => "Integer",
            FieldType::Float => "Float",
            FieldType::Boolean => "Boolean",
            FieldType::Array => "Array",
            FieldType::Object => "Object",
        };
        f.write_str(name)
    }
}

/// Comparison used by a [`RelationshipConstraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipOperator {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl RelationshipOperator {
    /// Evaluates `lhs OP rhs`.
    ///
    /// # Examples
    ///
    /// ```
    /// use itemforge::RelationshipOperator;
    ///
    /// assert!(RelationshipOperator::GreaterOrEqual.evaluate(10.0, 10.0));
    /// assert!(!RelationshipOperator::Less.evaluate(10.0, 10.0));
    /// ```
    pub fn evaluate(self, lhs: f64, rhs: f64) -> bool {
        match self {
            RelationshipOperator::GreaterOrEqual => lhs >= rhs,
            RelationshipOperator::LessOrEqual => lhs <= rhs,
            RelationshipOperator::Greater => lhs > rhs,
            RelationshipOperator::Less => lhs < rhs,
            RelationshipOperator::Equal => (lhs - rhs).abs() < f64::EPSILON,
            RelationshipOperator::NotEqual => (lhs - rhs).abs() >= f64::EPSILON,
        }
    }

    /// The operator as written in profile files.
    pub fn symbol(self) -> &'static str {
        match self {
            RelationshipOperator::GreaterOrEqual => ">=",
            RelationshipOperator::LessOrEqual => "<=",
            RelationshipOperator::Greater => ">",
            RelationshipOperator::Less => "<",
            RelationshipOperator::Equal => "==",
            RelationshipOperator::NotEqual => "!=",
        }
    }
}

impl fmt::Display for RelationshipOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Cross-field numeric invariant: `this OP (target + offset)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipConstraint {
    pub operator: RelationshipOperator,
    pub target_field_name: String,
    #[serde(default)]
    pub numeric_offset: f64,
    #[serde(default)]
    pub description: String,
}

impl RelationshipConstraint {
    /// Creates a constraint with no offset.
    pub fn new(operator: RelationshipOperator, target_field_name: impl Into<String>) -> Self {
        Self {
            operator,
            target_field_name: target_field_name.into(),
            numeric_offset: 0.0,
            description: String::new(),
        }
    }

    /// Sets the numeric offset added to the target value.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.numeric_offset = offset;
        self
    }
}

/// Declarative description of one item attribute.
///
/// Bounds are optional: `None` means the bound is not configured. Profile
/// files written by older tools encode "unbounded" as zero, see
/// [`FieldSchema::migrate_zero_bounds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// JSON key, unique within a profile
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub display_order: i32,
    /// Type-erased default, coerced by the caller
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub relationship_constraints: Vec<RelationshipConstraint>,
    /// Free-text expression carried through unevaluated
    #[serde(default)]
    pub custom_constraint: String,
}

impl FieldSchema {
    /// Creates an optional field with no constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            field_type,
            description: String::new(),
            category: String::new(),
            display_order: 0,
            default_value: String::new(),
            is_required: false,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            allowed_values: Vec::new(),
            relationship_constraints: Vec::new(),
            custom_constraint: String::new(),
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Sets the inclusive numeric range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Sets the inclusive string length range.
    pub fn with_length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    /// Restricts a string field to a fixed set of values.
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a cross-field constraint.
    pub fn with_relationship(mut self, constraint: RelationshipConstraint) -> Self {
        self.relationship_constraints.push(constraint);
        self
    }

    /// Sets the display order.
    pub fn with_order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }

    /// Converts zero-valued legacy bounds to "unbounded".
    ///
    /// Returns true if anything changed. A `0..=0` numeric range cannot be
    /// told apart from "no range configured" in old profile files, so it is
    /// treated as unbounded and the caller is expected to report it.
    pub fn migrate_zero_bounds(&mut self) -> bool {
        let mut changed = false;

        if self.min_value == Some(0.0) && self.max_value == Some(0.0) {
            self.min_value = None;
            self.max_value = None;
            changed = true;
        }
        if self.min_length == Some(0) {
            self.min_length = None;
            changed = true;
        }
        if self.max_length == Some(0) {
            self.max_length = None;
            changed = true;
        }

        changed
    }

    /// Checks this field's own invariants, returning one message per violation.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("field name must not be empty".to_string());
        }
        if self.field_type != FieldType::String && !self.allowed_values.is_empty() {
            problems.push(format!(
                "field '{}' is {} but declares allowed values",
                self.name, self.field_type
            ));
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                problems.push(format!(
                    "field '{}' has minValue {} greater than maxValue {}",
                    self.name, min, max
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                problems.push(format!(
                    "field '{}' has minLength {} greater than maxLength {}",
                    self.name, min, max
                ));
            }
        }
        for constraint in &self.relationship_constraints {
            if constraint.target_field_name == self.name {
                problems.push(format!("field '{}' has a relationship with itself", self.name));
            }
        }

        problems
    }
}
