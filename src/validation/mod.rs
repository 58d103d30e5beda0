//! Declarative request-body validation.
//!
//! A [`Schema`] is a static table of [`FieldRule`]s; [`Schema::validate`]
//! walks it and reports the first constraint that fails. Adding a field to a
//! request body means adding a row, not writing code.

pub mod schemas;

pub use schemas::*;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub format: Option<Format>,
}

impl FieldRule {
    pub const fn string(name: &'static str) -> Self {
        Self { name, kind: FieldKind::String, required: true, format: None }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Boolean, required: true, format: None }
    }

    pub const fn email(name: &'static str) -> Self {
        Self { name, kind: FieldKind::String, required: true, format: Some(Format::Email) }
    }

    #[cfg(test)]
    pub const fn optional(self) -> Self {
        Self { required: false, ..self }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldRule],
    pub allow_unknown: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Object,
    Required,
    Type,
    NotEmpty,
    Email,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub constraint: Constraint,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, constraint: Constraint, message: String) -> Self {
        Self { field: field.to_string(), constraint, message }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

impl Schema {
    /// Checks `body` against the schema. Order: body is an object, then each
    /// declared field (presence, type, emptiness, format), then unknown keys.
    pub fn validate(&self, body: &Value) -> Result<(), ValidationError> {
        let object = body.as_object().ok_or_else(|| {
            ValidationError::new("value", Constraint::Object, "\"value\" must be of type object".to_string())
        })?;

        for rule in self.fields {
            match object.get(rule.name) {
                None if rule.required => {
                    return Err(ValidationError::new(
                        rule.name,
                        Constraint::Required,
                        format!("\"{}\" is required", rule.name),
                    ));
                }
                None => {}
                Some(value) => check_field(rule, value)?,
            }
        }

        if !self.allow_unknown {
            if let Some(key) = object
                .keys()
                .find(|key| !self.fields.iter().any(|rule| rule.name == key.as_str()))
            {
                return Err(ValidationError::new(
                    key,
                    Constraint::Unknown,
                    format!("\"{}\" is not allowed", key),
                ));
            }
        }

        Ok(())
    }
}

fn check_field(rule: &FieldRule, value: &Value) -> Result<(), ValidationError> {
    match rule.kind {
        FieldKind::Boolean => {
            if !value.is_boolean() {
                return Err(ValidationError::new(
                    rule.name,
                    Constraint::Type,
                    format!("\"{}\" must be a boolean", rule.name),
                ));
            }
        }
        FieldKind::String => {
            let text = value.as_str().ok_or_else(|| {
                ValidationError::new(rule.name, Constraint::Type, format!("\"{}\" must be a string", rule.name))
            })?;

            if text.is_empty() {
                return Err(ValidationError::new(
                    rule.name,
                    Constraint::NotEmpty,
                    format!("\"{}\" is not allowed to be empty", rule.name),
                ));
            }

            if rule.format == Some(Format::Email) && !is_email(text) {
                return Err(ValidationError::new(
                    rule.name,
                    Constraint::Email,
                    format!("\"{}\" must be a valid email", rule.name),
                ));
            }
        }
    }
    Ok(())
}

pub fn is_email(text: &str) -> bool {
    text.len() <= 254 && EMAIL_RE.is_match(text)
}
