//! Persisted record representation and the domain <-> record adapters.
//!
//! Records are flat-keyed maps of typed field values, the shape a
//! document/key-value backend stores natively. Every numeric field crosses
//! this boundary as an exact `Decimal`; conversion back to `f64` happens only
//! when a record is decoded for the wire or the domain.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use al_types::{store_decimal, wire_f64, AlResult, Cycle, Project, Variant};

/// One typed field of a persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Num(Decimal),
    Bool(bool),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    Null,
}

/// A persisted entity: field name to typed value.
pub type Record = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Numeric field from a wire-side `f64`, stored as an exact decimal.
    pub fn num(value: f64) -> Self {
        Self::Num(store_decimal(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Num(d) => d.to_i64(),
            _ => None,
        }
    }

    /// Numeric value converted to `f64` (the wire representation).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Num(d) => Some(wire_f64(*d)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Build a field value from a JSON value, capturing numbers as exact
    /// decimals parsed from their literal text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Num(decimal_from_literal(&n.to_string()))
                }
            }
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Wire-side JSON rendering; decimals degrade to `f64` here and only here.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Num(d) => serde_json::Number::from_f64(wire_f64(*d))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Str(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn decimal_from_literal(literal: &str) -> Decimal {
    Decimal::from_str(literal)
        .or_else(|_| Decimal::from_scientific(literal))
        .unwrap_or(Decimal::ZERO)
}

/// Encode any serializable entity as a flat record.
fn encode<T: Serialize>(entity: &T) -> AlResult<Record> {
    let value = serde_json::to_value(entity)?;
    match FieldValue::from_json(&value) {
        FieldValue::Map(map) => Ok(map),
        other => Ok(BTreeMap::from([("value".to_string(), other)])),
    }
}

/// Decode a record back into a domain entity.
fn decode<T: DeserializeOwned>(record: &Record) -> AlResult<T> {
    let value = Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    );
    Ok(serde_json::from_value(value)?)
}

pub fn project_record(project: &Project) -> AlResult<Record> {
    encode(project)
}

pub fn project_from_record(record: &Record) -> AlResult<Project> {
    decode(record)
}

pub fn cycle_record(cycle: &Cycle) -> AlResult<Record> {
    encode(cycle)
}

pub fn cycle_from_record(record: &Record) -> AlResult<Cycle> {
    decode(record)
}

pub fn variant_record(variant: &Variant) -> AlResult<Record> {
    encode(variant)
}

pub fn variant_from_record(record: &Record) -> AlResult<Variant> {
    decode(record)
}
