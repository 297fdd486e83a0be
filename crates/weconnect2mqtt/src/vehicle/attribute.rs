use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde_json::Value;

/// Raw value of one vehicle status attribute.
///
/// Enum-valued attributes carry their API wire label as a string; any
/// display normalization happens in the observer, per attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Str(s) => Value::String(s.clone()),
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(f) => Value::from(*f),
            AttributeValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => f.write_str(s),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

/// Change-kind flag set attached to every attribute event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeFlags(u8);

impl ChangeFlags {
    /// The attribute was touched by a refresh, changed or not.
    pub const UPDATED: ChangeFlags = ChangeFlags(1);
    /// The value actually differs from the previous one.
    pub const VALUE_CHANGED: ChangeFlags = ChangeFlags(1 << 1);
    /// The attribute became enabled.
    pub const ENABLED: ChangeFlags = ChangeFlags(1 << 2);
    /// The attribute became disabled.
    pub const DISABLED: ChangeFlags = ChangeFlags(1 << 3);

    pub const ALL: ChangeFlags = ChangeFlags(0b1111);

    pub fn contains(self, other: ChangeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: ChangeFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ChangeFlags {
    type Output = ChangeFlags;

    fn bitor(self, rhs: ChangeFlags) -> ChangeFlags {
        ChangeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangeFlags {
    fn bitor_assign(&mut self, rhs: ChangeFlags) {
        self.0 |= rhs.0;
    }
}

/// One typed change notification, delivered synchronously during a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEvent {
    pub address: String,
    pub value: Option<AttributeValue>,
    pub enabled: bool,
    pub flags: ChangeFlags,
}

#[derive(Debug)]
struct Attribute {
    address: String,
    value: Option<AttributeValue>,
    enabled: bool,
}

/// Holds one vehicle's attributes and diffs refreshed snapshots against
/// them, yielding one event per attribute per refresh in registration order.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    attributes: Vec<Attribute>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of an attribute, if enabled.
    pub fn value(&self, address: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.address == address)
            .and_then(|a| a.value.as_ref())
    }

    /// Whether the attribute was present in the last applied snapshot.
    pub fn enabled(&self, address: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.address == address && a.enabled)
    }

    /// Apply a flattened snapshot and return the resulting change events.
    ///
    /// Every listed attribute yields an event with `UPDATED` set;
    /// `VALUE_CHANGED` and `ENABLED`/`DISABLED` are added only on real
    /// transitions. Attributes are created on first sight.
    pub fn apply(
        &mut self,
        snapshot: impl IntoIterator<Item = (&'static str, Option<AttributeValue>)>,
    ) -> Vec<AttributeEvent> {
        let mut events = Vec::new();

        for (address, new_value) in snapshot {
            let enabled = new_value.is_some();
            let mut flags = ChangeFlags::UPDATED;

            let index = match self.attributes.iter().position(|a| a.address == address) {
                Some(index) => index,
                None => {
                    self.attributes.push(Attribute {
                        address: address.to_string(),
                        value: None,
                        enabled: false,
                    });
                    self.attributes.len() - 1
                }
            };
            let attribute = &mut self.attributes[index];

            if enabled != attribute.enabled {
                flags |= if enabled {
                    ChangeFlags::ENABLED
                } else {
                    ChangeFlags::DISABLED
                };
            }
            if new_value != attribute.value {
                flags |= ChangeFlags::VALUE_CHANGED;
            }

            attribute.enabled = enabled;
            attribute.value = new_value;

            events.push(AttributeEvent {
                address: address.to_string(),
                value: attribute.value.clone(),
                enabled,
                flags,
            });
        }

        events
    }
}
