//! Per-entity attribute store (point reads + change subscription).

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{Connection, Signal};

/// Player attribute holding the archetype tag ("Bald", "Hunter", ...).
pub const ARCHETYPE_ATTRIBUTE: &str = "Character";

/// Character attribute holding the raw combo counter.
pub const COMBO_ATTRIBUTE: &str = "Combo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

/// Change notification; `value == None` means the attribute was cleared.
#[derive(Debug, Clone)]
pub struct AttributeChange {
    pub key: String,
    pub value: Option<AttributeValue>,
}

#[derive(Debug, Default)]
pub struct AttributeStore {
    values: RefCell<HashMap<String, AttributeValue>>,
    changed: Signal<AttributeChange>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.values.borrow().get(key).cloned()
    }

    /// Sets a value; fires only when it actually changed.
    pub fn set(&self, key: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        let previous = self.values.borrow_mut().insert(key.to_string(), value.clone());
        if previous.as_ref() != Some(&value) {
            self.changed.fire(&AttributeChange {
                key: key.to_string(),
                value: Some(value),
            });
        }
    }

    pub fn clear(&self, key: &str) {
        let previous = self.values.borrow_mut().remove(key);
        if previous.is_some() {
            self.changed.fire(&AttributeChange {
                key: key.to_string(),
                value: None,
            });
        }
    }

    /// Subscribes to changes of a single key.
    pub fn on_changed(
        &self,
        key: &str,
        handler: impl Fn(Option<&AttributeValue>) + 'static,
    ) -> Connection {
        let key = key.to_string();
        self.changed.connect(move |change| {
            if change.key == key {
                handler(change.value.as_ref());
            }
        })
    }

    pub fn changed(&self) -> &Signal<AttributeChange> {
        &self.changed
    }
}
