//! Pendant button events
//!
//! Desk reports presses on the pilot buttons as small JSON objects mapping a
//! button name to a flag, e.g. `{"check": true}`. This module turns them into
//! a single [`Button`] and defines the seam through which the recorder stops
//! the event source.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Buttons the recorder reacts to, in the order they are checked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    /// Record a sample
    Check,
    /// Delete the last sample
    Down,
    /// Save and quit
    Cross,
    /// Switch hole
    Circle,
}

impl Button {
    /// Priority order used when several flags are set in one event
    pub const PRIORITY: [Button; 4] = [Button::Check, Button::Down, Button::Cross, Button::Circle];

    /// Key of this button in the event payload
    pub fn key(self) -> &'static str {
        match self {
            Button::Check => "check",
            Button::Down => "down",
            Button::Cross => "cross",
            Button::Circle => "circle",
        }
    }
}

/// One event from the pendant: button names mapped to arbitrary JSON flags
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonEvent(Map<String, Value>);

impl ButtonEvent {
    /// Event with a single button set to `true`
    pub fn pressed(button: Button) -> Self {
        let mut flags = Map::new();
        flags.insert(button.key().to_string(), Value::Bool(true));
        ButtonEvent(flags)
    }

    /// Parses an event as sent over the Desk event stream
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Sets a flag, replacing any previous value
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Whether `key` is present with a truthy value
    pub fn is_set(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(truthy)
    }

    /// The highest-priority button set in this event, if any
    pub fn button(&self) -> Option<Button> {
        Button::PRIORITY.into_iter().find(|b| self.is_set(b.key()))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Source of button events that the recorder can switch off
#[cfg_attr(test, mockall::automock)]
pub trait ButtonListener {
    /// Stop delivering button events
    fn stop_listening(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"check": true}"#, Some(Button::Check))]
    #[case(r#"{"down": true, "check": false}"#, Some(Button::Down))]
    #[case(r#"{"circle": true, "cross": true}"#, Some(Button::Cross))]
    #[case(r#"{"check": true, "circle": true}"#, Some(Button::Check))]
    #[case(r#"{"circle": 1}"#, Some(Button::Circle))]
    #[case(r#"{"circle": 0}"#, None)]
    #[case(r#"{"up": true}"#, None)]
    #[case(r#"{}"#, None)]
    #[case(r#"{"check": null, "down": ""}"#, None)]
    fn priority_and_truthiness(#[case] json: &str, #[case] expected: Option<Button>) {
        let event = ButtonEvent::from_json(json).unwrap();
        assert_eq!(event.button(), expected);
    }

    #[test]
    fn builder_sets_flags() {
        let event = ButtonEvent::pressed(Button::Circle).with("down", true);
        assert!(event.is_set("circle"));
        assert_eq!(event.button(), Some(Button::Down));
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(ButtonEvent::from_json("[1, 2]").is_err());
    }
}
