//! Server responses and their classification.
//!
//! The server never tags its responses with an explicit type. Instead each
//! kind of response is recognized by its shape: which keys are present and
//! what values some of them hold. A `Classifier` tries an ordered list of
//! `Shape`s and wraps the decoded object in a `Replique` for the first one
//! that matches.

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PosteError, Result};

/// The kind of a classified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepliqueKind {
    /// Evaluation succeeded.
    Success,
    /// The code was incomplete or not syntactically valid.
    SyntaxError,
    /// Evaluation raised an error.
    Error,
    /// Completion candidates.
    Completions,
    /// A new context was created.
    NewContext,
    /// A kind registered by a library user.
    Other(String),
}

/// One requirement a decoded object must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `key` is present and holds exactly this string.
    Equals(String, String),
    /// `key` is present, whatever its value.
    Present(String),
}

impl Condition {
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals(key.into(), value.into())
    }

    pub fn present(key: impl Into<String>) -> Self {
        Self::Present(key.into())
    }

    fn holds(&self, object: &Map<String, Value>) -> bool {
        match self {
            Self::Equals(key, expected) => {
                object.get(key).and_then(Value::as_str) == Some(expected.as_str())
            }
            Self::Present(key) => object.contains_key(key),
        }
    }
}

/// A registry entry: how to recognize one kind of response.
#[derive(Debug, Clone)]
pub struct Shape {
    kind: RepliqueKind,
    conditions: Vec<Condition>,
    display: String,
}

impl Shape {
    pub fn new(kind: RepliqueKind, conditions: Vec<Condition>, display: impl Into<String>) -> Self {
        Self {
            kind,
            conditions,
            display: display.into(),
        }
    }

    pub const fn kind(&self) -> &RepliqueKind {
        &self.kind
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn display_field(&self) -> &str {
        &self.display
    }

    /// All conditions hold and the display field is present.
    pub fn matches(&self, object: &Map<String, Value>) -> bool {
        object.contains_key(&self.display) && self.conditions.iter().all(|c| c.holds(object))
    }
}

/// Ordered set of shapes. The first matching shape wins.
#[derive(Debug, Clone)]
pub struct Classifier {
    shapes: Vec<Shape>,
}

impl Default for Classifier {
    fn default() -> Self {
        let evaluate = |result: &str| {
            vec![
                Condition::equals("command", "evaluate"),
                Condition::equals("result", result),
            ]
        };

        Self {
            shapes: vec![
                Shape::new(RepliqueKind::Success, evaluate("success"), "value"),
                Shape::new(RepliqueKind::SyntaxError, evaluate("syntaxError"), "value"),
                Shape::new(RepliqueKind::Error, evaluate("error"), "value"),
                Shape::new(
                    RepliqueKind::Completions,
                    vec![
                        Condition::equals("command", "complete"),
                        Condition::present("completions"),
                    ],
                    "completions",
                ),
                Shape::new(
                    RepliqueKind::NewContext,
                    vec![Condition::equals("command", "uniqueContext")],
                    "context",
                ),
            ],
        }
    }
}

impl Classifier {
    /// A classifier with no shapes at all.
    pub const fn empty() -> Self {
        Self { shapes: Vec::new() }
    }

    /// Append a shape. It is tried after every shape already registered.
    #[must_use]
    pub fn register(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Classify a decoded response.
    pub fn classify(&self, value: Value) -> Result<Replique> {
        let Value::Object(object) = value else {
            return Err(PosteError::UnrecognizedResponse(value));
        };

        match self.shapes.iter().find(|shape| shape.matches(&object)) {
            Some(shape) => {
                debug!(kind = ?shape.kind, display = %shape.display, "Classified response");
                Ok(Replique {
                    kind: shape.kind.clone(),
                    display: shape.display.clone(),
                    fields: object,
                })
            }
            None => Err(PosteError::UnrecognizedResponse(Value::Object(object))),
        }
    }
}

/// A classified server response.
#[derive(Debug, Clone, PartialEq)]
pub struct Replique {
    kind: RepliqueKind,
    display: String,
    fields: Map<String, Value>,
}

impl Replique {
    pub const fn kind(&self) -> &RepliqueKind {
        &self.kind
    }

    /// The decoded response object, as received.
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Name of the key holding the primary payload.
    pub fn display_field(&self) -> &str {
        &self.display
    }

    /// The raw payload under the display field.
    pub fn display_value(&self) -> &Value {
        static NULL: Value = Value::Null;
        // Classification only succeeds when the display field is present.
        self.fields.get(&self.display).unwrap_or(&NULL)
    }

    /// Completion candidates, in server order. Empty for other kinds.
    ///
    /// String candidates are yielded as-is; any other JSON value is yielded
    /// as its compact JSON text, so nothing the server sent is dropped. A
    /// payload that is not an array counts as a single candidate.
    pub fn completions(&self) -> impl Iterator<Item = Cow<'_, str>> {
        let candidates: &[Value] = match (&self.kind, self.fields.get("completions")) {
            (RepliqueKind::Completions, Some(Value::Array(items))) => items.as_slice(),
            (RepliqueKind::Completions, Some(single)) => std::slice::from_ref(single),
            _ => &[],
        };
        candidates.iter().map(render)
    }

    /// Render the payload for a human.
    ///
    /// Completions are shown one candidate per line, strings verbatim,
    /// anything else as compact JSON.
    pub fn display(&self) -> String {
        if self.kind == RepliqueKind::Completions {
            return self.completions().collect::<Vec<_>>().join("\n");
        }
        render(self.display_value()).into_owned()
    }
}

fn render(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

impl fmt::Display for Replique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
