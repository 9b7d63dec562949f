//! Request message types.
//!
//! A `Poste` is serialized as a single JSON object whose keys are drawn from
//! `command`, `code` and `context`. Absent fields are left out entirely.

use serde::Serialize;

use crate::error::{PosteError, Result};

/// The command a request asks the server to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    /// Evaluate code in a context.
    Evaluate,
    /// List completions for a code prefix.
    Complete,
    /// Create a new context whose name starts with the given prefix.
    UniqueContext,
}

impl Command {
    /// The wire name of this command.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evaluate => "evaluate",
            Self::Complete => "complete",
            Self::UniqueContext => "uniqueContext",
        }
    }
}

/// Request sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Poste {
    command: Command,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl Poste {
    /// Build a request. An empty `context` is treated as absent.
    pub fn new(command: Command, code: impl Into<String>, context: Option<String>) -> Self {
        Self {
            command,
            code: code.into(),
            context: context.filter(|c| !c.is_empty()),
        }
    }

    pub fn evaluate(code: impl Into<String>, context: Option<String>) -> Self {
        Self::new(Command::Evaluate, code, context)
    }

    pub fn complete(code: impl Into<String>, context: Option<String>) -> Self {
        Self::new(Command::Complete, code, context)
    }

    /// Request a new context. `prefix` is carried in the `code` field.
    pub fn unique_context(prefix: impl Into<String>) -> Self {
        Self::new(Command::UniqueContext, prefix, None)
    }

    pub const fn command(&self) -> Command {
        self.command
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(PosteError::Serialize)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(PosteError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn decoded(poste: &Poste) -> Value {
        serde_json::from_str(&poste.to_json().unwrap()).unwrap()
    }

    #[test]
    fn evaluate_without_context() {
        let poste = Poste::evaluate("1+1", None);
        assert_eq!(
            poste.to_json().unwrap(),
            r#"{"command":"evaluate","code":"1+1"}"#
        );
    }

    #[test]
    fn complete_with_context() {
        let poste = Poste::complete("foo.ba", Some("ctx1".to_string()));
        assert_eq!(
            poste.to_json().unwrap(),
            r#"{"command":"complete","code":"foo.ba","context":"ctx1"}"#
        );
    }

    #[test]
    fn unique_context_carries_prefix_as_code() {
        let poste = Poste::unique_context("session-");
        assert_eq!(
            decoded(&poste),
            json!({"command": "uniqueContext", "code": "session-"})
        );
    }

    #[test]
    fn empty_context_is_omitted() {
        let poste = Poste::evaluate("x", Some(String::new()));
        assert!(poste.context().is_none());
        let value = decoded(&poste);
        assert!(value.get("context").is_none());
        assert!(!poste.to_json().unwrap().contains("null"));
    }

    #[test]
    fn context_present_iff_supplied() {
        let cases = [
            (Command::Evaluate, None),
            (Command::Evaluate, Some("a")),
            (Command::Complete, None),
            (Command::Complete, Some("b")),
            (Command::UniqueContext, Some("c")),
        ];
        for (command, context) in cases {
            let code = "var x = \"quoted\"\n\u{e9}";
            let poste = Poste::new(command, code, context.map(String::from));
            let value = decoded(&poste);
            assert_eq!(value["command"], command.as_str());
            assert_eq!(value["code"], code);
            assert_eq!(value.get("context").and_then(Value::as_str), context);
        }
    }

    #[test]
    fn bytes_match_text() {
        let poste = Poste::evaluate("[1, 2]", Some("main".into()));
        assert_eq!(poste.to_bytes().unwrap(), poste.to_json().unwrap().into_bytes());
    }
}
