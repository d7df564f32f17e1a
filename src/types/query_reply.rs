use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Substituted for the answer when a reply carries none.
pub const FALLBACK_ANSWER: &str = "No response received.";

/// A decoded reply from the answering service.
///
/// The service's reply shape is not trusted.  Any JSON document is accepted;
/// fields that are missing or of the wrong type are simply absent here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryReply {
    /// The answer text, if the reply carried a non-empty string `response`.
    pub answer: Option<String>,

    /// Sources the service cited, in the order given.
    pub sources: Vec<String>,

    /// Document text the service extracted, if any.  The client can adopt it
    /// as the context for later questions.
    pub pdf_context: Option<String>,
}

impl QueryReply {
    /// Create a `QueryReply` carrying only an answer.
    pub fn answered(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    /// Decode a reply body.  Only a body that is not JSON at all is an error.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            Error::serialization(format!("Failed to parse reply: {e}"), Some(Box::new(e)))
        })?;
        Ok(Self::from_value(&value))
    }

    /// Extract the known fields from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        // A struct also deserializes from a sequence; only objects carry fields.
        let raw = if value.is_object() {
            RawReply::deserialize(value).unwrap_or_default()
        } else {
            RawReply::default()
        };
        let sources = match raw.sources {
            Some(Value::Array(sources)) => sources
                .into_iter()
                .filter_map(|source| match source {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Self {
            answer: non_empty_string(raw.response),
            sources,
            pdf_context: non_empty_string(raw.pdf_context),
        }
    }

    /// The text of the assistant turn this reply produces.
    pub fn answer_or_fallback(&self) -> &str {
        self.answer.as_deref().unwrap_or(FALLBACK_ANSWER)
    }
}

/// The reply as the service sends it.  Every field is loosely typed so that a
/// wrong type degrades to "absent" instead of failing the whole reply.
#[derive(Debug, Default, Deserialize)]
struct RawReply {
    #[serde(default)]
    response: Option<Value>,
    #[serde(default)]
    sources: Option<Value>,
    #[serde(default)]
    pdf_context: Option<Value>,
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_is_extracted() {
        let reply = QueryReply::from_value(&json!({
            "response": "A species with disproportionate ecological impact.",
            "sources": ["wikipedia", 7, "field guide"],
        }));
        assert_eq!(
            reply.answer_or_fallback(),
            "A species with disproportionate ecological impact."
        );
        assert_eq!(reply.sources, vec!["wikipedia", "field guide"]);
        assert!(reply.pdf_context.is_none());
    }

    #[test]
    fn missing_answer_falls_back() {
        let reply = QueryReply::from_value(&json!({"error": "Failed to generate a valid plan"}));
        assert!(reply.answer.is_none());
        assert_eq!(reply.answer_or_fallback(), FALLBACK_ANSWER);
    }

    #[test]
    fn non_string_answer_falls_back() {
        let reply = QueryReply::from_value(&json!({"response": {"text": "nested"}}));
        assert_eq!(reply.answer_or_fallback(), FALLBACK_ANSWER);

        let reply = QueryReply::from_value(&json!({"response": ""}));
        assert_eq!(reply.answer_or_fallback(), FALLBACK_ANSWER);
    }

    #[test]
    fn other_shapes_are_tolerated() {
        let reply = QueryReply::from_value(&json!(["not", "an", "object"]));
        assert_eq!(reply, QueryReply::default());

        let reply = QueryReply::from_slice(b"null").unwrap();
        assert_eq!(reply.answer_or_fallback(), FALLBACK_ANSWER);
    }

    #[test]
    fn extracted_context_is_kept() {
        let reply = QueryReply::from_value(&json!({
            "response": "Three wetland species are listed.",
            "pdf_context": "Survey 2023: heron, newt, sedge.",
        }));
        assert_eq!(
            reply.pdf_context.as_deref(),
            Some("Survey 2023: heron, newt, sedge.")
        );

        let reply = QueryReply::from_value(&json!({"response": "x", "pdf_context": 12}));
        assert!(reply.pdf_context.is_none());
        let reply = QueryReply::from_value(&json!({"response": "x", "sources": "wikipedia"}));
        assert_eq!(reply.answer_or_fallback(), "x");
        assert!(reply.sources.is_empty());
    }

    #[test]
    fn non_json_body_is_an_error() {
        let err = QueryReply::from_slice(b"<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
