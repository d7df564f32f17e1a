use reqwest::multipart::Form;

/// Name of the form field carrying the submitted question.
pub const QUERY_FIELD: &str = "query";

/// Name of the optional form field carrying extra document context.
pub const CONTEXT_FIELD: &str = "pdf_context";

/// One outbound question for the answering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// The trimmed, non-empty text of a single submission.
    pub query: String,

    /// Optional document context sent alongside the query.
    pub context: Option<String>,
}

impl QueryRequest {
    /// Create a new `QueryRequest` with no context.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: None,
        }
    }

    /// Attach document context to this request.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// The form fields in the order they are sent.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![(QUERY_FIELD, self.query.as_str())];
        if let Some(context) = self.context.as_deref() {
            fields.push((CONTEXT_FIELD, context));
        }
        fields
    }

    /// Encode this request as a multipart form.
    pub fn to_form(&self) -> Form {
        self.fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name, value.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_only_by_default() {
        let request = QueryRequest::new("What is a keystone species?");
        assert_eq!(
            request.fields(),
            vec![("query", "What is a keystone species?")]
        );
    }

    #[test]
    fn context_adds_field() {
        let request =
            QueryRequest::new("Summarize").with_context(Some("Chapter 1: wetlands".to_string()));
        assert_eq!(
            request.fields(),
            vec![("query", "Summarize"), ("pdf_context", "Chapter 1: wetlands")]
        );
    }

    #[test]
    fn form_has_boundary() {
        let form = QueryRequest::new("ping").to_form();
        assert!(!form.boundary().is_empty());
    }
}
