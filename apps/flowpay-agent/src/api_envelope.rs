use axum::Json;
use axum::http::StatusCode;
use flowpay_commands::{CommandError, CompletionError, GeneratorError, PipelineError};
use serde::Serialize;
use serde_json::Value;

pub type EnvelopeResponse = (StatusCode, Json<CommandEnvelope>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    InvalidRequest,
    ValidationFailed,
    UnknownAction,
    InvalidParameters,
    DuplicateClient,
    UpstreamUnavailable,
    UpstreamInvalidReply,
    NotFound,
    InternalError,
}

impl ApiErrorCode {
    pub const ALL: [Self; 9] = [
        Self::InvalidRequest,
        Self::ValidationFailed,
        Self::UnknownAction,
        Self::InvalidParameters,
        Self::DuplicateClient,
        Self::UpstreamUnavailable,
        Self::UpstreamInvalidReply,
        Self::NotFound,
        Self::InternalError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::ValidationFailed => "validation_failed",
            Self::UnknownAction => "unknown_action",
            Self::InvalidParameters => "invalid_parameters",
            Self::DuplicateClient => "duplicate_client",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamInvalidReply => "upstream_invalid_reply",
            Self::NotFound => "not_found",
            Self::InternalError => "internal_error",
        }
    }

    pub const fn default_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest
            | Self::ValidationFailed
            | Self::UnknownAction
            | Self::InvalidParameters
            | Self::DuplicateClient => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable | Self::UpstreamInvalidReply | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn for_pipeline(error: &PipelineError) -> Self {
        match error {
            PipelineError::InvalidPrompt => Self::InvalidRequest,
            PipelineError::Validation { .. } => Self::ValidationFailed,
            PipelineError::Generation(GeneratorError::Parse { .. }) => Self::UpstreamInvalidReply,
            PipelineError::Generation(GeneratorError::Completion(
                CompletionError::MissingCredential
                | CompletionError::Timeout(_)
                | CompletionError::Transport(_)
                | CompletionError::Api { .. }
                | CompletionError::MalformedResponse(_),
            )) => Self::UpstreamUnavailable,
            PipelineError::Execution(CommandError::UnknownAction(_)) => Self::UnknownAction,
            PipelineError::Execution(CommandError::InvalidParameters { .. }) => {
                Self::InvalidParameters
            }
            PipelineError::Execution(CommandError::DuplicateClient { .. }) => Self::DuplicateClient,
            PipelineError::Execution(CommandError::Store(_)) => Self::InternalError,
        }
    }
}

/// Uniform response body of the agent routes. Absent fields are omitted.
#[derive(Debug, Default, Serialize)]
pub struct CommandEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl CommandEnvelope {
    #[must_use]
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: Option<String>) -> Self {
        self.action = action;
        self
    }
}

pub fn ok_envelope(action: &str, data: Value) -> CommandEnvelope {
    CommandEnvelope {
        success: true,
        action: Some(action.to_string()),
        data: Some(data),
        ..CommandEnvelope::default()
    }
}

pub fn error_envelope(code: ApiErrorCode, message: impl Into<String>) -> EnvelopeResponse {
    error_envelope_with_status(code.default_status(), code, message)
}

pub fn error_envelope_with_status(
    status: StatusCode,
    code: ApiErrorCode,
    message: impl Into<String>,
) -> EnvelopeResponse {
    (
        status,
        Json(CommandEnvelope {
            success: false,
            error: Some(message.into()),
            code: Some(code.as_str()),
            ..CommandEnvelope::default()
        }),
    )
}

/// Maps a pipeline failure to its status and envelope. Handler status codes pass through.
///
/// Validation failures carry their error list; an unusable model reply carries the raw text.
pub fn pipeline_error(error: &PipelineError) -> EnvelopeResponse {
    let code = ApiErrorCode::for_pipeline(error);
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (status, Json(mut envelope)) = error_envelope_with_status(status, code, error.to_string());
    match error {
        PipelineError::Validation {
            errors, command, ..
        } => {
            envelope.details = Some(errors.clone());
            envelope.command = command.clone();
        }
        PipelineError::Generation(generation) => {
            envelope.details = generation.raw_reply().map(|raw| vec![raw.to_string()]);
        }
        PipelineError::InvalidPrompt | PipelineError::Execution(_) => {}
    }
    (status, Json(envelope))
}

/// Body for a panic caught at the router edge. Detail is only exposed in development.
pub fn internal_error(detail: Option<String>) -> EnvelopeResponse {
    let (status, Json(mut envelope)) =
        error_envelope(ApiErrorCode::InternalError, "Internal server error");
    envelope.details = detail.map(|detail| vec![detail]);
    (status, Json(envelope))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use axum::http::StatusCode;
    use flowpay_commands::{CommandError, GeneratorError, PipelineError};
    use serde_json::json;

    use super::{ApiErrorCode, internal_error, ok_envelope, pipeline_error};

    #[test]
    fn error_codes_are_unique() {
        let mut codes = HashSet::new();
        for code in ApiErrorCode::ALL {
            assert!(codes.insert(code.as_str()), "duplicate error code: {}", code.as_str());
        }
    }

    #[test]
    fn validation_failure_carries_details_and_command() {
        let error = PipelineError::Validation {
            message: "AI generated invalid command",
            errors: vec!["Missing required field: data.name".to_string()],
            command: Some(json!({"action": "add_client", "data": {}})),
        };
        let (status, payload) = pipeline_error(&error);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(payload.0).expect("serialize payload");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "AI generated invalid command");
        assert_eq!(body["code"], "validation_failed");
        assert_eq!(body["details"][0], "Missing required field: data.name");
        assert_eq!(body["command"]["action"], "add_client");
    }

    #[test]
    fn handler_status_passes_through() {
        let error = PipelineError::Execution(CommandError::DuplicateClient {
            name: "Gamma".to_string(),
        });
        let (status, payload) = pipeline_error(&error);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(payload.0).expect("serialize payload");
        assert_eq!(body["error"], "Client already exists: Gamma");
        assert_eq!(body["code"], "duplicate_client");
        assert!(body.get("details").is_none());

        let error = PipelineError::Generation(GeneratorError::Parse {
            message: "expected value at line 1 column 1".to_string(),
            raw: "nope".to_string(),
        });
        let (status, payload) = pipeline_error(&error);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload.0.code, Some("upstream_invalid_reply"));
        assert_eq!(payload.0.details, Some(vec!["nope".to_string()]));
    }

    #[test]
    fn ok_envelope_omits_error_fields() {
        let body = serde_json::to_value(ok_envelope("show_pending_payments", json!({"count": 0})))
            .expect("serialize payload");
        assert_eq!(
            body,
            json!({"success": true, "action": "show_pending_payments", "data": {"count": 0}})
        );
    }

    #[test]
    fn internal_error_hides_detail_unless_given() {
        let (_status, payload) = internal_error(None);
        let body = serde_json::to_value(payload.0).expect("serialize payload");
        assert_eq!(body, json!({"success": false, "error": "Internal server error", "code": "internal_error"}));
    }
}
