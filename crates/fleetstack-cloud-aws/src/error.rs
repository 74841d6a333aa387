//! AWS provider error types

use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use fleetstack_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation}: request throttled ({message})")]
    Throttled { operation: String, message: String },

    #[error("{operation}: service unreachable ({message})")]
    Unreachable { operation: String, message: String },

    #[error("{operation}: credentials rejected ({message})")]
    Credentials { operation: String, message: String },

    #[error("{operation}: {resource} not found")]
    NotFound { operation: String, resource: String },

    #[error("{operation} failed [{code}]: {message}")]
    Api {
        operation: String,
        code: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, AwsError>;

const THROTTLING_CODES: [&str; 4] = [
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

const SERVICE_UNAVAILABLE_CODES: [&str; 5] = [
    "ServiceUnavailable",
    "InternalFailure",
    "InternalError",
    "Unavailable",
    "RequestTimeout",
];

const CREDENTIAL_CODES: [&str; 5] = [
    "AuthFailure",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
];

/// Classify an error code returned by a service
///
/// `resource` names the thing the call was about, used for not-found errors.
pub(crate) fn from_code(
    operation: &str,
    resource: &str,
    code: Option<&str>,
    message: String,
) -> AwsError {
    let operation = operation.to_string();
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => AwsError::Throttled { operation, message },
        Some(code) if SERVICE_UNAVAILABLE_CODES.contains(&code) => {
            AwsError::Unreachable { operation, message }
        }
        Some(code) if CREDENTIAL_CODES.contains(&code) => {
            AwsError::Credentials { operation, message }
        }
        Some(code) if code.ends_with(".NotFound") => AwsError::NotFound {
            operation,
            resource: resource.to_string(),
        },
        Some("ValidationError") if message.contains("does not exist") => AwsError::NotFound {
            operation,
            resource: resource.to_string(),
        },
        code => AwsError::Api {
            operation,
            code: code.unwrap_or("Unknown").to_string(),
            message,
        },
    }
}

/// Classify an SDK error
pub(crate) fn from_sdk<E, R>(operation: &str, resource: &str, err: SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            AwsError::Unreachable {
                operation: operation.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            }
        }
        _ => {
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            from_code(operation, resource, err.code(), message)
        }
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Throttled { .. } => CloudError::Throttled(err.to_string()),
            AwsError::Unreachable { .. } => CloudError::Unavailable(err.to_string()),
            AwsError::Credentials { .. } => CloudError::AuthenticationFailed(err.to_string()),
            AwsError::NotFound { ref operation, ref resource } => {
                if operation.starts_with("ec2:") {
                    CloudError::InstanceNotFound(resource.clone())
                } else {
                    CloudError::StackNotFound(resource.clone())
                }
            }
            AwsError::Api { .. } => CloudError::ApiError(err.to_string()),
        }
    }
}
