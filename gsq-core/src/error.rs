// gsq-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum GsqError {
    // --- CONFIGURATION & DATA CONTRACT ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- CREDENTIALS ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    // --- EVALUATION ENDPOINT ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Endpoint(#[from] EndpointError),

    // --- BATCH ANNOTATION ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Annotation(#[from] AnnotationError),

    // --- IO, DATABASE, HTTP ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for GsqError {
    fn from(err: std::io::Error) -> Self {
        GsqError::Infrastructure(InfrastructureError::Io(err))
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum AuthError {
    #[error("AzureML On Behalf of credentials not available in this environment.")]
    #[diagnostic(
        code(gsq::auth::unavailable),
        help("The job must run with its own identity (AZUREML_OBO_CANARY_TOKEN is required).")
    )]
    CredentialUnavailable,

    #[error("Unable to initialize the on-behalf-of credential: missing argument '{0}'")]
    #[diagnostic(code(gsq::auth::invalid_args))]
    InvalidCredentialArgs(String),

    #[error("Malformed workspace connection id: {0}")]
    #[diagnostic(
        code(gsq::auth::connection_id),
        help("Expected /subscriptions/<id>/resourceGroups/<rg>/providers/Microsoft.MachineLearningServices/workspaces/<ws>/connections/<name> or 'test_connection'.")
    )]
    MalformedConnectionId(String),

    #[error("Received unexpected endpoint type '{0}', only Azure Open AI endpoints are supported at this time")]
    #[diagnostic(code(gsq::auth::connection_type))]
    UnsupportedConnectionType(String),

    #[error("Unable to retrieve the token to establish a Workspace Connection: {0}")]
    #[diagnostic(code(gsq::auth::no_run_context))]
    MissingRunContext(String),

    #[error("Failed while sending a request to {url}: {reason}")]
    #[diagnostic(code(gsq::auth::request))]
    RequestFailed { url: String, reason: String },

    #[error("Invalid response from {url}: {reason}")]
    #[diagnostic(code(gsq::auth::response))]
    InvalidResponse { url: String, reason: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum EndpointError {
    #[error("Invalid Azure endpoint domain URL: {0}.")]
    #[diagnostic(
        code(gsq::endpoint::domain),
        help("Expected <name>.openai.azure.com or <name>.inference.ml.azure.com, optionally followed by /openai.")
    )]
    InvalidDomain(String),

    #[error("Model deployment name is required for live evaluation")]
    #[diagnostic(code(gsq::endpoint::deployment))]
    MissingDeployment,

    #[error("Received unexpected HTTP status: {status} {body}")]
    #[diagnostic(code(gsq::endpoint::status))]
    UnexpectedStatus { status: u16, body: String },

    #[error("Error encountered while attempting to get model type: {0}")]
    #[diagnostic(code(gsq::endpoint::model_type))]
    ModelTypeUnavailable(String),
}

#[derive(Error, Debug, Diagnostic)]
pub enum AnnotationError {
    #[error("Evaluator failed on batch {batch}: {reason}")]
    #[diagnostic(code(gsq::annotation::evaluator))]
    EvaluatorFailed { batch: usize, reason: String },

    #[error("Evaluator returned {got} rating rows for a batch of {expected}")]
    #[diagnostic(code(gsq::annotation::arity))]
    RowCountMismatch { expected: usize, got: usize },

    #[error("Evaluator returned {got} ratings for row {index}, expected one per metric ({expected})")]
    #[diagnostic(code(gsq::annotation::rating_count))]
    RatingCountMismatch {
        index: i64,
        expected: usize,
        got: usize,
    },

    #[error("Could not read a 1-5 rating for '{metric}' from: {reply}")]
    #[diagnostic(code(gsq::annotation::unparsable))]
    UnparsableRating { metric: String, reply: String },
}
