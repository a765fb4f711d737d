// gsq-core/src/ports/credential.rs

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::Serialize;

use crate::error::{AuthError, GsqError};

/// Sentinel connection id that bypasses authentication.
pub const TEST_CONNECTION: &str = "test_connection";
pub const DEFAULT_API_VERSION: &str = "2023-07-01-preview";
pub const TEST_MODEL_TYPE: &str = "gpt-4";

const CONNECTION_ID_PATTERN: &str = r"^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.MachineLearningServices/workspaces/([^/]+)/connections/([^/]+)/?$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRef {
    Test,
    Workspace {
        subscription: String,
        resource_group: String,
        workspace: String,
        connection: String,
    },
}

impl ConnectionRef {
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw == TEST_CONNECTION {
            return Ok(Self::Test);
        }

        let re = RegexBuilder::new(CONNECTION_ID_PATTERN)
            .case_insensitive(true)
            .build()
            .map_err(|e| AuthError::MalformedConnectionId(e.to_string()))?;

        let caps = re
            .captures(raw)
            .ok_or_else(|| AuthError::MalformedConnectionId(raw.to_string()))?;

        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();
        Ok(Self::Workspace {
            subscription: group(1),
            resource_group: group(2),
            workspace: group(3),
            connection: group(4),
        })
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    ApiKey,
    Bearer,
}

/// Everything needed to call the evaluation endpoint, acquired once per run.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub endpoint_domain: String,
    pub api_version: String,
    pub api_type: Option<String>,
    pub token: String,
    pub token_kind: TokenKind,
}

impl ResolvedCredential {
    pub fn test() -> Self {
        Self {
            endpoint_domain: TEST_CONNECTION.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_type: None,
            token: String::new(),
            token_kind: TokenKind::ApiKey,
        }
    }

    pub fn is_test(&self) -> bool {
        self.endpoint_domain == TEST_CONNECTION
    }

    pub fn auth_header(&self) -> (&'static str, String) {
        match self.token_kind {
            TokenKind::ApiKey => ("api-key", self.token.clone()),
            TokenKind::Bearer => ("Authorization", format!("Bearer {}", self.token)),
        }
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("endpoint_domain", &self.endpoint_domain)
            .field("api_version", &self.api_version)
            .field("api_type", &self.api_type)
            .field("token_kind", &self.token_kind)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, connection: &ConnectionRef) -> Result<ResolvedCredential, GsqError>;
}
