// gsq-core/src/infrastructure/auth/obo.rs

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::domain::session::{
    ARM_PROJECT_NAME, ARM_RESOURCE_GROUP, ARM_SUBSCRIPTION, ARM_WORKSPACE_NAME,
    CLUSTER_IDENTIFIER, OBO_CANARY_TOKEN, OBO_SERVICE_ENDPOINT, OID, RUN_ID, RUN_TOKEN_EXPIRY,
    SessionContext, TID, TOKEN_SERVICE_ENDPOINT,
};
use crate::error::AuthError;
use crate::ports::http::{HttpRequest, HttpTransport};

pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com";
pub const COGNITIVE_SERVICES_RESOURCE: &str = "https://cognitiveservices.azure.com";

const TOKEN_TIMEOUT: Duration = Duration::from_secs(5);
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Arguments `from_args` cannot do without.
pub const REQUIRED_ARGS: [&str; 4] = [
    CLUSTER_IDENTIFIER,
    TOKEN_SERVICE_ENDPOINT,
    RUN_ID,
    RUN_TOKEN_EXPIRY,
];

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Informational only; cached tokens are never refreshed.
    pub expires_on: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_on", &self.expires_on)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// `https://x/.default` and `https://x` address the same resource.
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Delegated identity of the job, exchanged through the cluster token service.
pub struct OnBehalfOfCredential {
    session: SessionContext,
    transport: Arc<dyn HttpTransport>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl OnBehalfOfCredential {
    /// Explicit arguments win over the ambient session for the required keys.
    pub fn from_args(
        args: &HashMap<String, String>,
        session: &SessionContext,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, AuthError> {
        let mut ctx = session.clone();
        for key in REQUIRED_ARGS {
            let value = args
                .get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AuthError::InvalidCredentialArgs(key.to_string()))?;
            ctx = ctx.with(key, value.as_str());
        }
        Ok(Self::from_session(&ctx, transport))
    }

    pub fn from_session(session: &SessionContext, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            session: session.clone(),
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.session.get(OBO_CANARY_TOKEN).is_some()
    }

    fn require(&self, key: &str) -> Result<&str, AuthError> {
        self.session
            .get(key)
            .ok_or_else(|| AuthError::InvalidCredentialArgs(key.to_string()))
    }

    fn token_url(&self) -> Result<String, AuthError> {
        Ok(format!(
            "https://{}/api/v1/proxy/obotoken/v1.0/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}/getuseraccesstokenforspark",
            self.require(TOKEN_SERVICE_ENDPOINT)?,
            self.require(ARM_SUBSCRIPTION)?,
            self.require(ARM_RESOURCE_GROUP)?,
            self.require(ARM_WORKSPACE_NAME)?,
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let canary = self
            .session
            .get(OBO_CANARY_TOKEN)
            .ok_or(AuthError::CredentialUnavailable)?;
        let resource = scope_to_resource(scope);

        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.get(resource) {
            return Ok(token.clone());
        }

        let url = self.token_url()?;
        let body = json!({
            "oboToken": canary,
            "oid": self.session.get(OID),
            "tid": self.session.get(TID),
            "resource": resource,
            "experimentName": self.session.get(ARM_PROJECT_NAME),
            "runId": self.session.get(RUN_ID),
        });

        let request = HttpRequest::post(&url, body, TOKEN_TIMEOUT)
            .header("Content-Type", "application/json;charset=utf-8")
            .header("x-ms-proxy-host", self.session.get(OBO_SERVICE_ENDPOINT).unwrap_or_default())
            .header("obo-access-token", canary)
            .header(
                "x-ms-cluster-identifier",
                self.session.get(CLUSTER_IDENTIFIER).unwrap_or_default(),
            );

        info!("Attempting to get token from AzureML OBO service");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(AuthError::RequestFailed {
                url,
                reason: format!("HTTP {}", response.status),
            });
        }

        let parsed: TokenResponse = response.json().map_err(|e| AuthError::InvalidResponse {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let token = AccessToken {
            token: parsed.token,
            expires_on: Utc::now() + ChronoDuration::seconds(TOKEN_LIFETIME_SECS),
        };
        cache.insert(resource.to_string(), token.clone());
        info!("Finished getting token from AzureML OBO service");
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, header};
    use anyhow::Result;

    fn session() -> SessionContext {
        SessionContext::from_pairs([
            (CLUSTER_IDENTIFIER, "cluster-1"),
            (TOKEN_SERVICE_ENDPOINT, "tokens.example.net"),
            (RUN_ID, "run-42"),
            (RUN_TOKEN_EXPIRY, "1700000000"),
            (OBO_SERVICE_ENDPOINT, "obo.example.net"),
            (OBO_CANARY_TOKEN, "canary"),
            (ARM_SUBSCRIPTION, "sub"),
            (ARM_RESOURCE_GROUP, "rg"),
            (ARM_WORKSPACE_NAME, "ws"),
            (ARM_PROJECT_NAME, "exp"),
            (OID, "oid-1"),
            (TID, "tid-1"),
        ])
    }

    #[tokio::test]
    async fn test_get_token_request_shape_and_cache() -> Result<()> {
        let transport = Arc::new(ScriptedTransport::new().respond(200, r#"{"token":"abc"}"#));
        let cred = OnBehalfOfCredential::from_session(&session(), transport.clone());

        let first = cred.get_token("https://management.azure.com/.default").await?;
        let second = cred.get_token(MANAGEMENT_RESOURCE).await?;
        assert_eq!(first.token, "abc");
        assert_eq!(second, first);
        assert_eq!(transport.calls(), 1);

        let req = transport.request(0);
        assert_eq!(
            req.url,
            "https://tokens.example.net/api/v1/proxy/obotoken/v1.0/subscriptions/sub/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/ws/getuseraccesstokenforspark"
        );
        assert_eq!(req.timeout, Duration::from_secs(5));
        assert!(!req.retry);
        assert_eq!(header(&req, "x-ms-proxy-host"), Some("obo.example.net"));
        assert_eq!(header(&req, "obo-access-token"), Some("canary"));
        assert_eq!(header(&req, "x-ms-cluster-identifier"), Some("cluster-1"));

        let body = req.body.unwrap();
        assert_eq!(body["resource"], "https://management.azure.com");
        assert_eq!(body["runId"], "run-42");
        assert_eq!(body["experimentName"], "exp");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_canary_is_unavailable() {
        let transport = Arc::new(ScriptedTransport::new());
        let ctx = SessionContext::from_pairs([(RUN_ID, "run-42")]);
        let cred = OnBehalfOfCredential::from_session(&ctx, transport.clone());

        assert!(!cred.is_available());
        let err = cred.get_token(MANAGEMENT_RESOURCE).await;
        assert!(matches!(err, Err(AuthError::CredentialUnavailable)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_success_is_fatal_without_retry() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(503, "busy")
                .respond(200, r#"{"token":"late"}"#),
        );
        let cred = OnBehalfOfCredential::from_session(&session(), transport.clone());

        let err = cred.get_token(MANAGEMENT_RESOURCE).await;
        assert!(matches!(err, Err(AuthError::RequestFailed { .. })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_json_response() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, "<html>"));
        let cred = OnBehalfOfCredential::from_session(&session(), transport);

        let err = cred.get_token(MANAGEMENT_RESOURCE).await;
        assert!(matches!(err, Err(AuthError::InvalidResponse { .. })));
    }

    #[test]
    fn test_from_args_requires_all_keys() {
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport::new());
        let mut args: HashMap<String, String> = REQUIRED_ARGS
            .iter()
            .map(|k| (k.to_string(), "v".to_string()))
            .collect();
        assert!(
            OnBehalfOfCredential::from_args(&args, &SessionContext::default(), transport.clone())
                .is_ok()
        );

        args.remove(RUN_TOKEN_EXPIRY);
        let err = OnBehalfOfCredential::from_args(&args, &SessionContext::default(), transport);
        assert!(
            matches!(err, Err(AuthError::InvalidCredentialArgs(k)) if k == RUN_TOKEN_EXPIRY)
        );
    }

    #[test]
    fn test_from_args_overrides_session() {
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport::new());
        let args: HashMap<String, String> = REQUIRED_ARGS
            .iter()
            .map(|k| (k.to_string(), format!("arg-{}", k)))
            .collect();
        let cred = OnBehalfOfCredential::from_args(&args, &session(), transport).unwrap();
        assert_eq!(cred.session.get(RUN_ID), Some("arg-AZUREML_RUN_ID"));
        assert_eq!(cred.session.get(OBO_CANARY_TOKEN), Some("canary"));
    }
}
