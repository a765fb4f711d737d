// gsq-core/src/infrastructure/auth/workspace_connection.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::session::{RUN_ID, SERVICE_ENDPOINT, SessionContext};
use crate::error::{AuthError, GsqError};
use crate::infrastructure::auth::obo::{
    COGNITIVE_SERVICES_RESOURCE, MANAGEMENT_RESOURCE, OnBehalfOfCredential,
};
use crate::ports::credential::{
    ConnectionRef, CredentialProvider, DEFAULT_API_VERSION, ResolvedCredential, TokenKind,
};
use crate::ports::http::{HttpRequest, HttpTransport};

const LIST_SECRETS_API_VERSION: &str = "2023-08-01-preview";
const SECRETS_TIMEOUT: Duration = Duration::from_secs(5);

const AZURE_OPENAI: &str = "azureopenai";
const METADATA_API_VERSION: &str = "ApiVersion";
const METADATA_DEPLOYMENT_API_VERSION: &str = "DeploymentApiVersion";
const METADATA_API_TYPE: &str = "ApiType";

#[derive(Debug, Deserialize)]
struct ConnectionResource {
    properties: ConnectionProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionProperties {
    category: String,
    target: String,
    #[serde(default)]
    auth_type: Option<String>,
    #[serde(default)]
    credentials: Option<ConnectionSecrets>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionSecrets {
    #[serde(default)]
    key: Option<String>,
}

/// `AzureOpenAI`, `azure_open_ai` and `azureopenai` are the same category.
fn normalize_category(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolves endpoint credentials: the test sentinel short-circuits, a
/// workspace connection is read through the workspace service.
pub struct WorkspaceConnectionProvider {
    session: Arc<SessionContext>,
    obo: Arc<OnBehalfOfCredential>,
    transport: Arc<dyn HttpTransport>,
}

impl WorkspaceConnectionProvider {
    pub fn new(
        session: Arc<SessionContext>,
        obo: Arc<OnBehalfOfCredential>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            session,
            obo,
            transport,
        }
    }

    fn secrets_url(
        &self,
        subscription: &str,
        resource_group: &str,
        workspace: &str,
        connection: &str,
    ) -> Result<String, AuthError> {
        if self.session.run_id().is_none() {
            return Err(AuthError::MissingRunContext(format!("{} is not set", RUN_ID)));
        }
        let service = self
            .session
            .get(SERVICE_ENDPOINT)
            .ok_or_else(|| AuthError::MissingRunContext(format!("{} is not set", SERVICE_ENDPOINT)))?;

        Ok(format!(
            "{}/rp/workspaces/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}/connections/{}/listsecrets?api-version={}",
            service.trim_end_matches('/'),
            subscription,
            resource_group,
            workspace,
            connection,
            LIST_SECRETS_API_VERSION
        ))
    }

    #[instrument(skip(self))]
    async fn list_secrets(
        &self,
        subscription: &str,
        resource_group: &str,
        workspace: &str,
        connection: &str,
    ) -> Result<ResolvedCredential, AuthError> {
        let url = self.secrets_url(subscription, resource_group, workspace, connection)?;
        let management = self.obo.get_token(MANAGEMENT_RESOURCE).await?;

        info!(url = %url, "Retrieving workspace connection");
        let request = HttpRequest::post(&url, json!({}), SECRETS_TIMEOUT)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", management.token));

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
                reason: format!("HTTP {} {}", response.status, response.body),
            });
        }

        let resource: ConnectionResource =
            response.json().map_err(|e| AuthError::InvalidResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        let props = resource.properties;

        if normalize_category(&props.category) != AZURE_OPENAI {
            return Err(AuthError::UnsupportedConnectionType(props.category));
        }

        let api_version = props
            .metadata
            .get(METADATA_DEPLOYMENT_API_VERSION)
            .or_else(|| props.metadata.get(METADATA_API_VERSION))
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let api_type = props.metadata.get(METADATA_API_TYPE).cloned();

        let key = props
            .credentials
            .and_then(|c| c.key)
            .filter(|k| !k.is_empty());
        let uses_aad = props
            .auth_type
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("aad"));

        let (token, token_kind) = match key {
            Some(key) if !uses_aad => (key, TokenKind::ApiKey),
            _ => {
                let bearer = self.obo.get_token(COGNITIVE_SERVICES_RESOURCE).await?;
                (bearer.token, TokenKind::Bearer)
            }
        };

        info!(target = %props.target, "Retrieved workspace connection");
        Ok(ResolvedCredential {
            endpoint_domain: props.target,
            api_version,
            api_type,
            token,
            token_kind,
        })
    }
}

#[async_trait]
impl CredentialProvider for WorkspaceConnectionProvider {
    async fn resolve(&self, connection: &ConnectionRef) -> Result<ResolvedCredential, GsqError> {
        match connection {
            ConnectionRef::Test => Ok(ResolvedCredential::test()),
            ConnectionRef::Workspace {
                subscription,
                resource_group,
                workspace,
                connection,
            } => Ok(self
                .list_secrets(subscription, resource_group, workspace, connection)
                .await?),
        }
    }
}
