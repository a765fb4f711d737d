// gsq-core/src/infrastructure/endpoint.rs

use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::EndpointError;
use crate::ports::credential::{ResolvedCredential, TEST_MODEL_TYPE};
use crate::ports::http::{HttpRequest, HttpTransport};

/// Newer API versions do not expose the deployment's model on this route.
pub const MODEL_DISCOVERY_API_VERSION: &str = "2022-12-01";

const MAX_DOMAIN_LEN: usize = 255;

static RE_DOMAIN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.(inference\.ml|openai)\.azure\.com(/openai)?$",
    )
});

#[derive(Deserialize)]
struct DeploymentInfo {
    model: String,
}

/// Trims whitespace, one trailing `/` and the scheme, then checks the
/// domain against the Azure OpenAI / AzureML inference host shapes.
pub fn normalize_domain(domain: &str) -> Result<String, EndpointError> {
    let trimmed = domain.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("https://").unwrap_or(trimmed);

    let re = RE_DOMAIN
        .as_ref()
        .map_err(|e| EndpointError::InvalidDomain(format!("{} ({})", trimmed, e)))?;
    if trimmed.is_empty() || trimmed.len() > MAX_DOMAIN_LEN || !re.is_match(trimmed) {
        return Err(EndpointError::InvalidDomain(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// `https://{domain}/openai/deployments/{deployment}[?api-version={v}]`
pub fn build_url(
    domain: &str,
    deployment: &str,
    api_version: &str,
) -> Result<String, EndpointError> {
    let domain = normalize_domain(domain)?;
    let mut url = format!("https://{}/openai/deployments/{}", domain, deployment);
    if !api_version.is_empty() {
        url.push_str("?api-version=");
        url.push_str(api_version);
    }
    Ok(url)
}

pub struct EndpointResolver {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl EndpointResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// One GET, no retry. Anything but a 200 carrying `model` is fatal.
    #[instrument(skip(self, credential))]
    pub async fn get_model_type(
        &self,
        credential: &ResolvedCredential,
        url: &str,
    ) -> Result<String, EndpointError> {
        let (auth_name, auth_value) = credential.auth_header();
        let request = HttpRequest::get(url, self.timeout)
            .header("Content-Type", "application/json")
            .header(auth_name, auth_value);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| EndpointError::ModelTypeUnavailable(e.to_string()))?;

        if response.status != 200 {
            return Err(EndpointError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        let info: DeploymentInfo = response
            .json()
            .map_err(|e| EndpointError::ModelTypeUnavailable(e.to_string()))?;
        Ok(info.model)
    }

    /// Model type of `deployment`; the test connection reports a fixed model
    /// without any network call.
    pub async fn discover_model_type(
        &self,
        credential: &ResolvedCredential,
        deployment: &str,
    ) -> Result<String, EndpointError> {
        if credential.is_test() {
            return Ok(TEST_MODEL_TYPE.to_string());
        }
        if deployment.trim().is_empty() {
            return Err(EndpointError::MissingDeployment);
        }

        let url = build_url(
            &credential.endpoint_domain,
            deployment.trim(),
            MODEL_DISCOVERY_API_VERSION,
        )?;
        let model_type = self.get_model_type(credential, &url).await?;
        info!(model_type = %model_type, "Discovered deployment model");
        Ok(model_type)
    }
}
