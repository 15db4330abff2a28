//! Vertex AI REST client for labeler pools, datasets and labeling jobs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};

use super::{JobSpec, LabelingService, PoolSpec};

const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const SERVICE: &str = "Vertex AI";

const IMAGE_METADATA_SCHEMA_URI: &str =
    "gs://google-cloud-aiplatform/schema/dataset/metadata/image_1.0.0.yaml";
const IMAGE_CLASSIFICATION_IMPORT_SCHEMA_URI: &str =
    "gs://google-cloud-aiplatform/schema/dataset/ioformat/image_classification_single_label_io_format_1.0.0.yaml";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// A long-running operation as returned by the REST API
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecialistPoolBody<'a> {
    display_name: &'a str,
    specialist_manager_emails: &'a [String],
    specialist_worker_emails: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataLabelingJobBody<'a> {
    display_name: &'a str,
    datasets: [&'a str; 1],
    labeler_count: u32,
    instruction_uri: &'a str,
    inputs_schema_uri: &'a str,
    inputs: Value,
    specialist_pools: [&'a str; 1],
}

/// Vertex AI client authenticated with application default credentials
pub struct VertexAiClient {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    endpoint: Option<String>,
    poll_interval: Duration,
}

impl VertexAiClient {
    /// Creates a client using the given token provider
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            tokens,
            endpoint: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Creates a client from the environment's default credentials
    pub async fn from_environment() -> Result<Self> {
        let tokens = gcp_auth::provider().await?;
        Self::new(tokens)
    }

    /// Sends every request to `endpoint` instead of the regional API host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets how often long-running operations are polled
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn base_url(&self, region: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/v1", endpoint.trim_end_matches('/')),
            None => format!("https://{}-aiplatform.googleapis.com/v1", region),
        }
    }

    fn location_url(&self, project: &str, region: &str) -> String {
        format!("{}/projects/{}/locations/{}", self.base_url(region), project, region)
    }

    async fn send<R: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<R> {
        let token = self.tokens.token(&[SCOPE]).await?;
        let response = request.bearer_auth(token.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(Error::Service {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R> {
        self.send(self.client.post(url).json(body)).await
    }

    /// Polls an operation until it is done and returns its response
    async fn wait(&self, region: &str, mut operation: Operation) -> Result<Value> {
        while !operation.done {
            tracing::debug!(operation = %operation.name, "Waiting for operation");
            tokio::time::sleep(self.poll_interval).await;
            let url = format!("{}/{}", self.base_url(region), operation.name);
            operation = self.send(self.client.get(&url)).await?;
        }

        if let Some(error) = operation.error {
            return Err(Error::Service {
                service: SERVICE,
                status: u16::try_from(error.code).unwrap_or_default(),
                message: format!("operation {} failed: {}", operation.name, error.message),
            });
        }

        Ok(operation.response.unwrap_or(Value::Null))
    }

    async fn wait_for_name(&self, region: &str, operation: Operation) -> Result<String> {
        let response = self.wait(region, operation).await?;
        let named: Named = serde_json::from_value(response)?;
        Ok(named.name)
    }
}

#[async_trait]
impl LabelingService for VertexAiClient {
    async fn create_specialist_pool(&self, spec: &PoolSpec) -> Result<String> {
        let url = format!("{}/specialistPools", self.location_url(&spec.project, &spec.region));
        let body = SpecialistPoolBody {
            display_name: &spec.display_name,
            specialist_manager_emails: &spec.manager_emails,
            specialist_worker_emails: &spec.worker_emails,
        };

        let operation = self.post(&url, &body).await?;
        self.wait_for_name(&spec.region, operation).await
    }

    async fn create_dataset(&self, project: &str, region: &str, display_name: &str) -> Result<String> {
        let url = format!("{}/datasets", self.location_url(project, region));
        let body = json!({
            "displayName": display_name,
            "metadataSchemaUri": IMAGE_METADATA_SCHEMA_URI,
        });

        let operation = self.post(&url, &body).await?;
        self.wait_for_name(region, operation).await
    }

    async fn import_data(&self, dataset: &str, region: &str, import_file_uri: &str) -> Result<()> {
        let url = format!("{}/{}:import", self.base_url(region), dataset);
        let body = json!({
            "importConfigs": [{
                "gcsSource": { "uris": [import_file_uri] },
                "importSchemaUri": IMAGE_CLASSIFICATION_IMPORT_SCHEMA_URI,
            }]
        });

        let operation = self.post(&url, &body).await?;
        self.wait(region, operation).await?;
        Ok(())
    }

    async fn create_labeling_job(&self, project: &str, region: &str, spec: &JobSpec) -> Result<String> {
        let url = format!("{}/dataLabelingJobs", self.location_url(project, region));
        let body = DataLabelingJobBody {
            display_name: &spec.display_name,
            datasets: [spec.dataset.as_str()],
            labeler_count: 1,
            instruction_uri: &spec.instructions_uri,
            inputs_schema_uri: &spec.inputs_schema_uri,
            inputs: json!({ "annotation_specs": spec.class_names }),
            specialist_pools: [spec.specialist_pool.as_str()],
        };

        let job: Named = self.post(&url, &body).await?;
        Ok(job.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticTokens(Arc<gcp_auth::Token>);

    #[async_trait]
    impl TokenProvider for StaticTokens {
        async fn token(&self, _scopes: &[&str]) -> std::result::Result<Arc<gcp_auth::Token>, gcp_auth::Error> {
            Ok(Arc::clone(&self.0))
        }

        async fn project_id(&self) -> std::result::Result<Arc<str>, gcp_auth::Error> {
            Ok(Arc::from("p"))
        }
    }

    fn client(server: &MockServer) -> VertexAiClient {
        let token = serde_json::from_str(r#"{"access_token": "test-token", "expires_in": 3600}"#).unwrap();
        VertexAiClient::new(Arc::new(StaticTokens(Arc::new(token))))
            .unwrap()
            .with_endpoint(server.uri())
            .with_poll_interval(Duration::from_millis(1))
    }

    #[test]
    fn test_regional_base_url() {
        let token = serde_json::from_str(r#"{"access_token": "t", "expires_in": 3600}"#).unwrap();
        let client = VertexAiClient::new(Arc::new(StaticTokens(Arc::new(token)))).unwrap();
        assert_eq!(
            client.location_url("p", "europe-west4"),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/p/locations/europe-west4"
        );
    }

    #[tokio::test]
    async fn test_create_specialist_pool_waits_for_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p/locations/us-central1/specialistPools"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "displayName": "d_pool",
                "specialistManagerEmails": ["a@x.com"],
                "specialistWorkerEmails": ["a@x.com", "b@x.com"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/us-central1/operations/1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/p/locations/us-central1/operations/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/us-central1/operations/1",
                "done": true,
                "response": {"name": "projects/p/locations/us-central1/specialistPools/42"}
            })))
            .mount(&server)
            .await;

        let spec = PoolSpec {
            project: "p".to_string(),
            region: "us-central1".to_string(),
            display_name: "d_pool".to_string(),
            manager_emails: vec!["a@x.com".to_string()],
            worker_emails: vec!["a@x.com".to_string(), "b@x.com".to_string()],
        };
        let name = client(&server).create_specialist_pool(&spec).await.unwrap();
        assert_eq!(name, "projects/p/locations/us-central1/specialistPools/42");
    }

    #[tokio::test]
    async fn test_failed_operation_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p/locations/us-central1/datasets/1:import"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/us-central1/operations/2",
                "done": true,
                "error": {"code": 3, "message": "invalid import file"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .import_data(
                "projects/p/locations/us-central1/datasets/1",
                "us-central1",
                "gs://b/import_file.csv",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid import file"));
    }

    #[tokio::test]
    async fn test_create_labeling_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p/locations/europe-west4/dataLabelingJobs"))
            .and(body_partial_json(json!({
                "displayName": "d",
                "datasets": ["datasets/1"],
                "labelerCount": 1,
                "specialistPools": ["pools/5"],
                "inputs": {"annotation_specs": ["undamaged", "damaged"]},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/europe-west4/dataLabelingJobs/9",
                "state": "JOB_STATE_PENDING"
            })))
            .mount(&server)
            .await;

        let spec = JobSpec {
            display_name: "d".to_string(),
            dataset: "datasets/1".to_string(),
            specialist_pool: "pools/5".to_string(),
            instructions_uri: "gs://b/i.pdf".to_string(),
            inputs_schema_uri: "gs://b/s.yaml".to_string(),
            class_names: vec!["undamaged".to_string(), "damaged".to_string()],
        };
        let name = client(&server)
            .create_labeling_job("p", "europe-west4", &spec)
            .await
            .unwrap();
        assert_eq!(name, "projects/p/locations/europe-west4/dataLabelingJobs/9");
    }

    #[tokio::test]
    async fn test_http_error_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_dataset("p", "us-central1", "d")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Service { status: 403, .. }));
    }
}
