//! Integration tests for the authorized compute client using wiremock
//!
//! A single mock server plays both the metadata server (token endpoint) and
//! the Compute Engine API.

use gce_provider::gcp::auth::{CredentialSource, MetadataEndpoint};
use gce_provider::gcp::compute::{ComputeClientBuilder, ComputeService, ComputeServiceBuilder};
use gce_provider::gcp::http::AuthorizedClient;
use serde_json::json;
use wiremock::matchers::{bearer_token, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

async fn mount_token(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(header("Metadata-Flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

fn compute_for(server: &MockServer) -> ComputeService {
    let source = CredentialSource::Metadata(MetadataEndpoint::with_host(&server.uri()));
    let http = AuthorizedClient::from_source(&source).expect("client should build");
    ComputeServiceBuilder::new()
        .with_base_url(format!("{}/compute/v1/", server.uri()))
        .build(http)
        .expect("compute service should build")
}

mod http_client_tests {
    use super::*;

    /// Requests carry the metadata token as a bearer token
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/regions/us-central1"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "us-central1",
                "status": "UP"
            })))
            .mount(&server)
            .await;

        let compute = compute_for(&server);
        let region = compute
            .get_region("test-project", "us-central1")
            .await
            .expect("Request should succeed");

        assert_eq!(region["name"], "us-central1");
        assert_eq!(region["status"], "UP");
    }

    /// The token is fetched once and reused across requests
    #[tokio::test]
    async fn test_token_reused_across_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-token",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/regions/us-east1"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "us-east1"})))
            .expect(3)
            .mount(&server)
            .await;

        let compute = compute_for(&server);
        for _ in 0..3 {
            compute.get_region("test-project", "us-east1").await.unwrap();
        }
    }

    /// 403 surfaces as an API failure carrying the status
    #[tokio::test]
    async fn test_403_returns_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/restricted-project/regions/us-central1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission denied"}
            })))
            .mount(&server)
            .await;

        let err = compute_for(&server)
            .get_region("restricted-project", "us-central1")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("403"));
        assert!(gce_provider::gcp::http::format_gcp_error(&err).starts_with("Permission denied"));
    }

    /// A failing metadata server stops the request before the API is called
    #[tokio::test]
    async fn test_metadata_failure_blocks_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/regions/us-central1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = compute_for(&server)
            .get_region("test-project", "us-central1")
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("metadata server"));
    }

    /// POST sends the JSON body
    #[tokio::test]
    async fn test_post_with_body() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/instances/vm-1/stop"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "compute#operation",
                "status": "RUNNING"
            })))
            .mount(&server)
            .await;

        let compute = compute_for(&server);
        let url = compute.zonal_url("test-project", "us-central1-a", "instances/vm-1/stop");
        let op = compute
            .http()
            .post(&url, Some(&json!({})))
            .await
            .unwrap();

        assert_eq!(op["kind"], "compute#operation");
    }

    /// Empty response bodies come back as null
    #[tokio::test]
    async fn test_delete_empty_response() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/compute/v1/projects/test-project/global/networks/old"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let compute = compute_for(&server);
        let url = compute.global_url("test-project", "networks/old");
        let result = compute.http().delete(&url).await.unwrap();

        assert!(result.is_null());
    }
}

mod compute_list_tests {
    use super::*;

    /// Zones are filtered to the requested region and pages are followed
    #[tokio::test]
    async fn test_list_zones_follows_pages() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let region = |r: &str| format!("https://compute.googleapis.com/compute/v1/projects/p/regions/{}", r);

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "us-central1-a", "region": region("us-central1")},
                    {"name": "europe-west1-b", "region": region("europe-west1")}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "us-central1-f", "region": region("us-central1")},
                    {"name": "us-east1-b", "region": region("us-east1")}
                ],
                "nextPageToken": "page-2"
            })))
            .mount(&server)
            .await;

        let zones = compute_for(&server)
            .list_zones("test-project", "us-central1")
            .await
            .unwrap();

        assert_eq!(zones, vec!["us-central1-a", "us-central1-f"]);
    }

    /// An empty zone lists no instances
    #[tokio::test]
    async fn test_list_instances_empty() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/zones/us-central1-a/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "compute#instanceList"
            })))
            .mount(&server)
            .await;

        let instances = compute_for(&server)
            .list_instances("test-project", "us-central1-a")
            .await
            .unwrap();

        assert!(instances.is_empty());
    }
}
