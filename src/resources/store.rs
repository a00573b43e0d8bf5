//! Resource store client
//!
//! Talks to the Keptn configuration service (`/v1/project/...` API).
//! Resource contents travel base64-encoded.

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::ServiceScope;
use crate::common::{Error, Result};

/// Page size used when listing resources
const PAGE_SIZE: &str = "50";

/// Read access to the remote resource store
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List the URIs of all resources registered for a service
    async fn list_resources(&self, scope: &ServiceScope) -> Result<Vec<String>>;

    /// Fetch a resource by URI
    ///
    /// Returns `None` when the resource does not exist.
    async fn get_resource(&self, scope: &ServiceScope, uri: &str) -> Result<Option<Vec<u8>>>;
}

/// Level at which a resource is looked up, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Service,
    Stage,
    Project,
}

const LOOKUP_ORDER: [Level; 3] = [Level::Service, Level::Stage, Level::Project];

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    resources: Vec<ResourceEntry>,
    #[serde(rename = "nextPageKey", default)]
    next_page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceEntry {
    #[serde(rename = "resourceURI")]
    uri: String,
    #[serde(rename = "resourceContent", default)]
    content: Option<String>,
}

/// HTTP client for the configuration service
pub struct HttpResourceStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpResourceStore {
    /// Create a client for the configuration service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            Error::Config(format!("Invalid resource store URL '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Resource store URL '{}' cannot be used as a base",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(crate::event::SERVICE_NAME)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build resource store client: {}", e)))?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn resources_url(&self, scope: &ServiceScope, level: Level) -> Url {
        let segments: Vec<&str> = match level {
            Level::Service => vec![
                "v1",
                "project",
                scope.project.as_str(),
                "stage",
                scope.stage.as_str(),
                "service",
                scope.service.as_str(),
                "resource",
            ],
            Level::Stage => vec![
                "v1",
                "project",
                scope.project.as_str(),
                "stage",
                scope.stage.as_str(),
                "resource",
            ],
            Level::Project => vec!["v1", "project", scope.project.as_str(), "resource"],
        };
        self.endpoint(&segments)
    }

    fn resource_url(&self, scope: &ServiceScope, level: Level, uri: &str) -> Url {
        let mut url = self.resources_url(scope, level);
        if let Ok(mut path) = url.path_segments_mut() {
            // The URI is a single percent-encoded segment, slashes included
            path.push(uri);
        }
        url
    }

    async fn get_at_level(
        &self,
        scope: &ServiceScope,
        level: Level,
        uri: &str,
    ) -> Result<Option<Vec<u8>>> {
        let url = self.resource_url(scope, level, uri);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::resource_store(&url, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::resource_store(
                &url,
                format!("status {}", response.status()),
            ));
        }

        let entry: ResourceEntry = response
            .json()
            .await
            .map_err(|e| Error::resource_store(&url, e))?;
        decode_content(&entry).map(Some)
    }
}

#[async_trait]
impl ResourceStore for HttpResourceStore {
    async fn list_resources(&self, scope: &ServiceScope) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        let mut next_page_key: Option<String> = None;

        loop {
            let mut url = self.resources_url(scope, Level::Service);
            url.query_pairs_mut().append_pair("pageSize", PAGE_SIZE);
            if let Some(key) = &next_page_key {
                url.query_pairs_mut().append_pair("nextPageKey", key);
            }

            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| Error::resource_store(&url, e))?;
            if !response.status().is_success() {
                return Err(Error::resource_store(
                    &url,
                    format!("status {}", response.status()),
                ));
            }

            let page: ResourceList = response
                .json()
                .await
                .map_err(|e| Error::resource_store(&url, e))?;
            uris.extend(page.resources.into_iter().map(|r| r.uri));

            match page.next_page_key {
                Some(key) if !is_last_page(&key) => next_page_key = Some(key),
                _ => break,
            }
        }

        Ok(uris)
    }

    async fn get_resource(&self, scope: &ServiceScope, uri: &str) -> Result<Option<Vec<u8>>> {
        for level in LOOKUP_ORDER {
            if let Some(content) = self.get_at_level(scope, level, uri).await? {
                tracing::debug!(uri, ?level, "Resource found");
                return Ok(Some(content));
            }
        }
        Ok(None)
    }
}

fn is_last_page(key: &str) -> bool {
    key.is_empty() || key == "0"
}

fn decode_content(entry: &ResourceEntry) -> Result<Vec<u8>> {
    match &entry.content {
        None => Ok(Vec::new()),
        Some(encoded) => base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| {
                Error::resource_store(&entry.uri, format!("invalid resource content: {}", e))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn store(base: &str) -> HttpResourceStore {
        HttpResourceStore::new(base, Duration::from_secs(1)).unwrap()
    }

    fn scope() -> ServiceScope {
        ServiceScope::new("sockshop", "staging", "carts")
    }

    #[test]
    fn test_service_level_url() {
        let url = store("http://configuration-service:8080")
            .resource_url(&scope(), Level::Service, "gatling/gatling.conf.yaml");
        assert_eq!(
            url.as_str(),
            "http://configuration-service:8080/v1/project/sockshop/stage/staging/service/carts/resource/gatling%2Fgatling.conf.yaml"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let url = store("http://keptn.example.com/api/configuration-service/")
            .resource_url(&scope(), Level::Project, "gatling/x.scala");
        assert_eq!(
            url.as_str(),
            "http://keptn.example.com/api/configuration-service/v1/project/sockshop/resource/gatling%2Fx.scala"
        );
    }

    #[test]
    fn test_stage_level_url() {
        let url = store("http://cs").resources_url(&scope(), Level::Stage);
        assert_eq!(url.path(), "/v1/project/sockshop/stage/staging/resource");
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(HttpResourceStore::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpResourceStore::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_decode_content() {
        let entry: ResourceEntry = serde_json::from_str(
            r#"{"resourceURI": "/gatling/gatling.conf.yaml", "resourceContent": "c3BlY192ZXJzaW9uOiAxLjAK"}"#,
        )
        .unwrap();
        assert_eq!(decode_content(&entry).unwrap(), b"spec_version: 1.0\n");

        let bad = ResourceEntry {
            uri: "/gatling/x".into(),
            content: Some("***".into()),
        };
        assert!(decode_content(&bad).is_err());
    }

    #[test]
    fn test_page_termination() {
        assert!(is_last_page(""));
        assert!(is_last_page("0"));
        assert!(!is_last_page("50"));
    }

    /// HTTP/1.1 server answering every request with `respond(target)`
    struct StubServer {
        base: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start<F>(respond: F) -> Self
        where
            F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);
            let respond = Arc::new(respond);

            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let seen = Arc::clone(&seen);
                    let respond = Arc::clone(&respond);
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            let n = socket.read(&mut chunk).await.unwrap_or(0);
                            if n == 0 {
                                return;
                            }
                            head.extend_from_slice(&chunk[..n]);
                        }

                        let head = String::from_utf8_lossy(&head);
                        let target = head.split_whitespace().nth(1).unwrap_or("").to_string();
                        seen.lock().unwrap().push(target.clone());

                        let (status, body) = (*respond)(&target);
                        let response = format!(
                            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
            });

            Self { base, requests }
        }

        fn store(&self) -> HttpResourceStore {
            HttpResourceStore::new(&self.base, Duration::from_secs(5)).unwrap()
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn resource_body(uri: &str, content: &str) -> String {
        serde_json::json!({
            "resourceURI": uri,
            "resourceContent": base64::engine::general_purpose::STANDARD.encode(content),
        })
        .to_string()
    }

    const SERVICE_RESOURCE: &str =
        "/v1/project/sockshop/stage/staging/service/carts/resource/gatling%2Fgatling.conf.yaml";
    const STAGE_RESOURCE: &str =
        "/v1/project/sockshop/stage/staging/resource/gatling%2Fgatling.conf.yaml";
    const PROJECT_RESOURCE: &str = "/v1/project/sockshop/resource/gatling%2Fgatling.conf.yaml";

    #[tokio::test]
    async fn test_get_resource_falls_back_to_project_level() {
        let server = StubServer::start(|target| {
            if target == PROJECT_RESOURCE {
                (200, resource_body("gatling/gatling.conf.yaml", "spec_version: '0.1.0'"))
            } else {
                (404, String::new())
            }
        })
        .await;

        let content = server
            .store()
            .get_resource(&scope(), "gatling/gatling.conf.yaml")
            .await
            .unwrap();

        assert_eq!(content.as_deref(), Some(&b"spec_version: '0.1.0'"[..]));
        assert_eq!(
            server.requests(),
            vec![SERVICE_RESOURCE, STAGE_RESOURCE, PROJECT_RESOURCE]
        );
    }

    #[tokio::test]
    async fn test_get_resource_prefers_service_level() {
        let server = StubServer::start(|target| {
            (200, resource_body("gatling/gatling.conf.yaml", target))
        })
        .await;

        let content = server
            .store()
            .get_resource(&scope(), "gatling/gatling.conf.yaml")
            .await
            .unwrap();

        assert_eq!(content, Some(SERVICE_RESOURCE.as_bytes().to_vec()));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_get_resource_absent_everywhere() {
        let server = StubServer::start(|_| (404, String::new())).await;

        let content = server
            .store()
            .get_resource(&scope(), "gatling/gatling.conf.yaml")
            .await
            .unwrap();

        assert!(content.is_none());
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_get_resource_server_error() {
        let server = StubServer::start(|_| (500, String::new())).await;

        let err = server
            .store()
            .get_resource(&scope(), "gatling/gatling.conf.yaml")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ResourceStore { .. }));
        assert!(err.to_string().contains("500"));
        assert_eq!(server.requests(), vec![SERVICE_RESOURCE]);
    }

    #[tokio::test]
    async fn test_list_resources_follows_pages() {
        let server = StubServer::start(|target| {
            let body = if target.contains("nextPageKey=2") {
                r#"{"resources": [{"resourceURI": "/gatling/b.scala"}], "nextPageKey": "0"}"#
            } else {
                r#"{"resources": [{"resourceURI": "/gatling/a.scala"}, {"resourceURI": "/helm/values.yaml"}], "nextPageKey": "2"}"#
            };
            (200, body.to_string())
        })
        .await;

        let uris = server.store().list_resources(&scope()).await.unwrap();

        assert_eq!(
            uris,
            vec!["/gatling/a.scala", "/helm/values.yaml", "/gatling/b.scala"]
        );
        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0],
            "/v1/project/sockshop/stage/staging/service/carts/resource?pageSize=50"
        );
        assert_eq!(
            requests[1],
            "/v1/project/sockshop/stage/staging/service/carts/resource?pageSize=50&nextPageKey=2"
        );
    }

    #[tokio::test]
    async fn test_list_resources_server_error() {
        let server = StubServer::start(|_| (500, String::new())).await;

        let err = server.store().list_resources(&scope()).await.unwrap_err();

        assert!(matches!(err, Error::ResourceStore { .. }));
        assert!(err.to_string().contains("500"));
    }
}
