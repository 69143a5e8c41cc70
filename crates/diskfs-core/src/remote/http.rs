//! REST client for the cloud disk API.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::ResourceClient;
use super::api::{ApiResource, Link, classify_error};
use crate::config::DiskConfig;
use crate::constants::MINIMAL_FIELDS;
use crate::error::{DiskError, DiskResult};
use crate::types::{DiskInfo, Resource, normalize_resource};

/// Cloud disk client over HTTPS.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    api_base: String,
    page_size: u32,
    root_prefix: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("api_base", &self.api_base)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build a client authenticating with `token`.
    pub fn new(token: &str, config: &DiskConfig) -> DiskResult<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("OAuth {token}"))
            .map_err(|_| DiskError::internal("token is not a valid header value"))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
            root_prefix: config.root_prefix.clone(),
        })
    }

    /// Build a client from a config that carries a token.
    pub fn from_config(config: &DiskConfig) -> DiskResult<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DiskError::internal("no OAuth token configured"))?;
        Self::new(token, config)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.api_base)
    }

    /// Send a request and return the body if the status is one of `expected`.
    async fn send(
        &self,
        req: RequestBuilder,
        expected: &[StatusCode],
    ) -> DiskResult<(StatusCode, Vec<u8>)> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();
        if expected.contains(&status) {
            Ok((status, body))
        } else {
            tracing::debug!(status = status.as_u16(), "unexpected response status");
            Err(classify_error(status.as_u16(), &body))
        }
    }

    async fn request_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> DiskResult<T> {
        let (_, body) = self.send(req, &[StatusCode::OK]).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_resource(&self, path: &str, limit: u32, offset: u32) -> DiskResult<ApiResource> {
        let mut req = self.http.get(self.url("/resources")).query(&[
            ("path", path.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);
        if limit == 0 {
            req = req.query(&[("fields", MINIMAL_FIELDS.join(","))]);
        }
        self.request_json(req).await
    }

    /// Ask for a pre-signed transfer link.
    async fn get_link(&self, endpoint: &str, query: &[(&str, String)]) -> DiskResult<Link> {
        let link: Link = self
            .request_json(self.http.get(self.url(endpoint)).query(query))
            .await?;
        if link.templated {
            tracing::warn!(href = %link.href, "templated link used as-is");
        }
        Ok(link)
    }

    fn link_request(&self, link: &Link) -> DiskResult<RequestBuilder> {
        let method = Method::from_bytes(link.method.as_bytes())
            .map_err(|_| DiskError::internal(format!("bad link method {:?}", link.method)))?;
        Ok(self.http.request(method, &link.href))
    }

    fn normalize(&self, api: ApiResource) -> Resource {
        normalize_resource(Resource::from(api), &self.root_prefix)
    }
}

#[async_trait]
impl ResourceClient for HttpClient {
    async fn fetch_metadata(&self, path: &str, include_children: bool) -> DiskResult<Resource> {
        tracing::debug!(path, include_children, "fetch metadata");
        if !include_children {
            let api = self.get_resource(path, 0, 0).await?;
            return Ok(self.normalize(api));
        }

        let mut api = self.get_resource(path, self.page_size, 0).await?;
        if let Some(mut list) = api.embedded.take() {
            let mut offset = list.items.len() as u32;
            while offset < list.total {
                let page = self.get_resource(path, self.page_size, offset).await?;
                let items = page.embedded.map(|e| e.items).unwrap_or_default();
                if items.is_empty() {
                    tracing::warn!(path, offset, total = list.total, "listing ended early");
                    break;
                }
                offset += items.len() as u32;
                list.items.extend(items);
            }
            api.embedded = Some(list);
        }
        Ok(self.normalize(api))
    }

    async fn fetch_file_bytes(&self, path: &str) -> DiskResult<Vec<u8>> {
        tracing::debug!(path, "download");
        let link = self
            .get_link("/resources/download", &[("path", path.to_string())])
            .await?;
        let (_, body) = self.send(self.link_request(&link)?, &[StatusCode::OK]).await?;
        Ok(body)
    }

    async fn upload_file_bytes(&self, path: &str, data: &[u8], overwrite: bool) -> DiskResult<()> {
        tracing::debug!(path, len = data.len(), overwrite, "upload");
        let mut query = vec![("path", path.to_string())];
        if overwrite {
            query.push(("overwrite", "true".to_string()));
        }
        let link = self.get_link("/resources/upload", &query).await?;
        let req = self.link_request(&link)?.body(data.to_vec());
        self.send(req, &[StatusCode::CREATED, StatusCode::ACCEPTED])
            .await?;
        Ok(())
    }

    async fn create_directory(&self, path: &str) -> DiskResult<()> {
        tracing::debug!(path, "mkdir");
        let req = self
            .http
            .put(self.url("/resources"))
            .query(&[("path", path)]);
        self.send(req, &[StatusCode::CREATED]).await?;
        Ok(())
    }

    async fn delete_node(&self, path: &str, permanent: bool) -> DiskResult<()> {
        tracing::debug!(path, permanent, "delete");
        let mut req = self
            .http
            .delete(self.url("/resources"))
            .query(&[("path", path)]);
        if permanent {
            req = req.query(&[("permanently", "true")]);
        }
        let (status, _) = self
            .send(req, &[StatusCode::NO_CONTENT, StatusCode::ACCEPTED])
            .await?;
        if status == StatusCode::ACCEPTED {
            tracing::warn!(path, "delete accepted, completing asynchronously");
        }
        Ok(())
    }

    async fn disk_info(&self) -> DiskResult<DiskInfo> {
        self.request_json(self.http.get(self.url(""))).await
    }
}
