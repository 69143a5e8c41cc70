//! Wire models for the cloud disk REST API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::DiskError;
use crate::types::{Resource, ResourceKind};

/// Resource as returned by `GET /resources`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: DateTime<Utc>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<ResourceList>,
}

/// Page of embedded children.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<ApiResource>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
}

impl From<ApiResource> for Resource {
    fn from(api: ApiResource) -> Self {
        let children = api
            .embedded
            .map(|list| list.items.into_iter().map(Resource::from).collect())
            .unwrap_or_default();
        Resource {
            path: api.path,
            name: api.name,
            kind: api.kind,
            size: api.size,
            modified: api.modified,
            children,
        }
    }
}

/// Pre-signed link returned by the download/upload endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub operation_id: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub templated: bool,
}

/// Structured error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub error: String,
}

impl ApiErrorBody {
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.description.is_empty() && self.error.is_empty()
    }

    fn summary(&self) -> String {
        [&self.message, &self.description, &self.error]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Map the remote error onto the local taxonomy.
    pub fn into_disk_error(self, status: u16) -> DiskError {
        let summary = self.summary();
        match self.error.as_str() {
            "DiskNotFoundError" | "DiskPathDoesntExistsError" => DiskError::NotFound(summary),
            "DiskResourceAlreadyExistsError" | "DiskPathPointsToExistentDirectoryError" => {
                DiskError::AlreadyExists(summary)
            }
            _ if status == 404 => DiskError::NotFound(summary),
            _ if status == 409 => DiskError::AlreadyExists(summary),
            _ => DiskError::Api {
                status,
                message: summary,
            },
        }
    }
}

/// Classify a non-success response body.
pub fn classify_error(status: u16, body: &[u8]) -> DiskError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(err) if !err.is_empty() => err.into_disk_error(status),
        _ => DiskError::Api {
            status,
            message: format!(
                "unknown response from API: {}",
                String::from_utf8_lossy(body)
            ),
        },
    }
}
