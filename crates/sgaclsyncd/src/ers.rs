//! Typed client for the ISE ERS configuration API
//!
//! All resources come back as JSON envelopes with a single top-level key
//! naming the resource type (`BulkStatus`, `EgressMatrixCell`, `Sgt`,
//! `Sgacl`). A response missing its envelope key is a data error, surfaced
//! as [`SgaclSyncError::Envelope`] rather than retried.
//!
//! TLS certificate verification is disabled: ISE deployments this daemon
//! targets run self-signed ERS certificates. The daemon logs a warning at
//! startup so the trade-off stays visible.

use crate::config::Config;
use crate::error::{Result, SgaclSyncError};
use crate::types::BulkOperationId;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use tracing::debug;

/// Terminal status of a bulk resource entry
pub const BULK_STATUS_SUCCESS: &str = "SUCCESS";

/// Status of one resource inside a bulk operation
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceStatus {
    pub id: String,
    pub status: String,
}

/// Bulk operation status envelope content
#[derive(Debug, Clone, Deserialize)]
pub struct BulkStatus {
    #[serde(rename = "bulkId", default)]
    pub bulk_id: Option<String>,
    #[serde(rename = "resourcesStatus", default)]
    pub resources_status: Vec<ResourceStatus>,
}

/// Egress matrix cell resource
#[derive(Debug, Clone, Deserialize)]
pub struct EgressCell {
    pub id: String,
    pub name: String,
    #[serde(rename = "sourceSgtId")]
    pub source_sgt_id: String,
    #[serde(rename = "destinationSgtId")]
    pub destination_sgt_id: String,
    /// Referenced SGACL ids, in cell order
    #[serde(rename = "sgacls", default)]
    pub sgacl_ids: Vec<String>,
}

/// Security group tag resource
#[derive(Debug, Clone, Deserialize)]
pub struct Sgt {
    pub id: String,
    pub name: String,
}

/// SGACL resource: a named set of access-control rule lines
#[derive(Debug, Clone, Deserialize)]
pub struct Sgacl {
    pub id: String,
    pub name: String,
    /// Raw multi-line rule content, e.g. "permit tcp\ndeny ip"
    #[serde(rename = "aclcontent", default)]
    pub acl_content: String,
}

/// Read operations against one ISE instance's ERS config API.
///
/// A trait seam so the resolver and expander can run against test doubles.
#[async_trait]
pub trait ErsApi: Send + Sync {
    async fn bulk_status(&self, bulk_id: &BulkOperationId) -> Result<BulkStatus>;
    async fn egress_cell(&self, id: &str) -> Result<EgressCell>;
    async fn sgt(&self, id: &str) -> Result<Sgt>;
    async fn sgacl(&self, id: &str) -> Result<Sgacl>;
}

/// HTTPS client bound to one ISE instance
pub struct ErsClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ErsClient {
    /// Builds a client for the given instance using the daemon config.
    ///
    /// The instance address comes from the inbound notification's sender;
    /// allowlisting (when configured) happens before this point.
    pub fn new(instance: IpAddr, config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.http_timeout())
            .build()?;

        let base_url = match instance {
            IpAddr::V4(v4) => format!("https://{}:{}/ers/config", v4, config.ers.port),
            IpAddr::V6(v6) => format!("https://[{}]:{}/ers/config", v6, config.ers.port),
        };

        Ok(Self {
            http,
            base_url,
            username: config.ers.username.clone(),
            password: config.ers.password.clone(),
        })
    }

    /// Fetches one resource and unwraps its envelope key.
    async fn fetch(&self, path: &str, envelope: &'static str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "ERS GET");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        body.get(envelope).cloned().ok_or(SgaclSyncError::Envelope {
            resource: envelope,
            detail: "missing envelope key".to_string(),
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value, resource: &'static str) -> Result<T> {
        serde_json::from_value(value).map_err(|e| SgaclSyncError::Envelope {
            resource,
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl ErsApi for ErsClient {
    async fn bulk_status(&self, bulk_id: &BulkOperationId) -> Result<BulkStatus> {
        let path = format!("egressmatrixcell/bulk/{bulk_id}");
        let value = self.fetch(&path, "BulkStatus").await?;
        Self::decode(value, "BulkStatus")
    }

    async fn egress_cell(&self, id: &str) -> Result<EgressCell> {
        let path = format!("egressmatrixcell/{id}");
        let value = self.fetch(&path, "EgressMatrixCell").await?;
        Self::decode(value, "EgressMatrixCell")
    }

    async fn sgt(&self, id: &str) -> Result<Sgt> {
        let path = format!("sgt/{id}");
        let value = self.fetch(&path, "Sgt").await?;
        Self::decode(value, "Sgt")
    }

    async fn sgacl(&self, id: &str) -> Result<Sgacl> {
        let path = format!("sgacl/{id}");
        let value = self.fetch(&path, "Sgacl").await?;
        Self::decode(value, "Sgacl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_status_decoding() {
        let body = serde_json::json!({
            "bulkId": "4af5ffe1",
            "resourcesStatus": [
                { "id": "cell-1", "status": "SUCCESS", "resourceExecutionStatus": "COMPLETED" }
            ]
        });
        let status: BulkStatus = serde_json::from_value(body).unwrap();
        assert_eq!(status.bulk_id.as_deref(), Some("4af5ffe1"));
        assert_eq!(status.resources_status.len(), 1);
        assert_eq!(status.resources_status[0].id, "cell-1");
        assert_eq!(status.resources_status[0].status, BULK_STATUS_SUCCESS);
    }

    #[test]
    fn test_egress_cell_decoding() {
        let body = serde_json::json!({
            "id": "cell-1",
            "name": "Egress Cell A",
            "description": "",
            "sourceSgtId": "sgt-src",
            "destinationSgtId": "sgt-dst",
            "matrixCellStatus": "ENABLED",
            "defaultRule": "NONE",
            "sgacls": ["acl-1", "acl-2"]
        });
        let cell: EgressCell = serde_json::from_value(body).unwrap();
        assert_eq!(cell.name, "Egress Cell A");
        assert_eq!(cell.source_sgt_id, "sgt-src");
        assert_eq!(cell.destination_sgt_id, "sgt-dst");
        assert_eq!(cell.sgacl_ids, vec!["acl-1", "acl-2"]);
    }

    #[test]
    fn test_sgacl_decoding_preserves_raw_content() {
        let body = serde_json::json!({
            "id": "acl-1",
            "name": "Rule Set 1",
            "aclcontent": "permit tcp\ndeny ip\n"
        });
        let sgacl: Sgacl = serde_json::from_value(body).unwrap();
        assert_eq!(sgacl.acl_content, "permit tcp\ndeny ip\n");
    }

    #[test]
    fn test_base_url_formats() {
        let mut config = Config::default();
        config.ers.username = "u".into();
        config.ers.password = "p".into();

        let v4 = ErsClient::new("192.0.2.10".parse().unwrap(), &config).unwrap();
        assert_eq!(v4.base_url, "https://192.0.2.10:9060/ers/config");

        let v6 = ErsClient::new("2001:db8::1".parse().unwrap(), &config).unwrap();
        assert_eq!(v6.base_url, "https://[2001:db8::1]:9060/ers/config");
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let value = serde_json::json!({ "unexpected": true });
        let result: Result<Sgt> = ErsClient::decode(value, "Sgt");
        assert!(matches!(
            result,
            Err(SgaclSyncError::Envelope { resource: "Sgt", .. })
        ));
    }
}
