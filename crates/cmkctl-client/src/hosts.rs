//! Host lifecycle and ETag-guarded host updates
//!
//! Every update is a single read-modify-write: fetch the host's current
//! ETag, then PUT the patch with `If-Match`. A concurrent writer between the
//! two steps makes the PUT fail with a precondition error; nothing here
//! retries or loops. A dry run skips the read and previews the PUT with
//! [`ETag::placeholder`].

use std::fmt;

use cmkctl_api::{CreateHostRequest, HostPatch};
use reqwest::header::IF_MATCH;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::result::ApiResult;
use crate::session::{RestRequest, Session};

/// Opaque version token of a host at a point in time
///
/// The empty tag is the "host not found" sentinel: any conditional write
/// using it is rejected by Checkmk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ETag(String);

impl ETag {
    /// Wrap a raw header value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The "host not found" sentinel
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stand-in shown in dry-run previews, where the ETag is never fetched
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new("<etag>")
    }

    /// Whether this is the sentinel
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw header value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn host_path(hostname: &str) -> String {
    format!("/objects/host_config/{hostname}")
}

impl Session {
    /// Get a host
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn get_host(
        &self,
        hostname: &str,
        effective_attributes: bool,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        let mut path = host_path(hostname);
        if effective_attributes {
            path.push_str("?effective_attributes=true");
        }
        self.execute(RestRequest::get(path).dry_run(dry_run)).await
    }

    /// Fetch the current ETag of a host
    ///
    /// The read is always sent. Returns [`ETag::empty`] when the host is not
    /// found (non-200 status or no `ETag` header).
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn get_etag(&self, hostname: &str) -> Result<ETag> {
        let result = self.get_host(hostname, false, false).await?;

        let etag = match result.as_ref() {
            Some(res) if res.ok() => res.etag().map(ETag::new),
            _ => None,
        };

        match etag {
            Some(etag) => {
                debug!(%etag, "host etag");
                Ok(etag)
            }
            None => {
                warn!(
                    status = result.as_ref().map(|r| r.status.as_u16()),
                    "host not found, using empty etag"
                );
                Ok(ETag::empty())
            }
        }
    }

    /// Update a host with `patch`, conditioned on `etag`
    ///
    /// A stale or empty ETag is rejected by Checkmk (412-class status); the
    /// rejection is returned as a normal result.
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self, patch))]
    pub async fn update_host(
        &self,
        hostname: &str,
        patch: &HostPatch,
        etag: &ETag,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        let request = RestRequest::put(host_path(hostname))
            .header(IF_MATCH, etag.as_str())?
            .json(patch)?
            .dry_run(dry_run);
        self.execute(request).await
    }

    async fn patch_host(
        &self,
        hostname: &str,
        patch: HostPatch,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        let etag = if dry_run {
            ETag::placeholder()
        } else {
            self.get_etag(hostname).await?
        };
        self.update_host(hostname, &patch, &etag, dry_run).await
    }

    /// Set or change a host tag
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn update_host_tag(
        &self,
        hostname: &str,
        tag_group: &str,
        value: &str,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        self.patch_host(hostname, HostPatch::set(tag_group, value), dry_run)
            .await
    }

    /// Remove a host tag
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn remove_host_tag(
        &self,
        hostname: &str,
        tag_group: &str,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        self.patch_host(hostname, HostPatch::remove(tag_group), dry_run)
            .await
    }

    /// Set or change the IP address of a host
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn update_host_ipaddress(
        &self,
        hostname: &str,
        ip: &str,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        self.patch_host(hostname, HostPatch::set("ipaddress", ip), dry_run)
            .await
    }

    /// Remove the IP address of a host; Checkmk then resolves it via DNS
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn remove_host_ipaddress(
        &self,
        hostname: &str,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        self.patch_host(hostname, HostPatch::remove("ipaddress"), dry_run)
            .await
    }

    /// Create a host in `folder`
    ///
    /// Without an IP address Checkmk resolves the hostname via DNS.
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn create_host(
        &self,
        folder: &str,
        hostname: &str,
        ip: Option<&str>,
        alias: Option<&str>,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        let body = CreateHostRequest::new(hostname, folder)
            .with_ipaddress(ip)
            .with_alias(alias);
        let request = RestRequest::post("/domain-types/host_config/collections/all")
            .json(&body)?
            .dry_run(dry_run);
        self.execute(request).await
    }

    /// Delete a host
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn delete_host(&self, hostname: &str, dry_run: bool) -> Result<Option<ApiResult>> {
        self.execute(RestRequest::delete(host_path(hostname)).dry_run(dry_run))
            .await
    }

    /// Get every host (slow on large sites)
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    pub async fn get_all_hosts(&self, dry_run: bool) -> Result<Option<ApiResult>> {
        self.execute(RestRequest::get("/domain-types/host_config/collections/all").dry_run(dry_run))
            .await
    }
}

/// Split a `,` or `;` separated host list
#[must_use]
pub fn split_hosts(hostnames: &str) -> Vec<String> {
    hostnames
        .replace(',', ";")
        .split(';')
        .map(str::to_string)
        .collect()
}
