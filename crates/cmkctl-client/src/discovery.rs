//! Service discovery and change activation

use cmkctl_api::{ActivateChangesRequest, DiscoverServicesRequest, DiscoveryMode};
use tracing::{info, instrument};

use crate::error::Result;
use crate::result::ApiResult;
use crate::session::{RestRequest, Session};

impl Session {
    /// Run service discovery on each host in order, one request per host
    ///
    /// `mode` is validated before anything is sent. A rejection for one host
    /// does not stop the next; results are aligned with `hostnames`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidDiscoveryMode`](crate::ClientError::InvalidDiscoveryMode)
    /// for an unknown mode, or a transport error.
    #[instrument(skip(self))]
    pub async fn discover_services(
        &self,
        hostnames: &[String],
        mode: &str,
        dry_run: bool,
    ) -> Result<Vec<Option<ApiResult>>> {
        let mode: DiscoveryMode = mode.parse()?;
        let body = DiscoverServicesRequest { mode };

        let mut results = Vec::with_capacity(hostnames.len());
        for host in hostnames {
            info!(%host, %mode, "discovering services");
            let request =
                RestRequest::post(format!("/objects/host/{host}/actions/discover_services/invoke"))
                    .json(&body)?
                    .dry_run(dry_run);
            results.push(self.execute(request).await?);
        }
        Ok(results)
    }

    /// Refresh every host, then fix all of them
    ///
    /// Returns the refresh results followed by the `fix_all` results.
    ///
    /// # Errors
    /// Returns a transport error
    #[instrument(skip(self))]
    pub async fn discover_fixall(
        &self,
        hostnames: &[String],
        dry_run: bool,
    ) -> Result<Vec<Option<ApiResult>>> {
        let mut results = self
            .discover_services(hostnames, DiscoveryMode::Refresh.as_str(), dry_run)
            .await?;
        results.extend(
            self.discover_services(hostnames, DiscoveryMode::FixAll.as_str(), dry_run)
                .await?,
        );
        Ok(results)
    }

    /// Activate pending changes on the session's site
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    #[instrument(skip(self))]
    pub async fn activate_changes(
        &self,
        force_foreign_changes: bool,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        let body = ActivateChangesRequest::for_site(self.site(), force_foreign_changes);
        let request =
            RestRequest::post("/domain-types/activation_run/actions/activate-changes/invoke")
                .json(&body)?
                .dry_run(dry_run);
        self.execute(request).await
    }
}
