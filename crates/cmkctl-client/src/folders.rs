//! Folder queries
//!
//! Folder paths use `~`, `/` or `\` as delimiter; the caller escapes them,
//! `~` being the usual choice.

use crate::error::Result;
use crate::result::ApiResult;
use crate::session::{RestRequest, Session};

impl Session {
    /// Get every host stored directly in `folder`
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    pub async fn get_all_hosts_in_folder(
        &self,
        folder: &str,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        let path = format!("/objects/folder_config/{folder}/collections/hosts");
        self.execute(RestRequest::get(path).dry_run(dry_run)).await
    }

    /// List the subfolders of `parent`
    ///
    /// `recursive` descends into every subfolder; `show_hosts` also lists the
    /// hosts of each folder, which is slow on large sites.
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    pub async fn get_all_folders(
        &self,
        parent: &str,
        recursive: bool,
        show_hosts: bool,
        dry_run: bool,
    ) -> Result<Option<ApiResult>> {
        self.execute(RestRequest::get(folders_path(parent, recursive, show_hosts)).dry_run(dry_run))
            .await
    }
}

fn folders_path(parent: &str, recursive: bool, show_hosts: bool) -> String {
    format!(
        "/domain-types/folder_config/collections/all?parent={parent}&recursive={recursive}&show_hosts={show_hosts}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folders_query_always_lists_flags() {
        assert_eq!(
            folders_path("~", false, false),
            "/domain-types/folder_config/collections/all?parent=~&recursive=false&show_hosts=false"
        );
        assert_eq!(
            folders_path("~linux~web", true, true),
            "/domain-types/folder_config/collections/all?parent=~linux~web&recursive=true&show_hosts=true"
        );
    }
}
