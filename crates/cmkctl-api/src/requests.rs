//! Request bodies sent to the Checkmk REST API

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::discovery::DiscoveryMode;

/// Body of `POST /domain-types/host_config/collections/all`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHostRequest {
    pub host_name: String,
    pub folder: String,
    pub attributes: HostAttributes,
}

/// Attributes set when creating a host
///
/// Unset fields are omitted from the body, never sent as `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostAttributes {
    /// Without an address Checkmk resolves the hostname via DNS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipaddress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl CreateHostRequest {
    /// Create a request for `host_name` in `folder`
    pub fn new(host_name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            folder: folder.into(),
            attributes: HostAttributes::default(),
        }
    }

    /// Set the IP address, if any
    #[must_use]
    pub fn with_ipaddress(mut self, ip: Option<impl Into<String>>) -> Self {
        self.attributes.ipaddress = ip.map(Into::into);
        self
    }

    /// Set the alias, if any
    #[must_use]
    pub fn with_alias(mut self, alias: Option<impl Into<String>>) -> Self {
        self.attributes.alias = alias.map(Into::into);
        self
    }
}

/// Body of `PUT /objects/host_config/{host}`
///
/// Serialized as an externally tagged object, e.g.
/// `{"update_attributes": {"tag_env": "prod"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostPatch {
    /// Set or change the given attributes, leave the rest untouched
    #[serde(rename = "update_attributes")]
    SetAttribute(Map<String, Value>),
    /// Drop the given attributes, leave the rest untouched
    #[serde(rename = "remove_attributes")]
    RemoveAttribute(Vec<String>),
    /// Replace every attribute; anything not listed is cleared
    #[serde(rename = "attributes")]
    ReplaceAll(Map<String, Value>),
}

impl HostPatch {
    /// Patch setting a single attribute
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut attributes = Map::new();
        attributes.insert(key.into(), Value::String(value.into()));
        HostPatch::SetAttribute(attributes)
    }

    /// Patch removing a single attribute
    pub fn remove(key: impl Into<String>) -> Self {
        HostPatch::RemoveAttribute(vec![key.into()])
    }
}

/// Body of `POST /objects/host/{host}/actions/discover_services/invoke`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverServicesRequest {
    pub mode: DiscoveryMode,
}

/// Body of `POST /domain-types/activation_run/actions/activate-changes/invoke`
///
/// Flags go over the wire as the strings `"true"` / `"false"`.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateChangesRequest {
    #[serde(serialize_with = "bool_as_str")]
    pub redirect: bool,
    pub sites: Vec<String>,
    #[serde(serialize_with = "bool_as_str")]
    pub force_foreign_changes: bool,
}

impl ActivateChangesRequest {
    /// Non-redirecting activation of a single site
    pub fn for_site(site: impl Into<String>, force_foreign_changes: bool) -> Self {
        Self {
            redirect: false,
            sites: vec![site.into()],
            force_foreign_changes,
        }
    }
}

fn bool_as_str<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_host_omits_unset_attributes() {
        let request = CreateHostRequest::new("web01", "/")
            .with_ipaddress(None::<String>)
            .with_alias(Some("x"));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({"host_name": "web01", "folder": "/", "attributes": {"alias": "x"}})
        );
        assert!(body["attributes"].get("ipaddress").is_none());
    }

    #[test]
    fn test_create_host_without_attributes() {
        let request = CreateHostRequest::new("web01", "~linux");
        let body = serde_json::to_string(&request).unwrap();
        assert_eq!(
            body,
            r#"{"host_name":"web01","folder":"~linux","attributes":{}}"#
        );
    }

    #[test]
    fn test_patch_bodies() {
        assert_eq!(
            serde_json::to_string(&HostPatch::set("tag_env", "prod")).unwrap(),
            r#"{"update_attributes":{"tag_env":"prod"}}"#
        );
        assert_eq!(
            serde_json::to_string(&HostPatch::remove("ipaddress")).unwrap(),
            r#"{"remove_attributes":["ipaddress"]}"#
        );

        let mut all = Map::new();
        all.insert("ipaddress".into(), json!("192.168.0.6"));
        assert_eq!(
            serde_json::to_string(&HostPatch::ReplaceAll(all)).unwrap(),
            r#"{"attributes":{"ipaddress":"192.168.0.6"}}"#
        );
    }

    #[test]
    fn test_patch_parses_user_supplied_json() {
        let patch: HostPatch =
            serde_json::from_str(r#"{"remove_attributes": ["tag_shop_type"]}"#).unwrap();
        assert_eq!(patch, HostPatch::remove("tag_shop_type"));

        assert!(serde_json::from_str::<HostPatch>(r#"{"bogus": 1}"#).is_err());
    }

    #[test]
    fn test_activate_flags_are_strings() {
        let body = serde_json::to_string(&ActivateChangesRequest::for_site("prod", true)).unwrap();
        assert_eq!(
            body,
            r#"{"redirect":"false","sites":["prod"],"force_foreign_changes":"true"}"#
        );
    }
}
