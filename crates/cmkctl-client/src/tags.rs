//! Tag groups and the tag views derived from them
//!
//! The pure functions here turn collection responses into records; the
//! `Session` methods fetch the collections and apply them.

use std::collections::HashMap;

use cmkctl_api::{TAG_PREFIX, Tag, TagGroupOption, is_tag};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{ClientError, Result};
use crate::result::ApiResult;
use crate::session::{RestRequest, Session};

/// `(tag_group, value_id)` key of the histogram
pub type TagKey = (String, String);

/// Hosts using each catalog tag value
///
/// Keys are exactly the catalog's `(tag_group, value_id)` pairs, in catalog
/// order. A value no host uses maps to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagHistogram {
    entries: Vec<(TagKey, Vec<String>)>,
    index: HashMap<TagKey, usize>,
}

impl TagHistogram {
    /// Hosts using `value_id` of `tag_group`, `None` if the pair is not in the catalog
    #[must_use]
    pub fn hosts(&self, tag_group: &str, value_id: &str) -> Option<&[String]> {
        self.index
            .get(&(tag_group.to_string(), value_id.to_string()))
            .map(|&i| self.entries[i].1.as_slice())
    }

    /// Entries in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &[String])> {
        self.entries.iter().map(|(key, hosts)| (key, hosts.as_slice()))
    }

    /// Number of catalog pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog was empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extract every host tag from a `host_config` collection
///
/// Order follows the collection, then each host's attribute map.
///
/// # Errors
/// Returns [`ClientError::InvalidResponse`] if the collection is malformed
pub fn host_tags(collection: &Value) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();

    for host in collection_values(collection)? {
        let host_id = str_field(host, "id")?;
        let attributes = host
            .pointer("/extensions/attributes")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid(format!("host {host_id} has no attributes")))?;

        for (key, value) in attributes {
            if is_tag(key) {
                tags.push(Tag {
                    host: host_id.to_string(),
                    tag_group: key.clone(),
                    value: scalar_to_string(value),
                });
            }
        }
    }

    Ok(tags)
}

/// Flatten a `host_tag_group` collection into its permitted values
///
/// Group ids missing the `tag_` prefix get it added, so they match the host
/// attribute keys.
///
/// # Errors
/// Returns [`ClientError::InvalidResponse`] if the collection is malformed
pub fn tag_group_options(collection: &Value) -> Result<Vec<TagGroupOption>> {
    let mut options = Vec::new();
    for group in collection_values(collection)? {
        let id = str_field(group, "id")?;
        let tag_group = if is_tag(id) {
            id.to_string()
        } else {
            format!("{TAG_PREFIX}{id}")
        };
        options.extend(group_options(group, &tag_group)?);
    }
    Ok(options)
}

/// Permitted values of a single `host_tag_group` object, group id as returned
///
/// # Errors
/// Returns [`ClientError::InvalidResponse`] if the object is malformed
pub fn single_group_options(group: &Value) -> Result<Vec<TagGroupOption>> {
    let id = str_field(group, "id")?;
    group_options(group, id)
}

/// Join the catalog with the hosts using each value
///
/// # Errors
/// Returns [`ClientError::UnknownTagValue`] if a host carries a value that
/// is not in the catalog.
pub fn tag_histogram(options: &[TagGroupOption], tags: &[Tag]) -> Result<TagHistogram> {
    let mut histogram = TagHistogram::default();

    for option in options {
        let key = (option.tag_group.clone(), option.value_id.clone());
        if !histogram.index.contains_key(&key) {
            histogram.index.insert(key.clone(), histogram.entries.len());
            histogram.entries.push((key, Vec::new()));
        }
    }

    for tag in tags {
        let key = (tag.tag_group.clone(), tag.value.clone());
        let &i = histogram
            .index
            .get(&key)
            .ok_or_else(|| ClientError::UnknownTagValue {
                host: tag.host.clone(),
                tag_group: tag.tag_group.clone(),
                value: tag.value.clone(),
            })?;
        histogram.entries[i].1.push(tag.host.clone());
    }

    Ok(histogram)
}

fn group_options(group: &Value, tag_group: &str) -> Result<Vec<TagGroupOption>> {
    let tags = group
        .pointer("/extensions/tags")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(format!("tag group {tag_group} has no tags")))?;

    Ok(tags
        .iter()
        .map(|tag| TagGroupOption {
            tag_group: tag_group.to_string(),
            // Checkbox groups use a null id for "unset"
            value_id: tag.get("id").map(scalar_to_string).unwrap_or_default(),
            value_title: tag
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            aux_tags: tag
                .get("aux_tags")
                .and_then(Value::as_array)
                .map(|aux| aux.iter().map(scalar_to_string).collect())
                .unwrap_or_default(),
        })
        .collect())
}

fn collection_values(collection: &Value) -> Result<&[Value]> {
    collection
        .get("value")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| invalid("collection has no 'value' array"))
}

fn str_field<'a>(object: &'a Value, field: &str) -> Result<&'a str> {
    object
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("missing string field '{field}'")))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::InvalidResponse(message.into())
}

impl Session {
    /// Get a host tag group with all its values
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    pub async fn get_tag_group(&self, name: &str, dry_run: bool) -> Result<Option<ApiResult>> {
        let path = format!("/objects/host_tag_group/{name}");
        self.execute(RestRequest::get(path).dry_run(dry_run)).await
    }

    /// Get every host tag group
    ///
    /// # Errors
    /// Returns an error if the session is not open or the transport fails
    pub async fn get_all_tag_groups(&self, dry_run: bool) -> Result<Option<ApiResult>> {
        self.execute(
            RestRequest::get("/domain-types/host_tag_group/collections/all").dry_run(dry_run),
        )
        .await
    }

    /// Every tag set on every host
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-200 status or a malformed body
    #[instrument(skip(self))]
    pub async fn get_all_hosts_tags(&self) -> Result<Vec<Tag>> {
        let collection = require(self.get_all_hosts(false).await?)?;
        let tags = host_tags(&collection)?;
        debug!(count = tags.len(), "collected host tags");
        Ok(tags)
    }

    /// Every permitted value of every tag group
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-200 status or a malformed body
    #[instrument(skip(self))]
    pub async fn get_all_tag_group_options(&self) -> Result<Vec<TagGroupOption>> {
        let collection = require(self.get_all_tag_groups(false).await?)?;
        tag_group_options(&collection)
    }

    /// Permitted values of one tag group
    ///
    /// # Errors
    /// Returns [`ClientError::Api`] if the group does not exist, or a
    /// transport error
    #[instrument(skip(self))]
    pub async fn tag_group_values(&self, name: &str) -> Result<Vec<TagGroupOption>> {
        let group = require(self.get_tag_group(name, false).await?)?;
        single_group_options(&group)
    }

    /// Join the tag-group catalog with the hosts using each value
    ///
    /// # Errors
    /// Returns [`ClientError::UnknownTagValue`] if a host uses a value
    /// missing from the catalog, or any error of the two underlying queries
    #[instrument(skip(self))]
    pub async fn get_tag_histogram(&self) -> Result<TagHistogram> {
        let options = self.get_all_tag_group_options().await?;
        let tags = self.get_all_hosts_tags().await?;
        tag_histogram(&options, &tags)
    }
}

fn require(result: Option<ApiResult>) -> Result<Value> {
    result
        .ok_or_else(|| invalid("request was not sent"))?
        .require_ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hosts() -> Value {
        json!({
            "value": [
                {
                    "id": "web01",
                    "extensions": {"attributes": {
                        "ipaddress": "10.0.0.1",
                        "tag_env": "prod",
                        "alias": "Web",
                        "tag_criticality": "critical"
                    }}
                },
                {
                    "id": "db01",
                    "extensions": {"attributes": {"tag_env": "test"}}
                }
            ]
        })
    }

    fn catalog() -> Value {
        json!({
            "value": [
                {
                    "id": "env",
                    "extensions": {"tags": [
                        {"id": "prod", "title": "Production", "aux_tags": []},
                        {"id": "test", "title": "Test", "aux_tags": ["staging"]},
                        {"id": "dev", "title": "Development", "aux_tags": []}
                    ]}
                },
                {
                    "id": "tag_criticality",
                    "extensions": {"tags": [
                        {"id": "critical", "title": "Critical", "aux_tags": []}
                    ]}
                }
            ]
        })
    }

    #[test]
    fn test_host_tags_preserve_order() {
        let tags = host_tags(&hosts()).unwrap();
        let flat: Vec<_> = tags
            .iter()
            .map(|t| (t.host.as_str(), t.tag_group.as_str(), t.value.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("web01", "tag_env", "prod"),
                ("web01", "tag_criticality", "critical"),
                ("db01", "tag_env", "test"),
            ]
        );
    }

    #[test]
    fn test_tag_group_ids_get_prefix() {
        let options = tag_group_options(&catalog()).unwrap();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].tag_group, "tag_env");
        assert_eq!(options[1].aux_tags, vec!["staging".to_string()]);
        assert_eq!(options[3].tag_group, "tag_criticality");
        assert_eq!(options[3].value_title, "Critical");
    }

    #[test]
    fn test_single_group_keeps_raw_id() {
        let group = &catalog()["value"][0];
        let options = single_group_options(group).unwrap();
        assert_eq!(options[0].tag_group, "env");
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn test_null_value_id_is_empty() {
        let group = json!({
            "id": "tag_backup",
            "extensions": {"tags": [{"id": null, "title": "No backup", "aux_tags": []}]}
        });
        let options = single_group_options(&group).unwrap();
        assert_eq!(options[0].value_id, "");
    }

    #[test]
    fn test_histogram_covers_catalog() {
        let options = tag_group_options(&catalog()).unwrap();
        let tags = host_tags(&hosts()).unwrap();
        let histogram = tag_histogram(&options, &tags).unwrap();

        assert_eq!(histogram.len(), 4);
        assert_eq!(histogram.hosts("tag_env", "prod"), Some(&["web01".to_string()][..]));
        assert_eq!(histogram.hosts("tag_env", "test"), Some(&["db01".to_string()][..]));
        assert_eq!(histogram.hosts("tag_env", "dev"), Some(&[][..]));
        assert_eq!(histogram.hosts("tag_env", "qa"), None);

        let keys: Vec<_> = histogram.iter().map(|(k, _)| k.1.as_str()).collect();
        assert_eq!(keys, vec!["prod", "test", "dev", "critical"]);
    }

    #[test]
    fn test_histogram_rejects_unknown_value() {
        let options = tag_group_options(&catalog()).unwrap();
        let tags = vec![Tag {
            host: "web02".into(),
            tag_group: "tag_env".into(),
            value: "qa".into(),
        }];

        match tag_histogram(&options, &tags) {
            Err(ClientError::UnknownTagValue { host, value, .. }) => {
                assert_eq!(host, "web02");
                assert_eq!(value, "qa");
            }
            other => panic!("expected unknown tag value, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_collection() {
        assert!(matches!(
            host_tags(&json!({"items": []})),
            Err(ClientError::InvalidResponse(_))
        ));
        assert!(matches!(
            host_tags(&json!({"value": [{"id": "web01"}]})),
            Err(ClientError::InvalidResponse(_))
        ));
    }
}
