//! Records derived from Checkmk collection responses

use serde::{Deserialize, Serialize};

/// A host has `tag_group` set to `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub host: String,
    pub tag_group: String,
    pub value: String,
}

/// One permitted value of a tag group, as listed in the tag-group catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroupOption {
    pub tag_group: String,
    pub value_id: String,
    pub value_title: String,
    /// Auxiliary tags implied by this value
    #[serde(default)]
    pub aux_tags: Vec<String>,
}
