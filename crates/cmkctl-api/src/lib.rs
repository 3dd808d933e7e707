//! cmkctl-api: Checkmk REST wire types
//!
//! Request bodies, host patches, discovery modes and the tag records derived
//! from collection responses. Shared by the client library and the CLI.

pub mod discovery;
pub mod requests;
pub mod responses;

pub use discovery::{DiscoveryMode, ParseDiscoveryModeError};
pub use requests::{ActivateChangesRequest, CreateHostRequest, DiscoverServicesRequest, HostPatch};
pub use responses::{Tag, TagGroupOption};

/// Attribute key prefix marking a host attribute as a tag group
pub const TAG_PREFIX: &str = "tag_";

/// Whether an attribute key names a tag group
#[must_use]
pub fn is_tag(key: &str) -> bool {
    key.starts_with(TAG_PREFIX)
}
