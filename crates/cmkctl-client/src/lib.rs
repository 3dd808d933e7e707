//! cmkctl-client: Checkmk REST API client library
//!
//! A [`Session`] carries the bearer credentials and TLS settings of one
//! invocation. Every operation is a method on it and issues its requests
//! strictly in sequence, with no retry.
//!
//! Host updates use optimistic concurrency: the host's ETag is read first,
//! then the write is sent with `If-Match`. A concurrent modification makes
//! the write fail; the caller decides whether to try again.
//!
//! # Example
//!
//! ```no_run
//! use cmkctl_client::{Session, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! let session = Session::from_settings(&settings)?;
//!
//! // Set a tag, guarded by the host's current ETag
//! if let Some(result) = session.update_host_tag("web01", "tag_env", "prod", false).await? {
//!     println!("{} {}", result.status, result.text());
//! }
//!
//! // Refresh then fix all services on two hosts
//! let hosts = cmkctl_client::split_hosts("web01,web02");
//! let results = session.discover_fixall(&hosts, false).await?;
//! println!("{} discovery calls", results.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod folders;
pub mod hosts;
pub mod result;
pub mod session;
pub mod tags;

pub use config::Settings;
pub use error::{ClientError, Result};
pub use hosts::{ETag, split_hosts};
pub use result::ApiResult;
pub use session::{RestRequest, Session};
pub use tags::TagHistogram;
