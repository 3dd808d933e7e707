//! cmkctl CLI
//!
//! Command-line automation for the Checkmk REST API. Mutating subcommands
//! are read-only unless `--doit` is given: without it the request is built
//! and logged, but not sent.

use std::io::{self, Write};

use clap::{Args, Parser, Subcommand};
use cmkctl_api::HostPatch;
use cmkctl_client::{ETag, Session, Settings, split_hosts};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Parser)]
#[command(name = "cmkctl", version)]
#[command(about = "Checkmk REST API automation CLI", long_about = None)]
struct Cli {
    /// Log requests and responses (same as RUST_LOG=debug)
    #[arg(short = 'v', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Gate for mutating subcommands
#[derive(Args, Debug, Clone, Copy)]
struct Doit {
    /// Enable modification (without this flag it is read only)
    #[arg(long)]
    doit: bool,
}

impl Doit {
    fn dry_run(self) -> bool {
        !self.doit
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a host
    #[command(visible_alias = "h")]
    GetHost {
        hostname: String,
        /// Fetch the effective attributes of the host
        #[arg(long)]
        effective_attributes: bool,
    },
    /// Delete a host
    #[command(visible_alias = "d")]
    DeleteHost {
        hostname: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Create a host; without an IP address DNS is used on the hostname
    #[command(visible_alias = "c")]
    CreateHost {
        hostname: String,
        folder: String,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        alias: Option<String>,
        #[command(flatten)]
        doit: Doit,
    },
    /// Update a host with a raw patch, conditioned on an ETag
    ///
    /// DATA is one of:
    ///   {"update_attributes": {"tag_shop": "value1"}}   change listed attributes
    ///   {"attributes": {"ipaddress": "192.168.0.6"}}    replace all attributes
    ///   {"remove_attributes": ["tag_shop_type"]}        remove listed attributes
    #[command(visible_alias = "u", verbatim_doc_comment)]
    UpdateHost {
        hostname: String,
        data: String,
        etag: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Set or change a host tag
    #[command(visible_alias = "ut")]
    UpdateHostTag {
        hostname: String,
        tag_group: String,
        tag_group_value: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Remove a host tag
    #[command(visible_alias = "rt")]
    RemoveHostTag {
        hostname: String,
        tag_group: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Set or change the IP address of a host
    #[command(visible_alias = "ui")]
    UpdateHostIp {
        hostname: String,
        ip: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Remove the IP address of a host (resolved from the hostname afterwards)
    #[command(visible_alias = "ri")]
    RemoveHostIp {
        hostname: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Activate pending changes on the configured site
    #[command(visible_alias = "a")]
    Activate {
        #[arg(long)]
        force_foreign_changes: bool,
        #[command(flatten)]
        doit: Doit,
    },
    /// Discover services on hosts
    #[command(visible_alias = "di")]
    Discover {
        /// Hostnames separated with ; or ,
        hostnames: String,
        /// One of: new, remove, fix_all, refresh, only_host_labels
        mode: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Refresh services on hosts, then fix all of them
    #[command(visible_alias = "df")]
    DiscoverFixall {
        /// Hostnames separated with ; or ,
        hostnames: String,
        #[command(flatten)]
        doit: Doit,
    },
    /// Get the ETag of a host (changes on every modification)
    #[command(visible_alias = "etag")]
    GetEtag { hostname: String },
    /// Get a host tag group with all its values
    #[command(visible_alias = "gtg")]
    GetTagGroup { tag_group_name: String },
    /// List the values of one tag group as CSV
    #[command(visible_alias = "tgv")]
    TagGroupValues { tag_group_name: String },
    /// Get all hosts as JSON (slow on large sites)
    #[command(visible_alias = "ah")]
    GetAllHosts,
    /// Get all hosts in a folder; use ~ as path delimiter
    #[command(visible_alias = "ahf")]
    GetAllHostsInFolder { folder: String },
    /// List the subfolders of a folder
    #[command(visible_alias = "gaf")]
    GetAllFolders {
        /// Parent folder; use ~ as path delimiter
        parent: String,
        /// Include all subfolders recursively
        #[arg(long)]
        recursive: bool,
        /// Also list the hosts of each folder
        #[arg(long)]
        show_hosts: bool,
    },
    /// List the tags of every host as CSV
    #[command(visible_alias = "at")]
    GetAllTags,
    /// List every tag group and its values as CSV
    #[command(visible_alias = "atg")]
    GetAllTagGroups,
    /// Join tag values with the hosts using them, as CSV
    #[command(visible_alias = "th")]
    TagHistogram,
}

impl Commands {
    /// Whether this is a mutating subcommand run without `--doit`
    fn is_dry_run(&self) -> bool {
        match self {
            Self::DeleteHost { doit, .. }
            | Self::CreateHost { doit, .. }
            | Self::UpdateHost { doit, .. }
            | Self::UpdateHostTag { doit, .. }
            | Self::RemoveHostTag { doit, .. }
            | Self::UpdateHostIp { doit, .. }
            | Self::RemoveHostIp { doit, .. }
            | Self::Activate { doit, .. }
            | Self::Discover { doit, .. }
            | Self::DiscoverFixall { doit, .. } => doit.dry_run(),
            _ => false,
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let session = open_session(&cli.command)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&session, cli.command, &mut out).await?;
    out.flush()?;

    Ok(())
}

/// Open the session, or for a dry run an unopened one that only previews
fn open_session(command: &Commands) -> Result<Session> {
    if command.is_dry_run() {
        let settings = Settings::resolve()?;
        return Ok(Session::unopened(
            settings.rest_url.unwrap_or_default(),
            settings.site_name.unwrap_or_default(),
        ));
    }

    let settings = Settings::load()?;
    Ok(Session::from_settings(&settings)?)
}

async fn run(session: &Session, command: Commands, out: &mut impl Write) -> Result<()> {
    debug!(?command, dry_run = command.is_dry_run(), "running");

    match command {
        Commands::GetHost {
            hostname,
            effective_attributes,
        } => {
            let result = session
                .get_host(&hostname, effective_attributes, false)
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::DeleteHost { hostname, doit } => {
            let result = session.delete_host(&hostname, doit.dry_run()).await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::CreateHost {
            hostname,
            folder,
            ip,
            alias,
            doit,
        } => {
            let result = session
                .create_host(
                    &folder,
                    &hostname,
                    ip.as_deref(),
                    alias.as_deref(),
                    doit.dry_run(),
                )
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::UpdateHost {
            hostname,
            data,
            etag,
            doit,
        } => {
            let patch: HostPatch =
                serde_json::from_str(&data).wrap_err("DATA is not a valid host patch")?;
            let result = session
                .update_host(&hostname, &patch, &ETag::new(etag), doit.dry_run())
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::UpdateHostTag {
            hostname,
            tag_group,
            tag_group_value,
            doit,
        } => {
            let result = session
                .update_host_tag(&hostname, &tag_group, &tag_group_value, doit.dry_run())
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::RemoveHostTag {
            hostname,
            tag_group,
            doit,
        } => {
            let result = session
                .remove_host_tag(&hostname, &tag_group, doit.dry_run())
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::UpdateHostIp { hostname, ip, doit } => {
            let result = session
                .update_host_ipaddress(&hostname, &ip, doit.dry_run())
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::RemoveHostIp { hostname, doit } => {
            let result = session
                .remove_host_ipaddress(&hostname, doit.dry_run())
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::Activate {
            force_foreign_changes,
            doit,
        } => {
            let result = session
                .activate_changes(force_foreign_changes, doit.dry_run())
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::Discover {
            hostnames,
            mode,
            doit,
        } => {
            let results = session
                .discover_services(&split_hosts(&hostnames), &mode, doit.dry_run())
                .await?;
            output::write_results(out, &results)?;
        }
        Commands::DiscoverFixall { hostnames, doit } => {
            let results = session
                .discover_fixall(&split_hosts(&hostnames), doit.dry_run())
                .await?;
            output::write_results(out, &results)?;
        }
        Commands::GetEtag { hostname } => {
            let etag = session.get_etag(&hostname).await?;
            writeln!(out, "{etag}")?;
        }
        Commands::GetTagGroup { tag_group_name } => {
            let result = session.get_tag_group(&tag_group_name, false).await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::TagGroupValues { tag_group_name } => {
            let options = session.tag_group_values(&tag_group_name).await?;
            output::write_tag_group_options(out, &options)?;
        }
        Commands::GetAllHosts => {
            let result = session.get_all_hosts(false).await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::GetAllHostsInFolder { folder } => {
            let result = session.get_all_hosts_in_folder(&folder, false).await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::GetAllFolders {
            parent,
            recursive,
            show_hosts,
        } => {
            let result = session
                .get_all_folders(&parent, recursive, show_hosts, false)
                .await?;
            output::write_result(out, result.as_ref())?;
        }
        Commands::GetAllTags => {
            let tags = session.get_all_hosts_tags().await?;
            output::write_tags(out, &tags)?;
        }
        Commands::GetAllTagGroups => {
            let options = session.get_all_tag_group_options().await?;
            output::write_tag_group_options(out, &options)?;
        }
        Commands::TagHistogram => {
            let histogram = session.get_tag_histogram().await?;
            output::write_histogram(out, &histogram)?;
        }
    }

    Ok(())
}
