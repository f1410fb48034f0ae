use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use m3u_library::{
    config::Config,
    library::Library,
    models::{
        ChannelFilter, GroupDeleteStrategy, ImportConfig, SourceCreateRequest, SourceKind,
    },
    services::SyncService,
};

#[derive(Parser)]
#[command(name = "m3u-library")]
#[command(version)]
#[command(about = "Local IPTV channel library with incremental playlist synchronization")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage playlist sources
    Source {
        #[command(subcommand)]
        command: SourceCommand,
    },
    /// Preview or apply an incremental resync of one source
    Resync {
        /// Source id
        id: Uuid,
        /// Show the computed diff without applying it
        #[arg(long)]
        preview: bool,
        /// Apply even when the diff removes channels
        #[arg(long)]
        yes: bool,
    },
    /// Resync every enabled source marked for sync-on-launch
    ResyncStartup,
    /// List the categories found in a playlist without saving anything
    Categories {
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Manage channel groups
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Inspect and organize channels
    Channel {
        #[command(subcommand)]
        command: ChannelCommand,
    },
    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommand,
    },
}

#[derive(Subcommand)]
enum SourceCommand {
    /// List configured sources
    List,
    /// Add a new source
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        #[command(flatten)]
        probe: ProbeArgs,
        /// Resync this source automatically on startup
        #[arg(long)]
        auto_sync: bool,
        /// Group assignment mode for imported channels
        #[arg(long, value_enum, default_value = "no-groups")]
        groups: ImportMode,
        /// Target group id (single-group mode)
        #[arg(long)]
        target_group: Option<Uuid>,
        /// Category-to-group mapping entries, as CATEGORY=GROUP_ID
        #[arg(long = "map", value_name = "CATEGORY=GROUP_ID")]
        mappings: Vec<String>,
    },
    /// Delete a source and all channels it owns
    Remove { id: Uuid },
    /// Probe a source configuration without saving it
    Test {
        #[command(flatten)]
        probe: ProbeArgs,
    },
}

#[derive(Subcommand)]
enum GroupCommand {
    List,
    Create { name: String },
    Rename { id: Uuid, name: String },
    /// Delete a group, keeping its channels ungrouped unless told otherwise
    Delete {
        id: Uuid,
        /// Delete the group's channels as well
        #[arg(long)]
        delete_channels: bool,
    },
    /// Reorder groups; unlisted groups keep their relative order at the end
    Reorder { ids: Vec<Uuid> },
}

#[derive(Subcommand)]
enum ChannelCommand {
    List {
        #[arg(long)]
        source: Option<Uuid>,
        #[arg(long)]
        group: Option<Uuid>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Move channels into a group, or out of any group
    Move {
        #[arg(long)]
        group: Option<Uuid>,
        ids: Vec<Uuid>,
    },
    Delete { ids: Vec<Uuid> },
}

#[derive(Subcommand)]
enum FavoriteCommand {
    List,
    /// Bookmark a channel by id
    Add { channel_id: Uuid },
    Remove { id: Uuid },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImportMode {
    NoGroups,
    SingleGroup,
    CreateFromCategories,
    Mapping,
}

/// Origin of a playlist, for probes and new sources. Exactly one of
/// `--file`, `--url` or `--xtream-server` must be given.
#[derive(Args)]
struct ProbeArgs {
    /// Local playlist file path
    #[arg(long, group = "origin")]
    file: Option<String>,

    /// Playlist HTTP(S) URL
    #[arg(long, group = "origin")]
    url: Option<String>,

    /// Xtream-Codes server (host or URL)
    #[arg(long, group = "origin")]
    xtream_server: Option<String>,

    /// Xtream username
    #[arg(long, requires = "xtream_server")]
    username: Option<String>,

    /// Xtream password
    #[arg(long, requires = "xtream_server")]
    password: Option<String>,
}

impl ProbeArgs {
    fn into_kind(self) -> Result<SourceKind> {
        match (self.file, self.url, self.xtream_server) {
            (Some(path), None, None) => Ok(SourceKind::File { path }),
            (None, Some(url), None) => Ok(SourceKind::Url { url }),
            (None, None, Some(server)) => Ok(SourceKind::Xtream {
                server,
                username: self.username.unwrap_or_default(),
                password: self.password.unwrap_or_default(),
            }),
            _ => Err(anyhow!(
                "exactly one of --file, --url or --xtream-server is required"
            )),
        }
    }
}

fn build_import_config(
    mode: ImportMode,
    target_group: Option<Uuid>,
    mappings: &[String],
) -> Result<ImportConfig> {
    match mode {
        ImportMode::NoGroups => Ok(ImportConfig::NoGroups),
        ImportMode::CreateFromCategories => Ok(ImportConfig::CreateFromCategories),
        ImportMode::SingleGroup => {
            let target_group_id = target_group
                .ok_or_else(|| anyhow!("--target-group is required with --groups single-group"))?;
            Ok(ImportConfig::SingleGroup { target_group_id })
        }
        ImportMode::Mapping => {
            let mut category_map = std::collections::HashMap::new();
            for entry in mappings {
                let (category, group_id) = entry
                    .split_once('=')
                    .ok_or_else(|| anyhow!("invalid --map entry '{}'", entry))?;
                category_map.insert(category.to_string(), group_id.parse()?);
            }
            Ok(ImportConfig::Mapping { category_map })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("m3u_library={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::env::set_var("CONFIG_FILE", &cli.config);
    let config = Config::load()?;

    let library = Library::open(&config.storage.library_path)?;
    let migration = library.migrate_if_needed()?;
    if migration.migrated {
        info!(
            "Migrated legacy playlist into {} group(s) and {} channel(s)",
            migration.groups, migration.channels
        );
    }
    let service = SyncService::with_config(library.clone(), &config.sync);

    match cli.command {
        Command::Source { command } => run_source(command, &library, &service).await?,
        Command::Resync { id, preview, yes } => run_resync(id, preview, yes, &service).await?,
        Command::ResyncStartup => {
            for entry in service.resync_startup().await? {
                match &entry.outcome.counts {
                    Some(counts) => println!(
                        "{} ({}): +{} ~{} -{}",
                        entry.source_name, entry.source_id, counts.added, counts.updated,
                        counts.removed
                    ),
                    None => println!(
                        "{} ({}): failed: {}",
                        entry.source_name,
                        entry.source_id,
                        entry.outcome.error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
        }
        Command::Categories { probe } => {
            let preview = service.preview_categories(&probe.into_kind()?).await?;
            for name in &preview.categories {
                println!("{}", name);
            }
            println!("{} categories", preview.total);
        }
        Command::Group { command } => run_group(command, &library)?,
        Command::Channel { command } => run_channel(command, &library)?,
        Command::Favorite { command } => run_favorite(command, &library)?,
    }

    Ok(())
}

async fn run_source(
    command: SourceCommand,
    library: &Library,
    service: &SyncService,
) -> Result<()> {
    match command {
        SourceCommand::List => {
            for source in library.list_sources()? {
                println!(
                    "{}  {:<7} {:<24} enabled={} last_sync={}",
                    source.id,
                    source.kind.type_name(),
                    source.name,
                    source.enabled,
                    source
                        .last_sync
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                );
            }
        }
        SourceCommand::Add {
            name,
            probe,
            auto_sync,
            groups,
            target_group,
            mappings,
        } => {
            let import_config = build_import_config(groups, target_group, &mappings)?;
            let source = library.add_source(SourceCreateRequest {
                name,
                kind: probe.into_kind()?,
                enabled: true,
                auto_sync_on_launch: auto_sync,
                import_config,
            })?;
            println!("Added source {}", source.id);
        }
        SourceCommand::Remove { id } => {
            library.delete_source(id)?;
            println!("Removed source {}", id);
        }
        SourceCommand::Test { probe } => {
            let result = service.test_connection(&probe.into_kind()?).await;
            if result.success {
                println!("OK: {} channels", result.channels.unwrap_or(0));
            } else {
                println!(
                    "Failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

async fn run_resync(id: Uuid, preview: bool, yes: bool, service: &SyncService) -> Result<()> {
    let diff = service.diff_source(id).await?;
    println!(
        "added: {}  updated: {}  removed: {}",
        diff.counts.added, diff.counts.updated, diff.counts.removed
    );
    for (label, names) in [
        ("added", &diff.sample.added),
        ("updated", &diff.sample.updated),
        ("removed", &diff.sample.removed),
    ] {
        if !names.is_empty() {
            println!("  {}: {}", label, names.join(", "));
        }
    }

    if preview {
        return Ok(());
    }
    if diff.counts.removed > 0 && !yes {
        println!(
            "Diff removes {} channel(s); rerun with --yes to apply anyway.",
            diff.counts.removed
        );
        return Ok(());
    }

    let source = service.library().get_source(id)?;
    let outcome = service.apply_diff(id, &source.import_config, &diff)?;
    println!(
        "Applied: +{} ~{} -{}",
        outcome.counts.added, outcome.counts.updated, outcome.counts.removed
    );
    Ok(())
}

fn run_group(command: GroupCommand, library: &Library) -> Result<()> {
    match command {
        GroupCommand::List => {
            for group in library.list_groups()? {
                println!("{}  {:>3}  {}", group.id, group.order, group.name);
            }
        }
        GroupCommand::Create { name } => {
            let group = library.create_group(&name)?;
            println!("Created group {}", group.id);
        }
        GroupCommand::Rename { id, name } => {
            library.rename_group(id, &name)?;
            println!("Renamed group {}", id);
        }
        GroupCommand::Delete {
            id,
            delete_channels,
        } => {
            let strategy = if delete_channels {
                GroupDeleteStrategy::DeleteChannels
            } else {
                GroupDeleteStrategy::ReassignUngrouped
            };
            library.delete_group(id, strategy)?;
            println!("Deleted group {}", id);
        }
        GroupCommand::Reorder { ids } => {
            library.reorder_groups(&ids)?;
            println!("Reordered {} group(s)", ids.len());
        }
    }
    Ok(())
}

fn run_channel(command: ChannelCommand, library: &Library) -> Result<()> {
    match command {
        ChannelCommand::List {
            source,
            group,
            search,
        } => {
            let channels = library.list_channels(&ChannelFilter {
                source_id: source,
                group_id: group,
                search,
            })?;
            for channel in &channels {
                println!("{}  {:<32} {}", channel.id, channel.name, channel.url);
            }
            println!("{} channel(s)", channels.len());
        }
        ChannelCommand::Move { group, ids } => {
            library.move_channels(&ids, group)?;
            println!("Moved {} channel(s)", ids.len());
        }
        ChannelCommand::Delete { ids } => {
            let deleted = library.delete_channels(&ids)?;
            println!("Deleted {} channel(s)", deleted);
        }
    }
    Ok(())
}

fn run_favorite(command: FavoriteCommand, library: &Library) -> Result<()> {
    match command {
        FavoriteCommand::List => {
            for favorite in library.list_favorites()? {
                println!("{}  {:<32} {}", favorite.id, favorite.name, favorite.url);
            }
        }
        FavoriteCommand::Add { channel_id } => {
            let channel = library
                .list_channels(&ChannelFilter::default())?
                .into_iter()
                .find(|c| c.id == channel_id)
                .ok_or_else(|| anyhow!("no channel with id {}", channel_id))?;
            library.add_favorite(&channel)?;
            println!("Added favorite for '{}'", channel.name);
        }
        FavoriteCommand::Remove { id } => {
            if library.remove_favorite(id)? {
                println!("Removed favorite {}", id);
            } else {
                println!("No favorite with id {}", id);
            }
        }
    }
    Ok(())
}
