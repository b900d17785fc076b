//! geotoc: resolve WMS layer groups into a table of contents.
//!
//! Resolves either a single GetCapabilities URL, the groups of a static
//! configuration file, or a previously exported set of groups, and prints
//! the result as JSON. Layer state persists between runs in a JSON store.

mod fetch;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use storage::{JsonFileStore, PersistedLayerState};
use toc_common::TocConfig;
use toc_engine::serializer::{groups_from_json, groups_to_json};
use toc_engine::{reconcile, GroupResolver, Resolution, SourceDocument, TocContext, TocLoader};
use wms_protocol::CapabilitiesScope;

use fetch::ReqwestFetcher;
use report::Report;

#[derive(Parser, Debug)]
#[command(name = "geotoc")]
#[command(about = "Resolve WMS layer groups into a table of contents")]
struct Args {
    /// Configuration file (.json or .yaml)
    #[arg(short, long, env = "GEOTOC_CONFIG")]
    config: Option<PathBuf>,

    /// GetCapabilities URL; without it the configured groups are resolved
    #[arg(short, long, env = "GEOTOC_URL")]
    url: Option<String>,

    /// Whether `--url` lists groups (root) or the layers of one group
    #[arg(long, value_enum, default_value = "root")]
    scope: Scope,

    /// Resolve groups previously written with `--export` instead of fetching
    #[arg(long, conflicts_with = "url")]
    import: Option<PathBuf>,

    /// Write the resolved groups in storable form
    #[arg(long)]
    export: Option<PathBuf>,

    /// Persisted state file
    #[arg(short, long, env = "GEOTOC_STORE", default_value = "geotoc-state.json")]
    store: PathBuf,

    /// Save the resolved visibility and opacity of every layer to the store
    #[arg(long)]
    persist: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Log level
    #[arg(long, default_value = "info", env = "GEOTOC_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Scope {
    Root,
    Group,
}

impl From<Scope> for CapabilitiesScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Root => CapabilitiesScope::Root,
            Scope::Group => CapabilitiesScope::Group,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let config = match &args.config {
        Some(path) => TocConfig::load(path)?,
        None => {
            let mut config = TocConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    let mut store = JsonFileStore::open(&args.store)?;
    let mut ctx = TocContext::new(config);

    let resolution = if let Some(path) = &args.import {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read exported groups {:?}", path))?;
        let source = SourceDocument::Stored {
            groups: groups_from_json(&json)?,
        };
        let persisted = PersistedLayerState::load(&store)?;
        GroupResolver::new(&persisted).resolve(&mut ctx, &source)?
    } else {
        let loader = TocLoader::new(ReqwestFetcher::new(Duration::from_secs(args.timeout))?);
        let pass = match &args.url {
            Some(url) => {
                loader
                    .load_capabilities(&mut ctx, &mut store, url, args.scope.into())
                    .await?
            }
            None => loader.load_configured(&mut ctx, &mut store).await?,
        };
        match pass {
            Some(resolution) => resolution,
            None => {
                warn!("Resolution pass was superseded, nothing to report");
                return Ok(());
            }
        }
    };

    if resolution.groups.is_empty() {
        warn!("No layer groups resolved");
    }

    if args.persist {
        persist_all(&mut store, &resolution)?;
    }

    if let Some(path) = &args.export {
        let json = groups_to_json(&ctx.surface, &resolution.groups)?;
        fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        info!(path = ?path, groups = resolution.groups.len(), "Exported groups");
    }

    println!("{}", serde_json::to_string_pretty(&Report::new(&resolution))?);
    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries the report
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn persist_all(store: &mut JsonFileStore, resolution: &Resolution) -> Result<()> {
    let mut persisted = PersistedLayerState::load(store)?;
    for group in &resolution.groups {
        reconcile::persist(store, &mut persisted, &group.value, &group.layers)?;
    }
    info!(groups = resolution.groups.len(), "Persisted layer state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{capabilities, names, temp_store_path, urls};
    use wms_protocol::CapabilitiesDocument;

    fn resolve_root(ctx: &mut TocContext) -> Resolution {
        let source = SourceDocument::Capabilities {
            document: CapabilitiesDocument::parse(capabilities::ROOT).unwrap(),
            url: urls::ROOT_CAPABILITIES.to_string(),
            scope: CapabilitiesScope::Root,
        };
        GroupResolver::new(&PersistedLayerState::new())
            .resolve(ctx, &source)
            .unwrap()
    }

    #[test]
    fn test_persist_all_writes_every_group() {
        let (_dir, path) = temp_store_path();
        let mut ctx = TocContext::new(TocConfig::default());
        let resolution = resolve_root(&mut ctx);

        let mut store = JsonFileStore::open(&path).unwrap();
        persist_all(&mut store, &resolution).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let persisted = PersistedLayerState::load(&reopened).unwrap();
        for group in &resolution.groups {
            for layer in &group.layers {
                let saved = persisted.layer(&group.value, &layer.name).unwrap();
                assert_eq!(saved.visible, layer.visible);
                assert_eq!(saved.draw_index, Some(layer.draw_index));
            }
        }
        assert!(persisted.layer(names::PUBLIC_GROUP, names::PARCELS).unwrap().visible);
        assert!(!persisted.layer(names::PUBLIC_GROUP, names::BUS_STOPS).unwrap().visible);
    }
}
