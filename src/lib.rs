// src/lib.rs

pub mod cli;
pub mod config;
pub mod content;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod mounts;
pub mod normalization;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::content::{
    ContentTypeResolver, ContentTypeSource, ContentTypeStore, FileFingerprint, FileIndexedStore,
    GlobalCacheLocations, IndexedStore, MemoryIndexedStore, TieredContentTypeCache,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::mounts::{default_provider, supports_watching, WatchableFileSystemRegistry};
use crate::normalization::{SourceFileFilter, SourceFileNormalization};
use crate::types::StoreMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the watch-capability registry (built once from the platform mounts)
/// - the tiered content-type cache and resolver
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;

    match args.command {
        Command::Mounts => {
            let registry = build_registry().await?;
            print_mounts(&registry);
            Ok(())
        }
        Command::CheckWatch { subtree, paths } => {
            let registry = build_registry().await?;
            check_watch(&registry, &paths, subtree)
        }
        Command::Classify { paths } => {
            let base = config_root_dir(&config_path);
            let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
            let resolver = Arc::new(build_resolver(&cfg, &base, fs)?);
            classify_paths(resolver, paths).await
        }
    }
}

/// Enumerate mounts once (a blocking platform call) and build the registry.
pub async fn build_registry() -> Result<WatchableFileSystemRegistry> {
    tokio::task::spawn_blocking(|| {
        let provider = default_provider();
        WatchableFileSystemRegistry::from_provider(provider.as_ref())
    })
    .await?
}

/// Open one cache tier with the configured backing.
pub fn open_store(
    name: &str,
    mode: StoreMode,
    dir: &Path,
    fs: Arc<dyn FileSystem>,
) -> Result<ContentTypeStore> {
    let backend: Box<dyn IndexedStore> = match mode {
        StoreMode::Memory => Box::new(MemoryIndexedStore::new()),
        StoreMode::File => Box::new(FileIndexedStore::open(fs, &dir.join(name))?),
    };
    Ok(ContentTypeStore::new(name, backend))
}

/// Build the global/local content-type cache described by `cfg`.
///
/// File-backed tiers live under `<cache dir>/global` and `<cache dir>/local`.
pub fn build_content_type_cache(
    cfg: &ConfigFile,
    base: &Path,
    fs: Arc<dyn FileSystem>,
) -> Result<TieredContentTypeCache> {
    let dir = cfg.cache_dir(base);
    let global = open_store("global", cfg.cache.global_store, &dir, fs.clone())?;
    let local = open_store("local", cfg.cache.local_store, &dir, fs)?;
    let policy = GlobalCacheLocations::new(&cfg.cache.global_locations);

    Ok(TieredContentTypeCache::new(
        Arc::new(global),
        Arc::new(local),
        Arc::new(policy),
    ))
}

/// Evaluate the configured source-file extensions into a filter.
pub fn source_file_filter(cfg: &ConfigFile) -> errors::Result<SourceFileFilter> {
    let mut normalization = SourceFileNormalization::new();
    for ext in cfg.source_files.include_extensions.iter() {
        normalization.include_extension(ext.as_str())?;
    }
    Ok(normalization.evaluate().clone())
}

pub fn build_resolver(
    cfg: &ConfigFile,
    base: &Path,
    fs: Arc<dyn FileSystem>,
) -> Result<ContentTypeResolver> {
    let cache = build_content_type_cache(cfg, base, fs.clone())?;
    let filter = source_file_filter(cfg)?;
    Ok(ContentTypeResolver::new(fs, Arc::new(cache), filter))
}

/// Figure out the directory relative cache paths resolve against.
///
/// - If the config path has a non-empty parent (e.g. "conf/filestate.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current working
///   directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_mounts(registry: &WatchableFileSystemRegistry) {
    println!("mounts ({}):", registry.catalog().len());
    for record in registry.catalog().records() {
        let verdict = if supports_watching(record) {
            "watchable"
        } else {
            "unwatchable"
        };
        println!(
            "  {:<12} {:<10} {}  (device: {}, remote: {}, case-sensitive: {}, case-preserving: {})",
            verdict,
            record.fs_type,
            record.mount_path.display(),
            record.device_name,
            record.remote,
            record.case_sensitive,
            record.case_preserving,
        );
    }
}

fn check_watch(registry: &WatchableFileSystemRegistry, paths: &[PathBuf], subtree: bool) -> Result<()> {
    let mut refused = 0usize;

    for path in paths {
        let outcome = if subtree {
            registry.ensure_hierarchy_watchable(path)
        } else {
            registry.ensure_watchable(path)
        };
        match outcome {
            Ok(()) => println!("watchable    {}", path.display()),
            Err(err) => {
                refused += 1;
                println!("unwatchable  {}", path.display());
                eprintln!("  {err}");
            }
        }
    }

    if refused > 0 {
        return Err(anyhow!("{refused} of {} paths cannot be watched", paths.len()));
    }
    Ok(())
}

/// Fingerprint every path on blocking workers and print results in input order.
async fn classify_paths(resolver: Arc<ContentTypeResolver>, paths: Vec<PathBuf>) -> Result<()> {
    let total = paths.len();
    let mut set = JoinSet::new();

    for (idx, path) in paths.into_iter().enumerate() {
        let resolver = resolver.clone();
        set.spawn_blocking(move || {
            let result = resolver.fingerprint(&path);
            (idx, path, result)
        });
    }

    let mut results: Vec<(usize, PathBuf, Result<FileFingerprint>)> = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(idx, _, _)| *idx);

    let mut failed = 0usize;
    for (_, path, result) in results {
        match result {
            Ok(fp) => print_fingerprint(&fp),
            Err(err) => {
                failed += 1;
                eprintln!("error: {}: {err:#}", path.display());
            }
        }
    }

    info!(total, failed, "classification finished");
    if failed > 0 {
        return Err(anyhow!("{failed} of {total} files could not be classified"));
    }
    debug!("all files classified");
    Ok(())
}

fn print_fingerprint(fp: &FileFingerprint) {
    let source = match fp.source {
        ContentTypeSource::SourceExtension => "extension",
        ContentTypeSource::Cache => "cache",
    };
    match fp.normalized_hash {
        Some(normalized) => println!(
            "{}  {:<6}  {:<9}  {}  (normalized: {})",
            fp.hash,
            fp.content_type,
            source,
            fp.path.display(),
            normalized
        ),
        None => println!(
            "{}  {:<6}  {:<9}  {}",
            fp.hash,
            fp.content_type,
            source,
            fp.path.display()
        ),
    }
}
