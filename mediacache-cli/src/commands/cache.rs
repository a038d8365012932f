//! Cache inspection and erasure commands.

use clap::ValueEnum;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mediacache::cache::{CacheManager, CacheStatistics, Partition, PartitionStats};
use mediacache::config::{format_size_human, ConfigFile};

use super::common::start_cache;
use crate::error::CliError;

/// What `erase` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EraseTarget {
    /// Thumbnail partition only
    Thumbnails,
    /// Media partition only
    Media,
    /// Both partitions
    All,
}

impl EraseTarget {
    pub fn partitions(self) -> &'static [Partition] {
        match self {
            EraseTarget::Thumbnails => &[Partition::Thumbnails],
            EraseTarget::Media => &[Partition::Media],
            EraseTarget::All => &Partition::ALL,
        }
    }
}

/// Print sizes, ceilings and entry counts.
pub fn run_stats(config: &ConfigFile) -> Result<(), CliError> {
    let cache = start_cache(config)?;
    println!("Cache: {}", config.cache.directory.display());
    if !cache.is_available() {
        println!("  Storage is not available");
        return Ok(());
    }
    print!("{}", format_statistics(&cache.statistics()));
    cache.shutdown();
    Ok(())
}

/// Delete every cached file of the target partitions.
///
/// Ctrl-C stops the erase between files.
pub fn run_erase(config: &ConfigFile, target: EraseTarget) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let cache = start_cache(config)?;
    let result = erase(&cache, target, &cancel);
    cache.shutdown();
    result
}

fn erase(
    cache: &CacheManager,
    target: EraseTarget,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    for partition in target.partitions() {
        let before = cache.statistics();
        let stats = before.partition(*partition);
        println!(
            "Erasing {}: {} files, {}",
            partition,
            stats.entries,
            format_size_human(stats.size_bytes)
        );
        cache.erase_all(*partition, cancel)?;
        info!(partition = %partition, "Partition erased");
    }
    println!("Done.");
    Ok(())
}

/// Render statistics as an aligned text block.
pub fn format_statistics(stats: &CacheStatistics) -> String {
    let mut out = String::new();
    for partition in Partition::ALL {
        out.push_str(&format_partition(partition, stats.partition(partition)));
    }
    out.push_str(&format!(
        "  {:<11} {} entries, {}\n",
        "total",
        stats.total_entries(),
        format_size_human(stats.total_size())
    ));
    if stats.pending_deletions > 0 {
        out.push_str(&format!("  {} deletions pending\n", stats.pending_deletions));
    }
    out
}

fn format_partition(partition: Partition, stats: &PartitionStats) -> String {
    format!(
        "  {:<11} {} entries, {} of {} ({:.1}%)\n",
        partition.to_string(),
        stats.entries,
        format_size_human(stats.size_bytes),
        format_size_human(stats.ceiling_bytes),
        stats.usage() * 100.0
    )
}
