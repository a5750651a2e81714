use anyhow::{Context, Result};
use photos_core::{
    build_deleter, AlbumCollection, AlbumReport, Orchestrator, OrchestratorOptions, RunConfig,
    READONLY_SCOPE,
};

use super::{authenticate, list_with_spinner, lister};
use crate::report::{deletion_bar, format_report, ConsoleReporter};

/// Listing alone never needs more than read access.
const DRY_RUN_SCOPES: &[&str] = &[READONLY_SCOPE];

pub async fn execute(config: RunConfig) -> Result<()> {
    // Bad paths and settings are fatal before anything touches the network
    config.validate().context("Invalid configuration")?;

    let scopes = if config.deletion.dry_run {
        DRY_RUN_SCOPES
    } else {
        config.deletion.strategy.required_scopes()
    };
    let credentials = authenticate(&config, scopes).await?;
    let lister = lister(&config, &credentials)?;

    if config.deletion.dry_run {
        let albums = list_with_spinner(&lister).await;
        return dry_run(albums);
    }

    tracing::info!(
        "Removing empty albums with the {} strategy ({} workers)",
        config.deletion.strategy,
        config.deletion.concurrency
    );
    let deleter = build_deleter(&config, &credentials).context("Failed to set up deleter")?;
    let orchestrator = Orchestrator::new(
        lister,
        deleter,
        OrchestratorOptions::from(&config.deletion),
    )?;

    let albums = list_with_spinner(orchestrator.lister()).await;
    let bar = deletion_bar(albums.empty_albums().count() as u64);
    let reporter = ConsoleReporter::new(bar.clone());

    let summary = orchestrator.process(albums, &reporter).await;
    bar.finish_with_message("Done");

    println!(
        "\n✓ {} removed, {} failed, {} skipped (of {} albums listed)",
        summary.succeeded, summary.failed, summary.skipped, summary.listed
    );
    if summary.listing_halt.is_some() {
        println!("⚠️ Listing was incomplete; run again to pick up the remaining albums.");
    }

    if summary.failed > 0 {
        anyhow::bail!("{} album(s) could not be removed", summary.failed);
    }

    Ok(())
}

fn dry_run(albums: AlbumCollection) -> Result<()> {
    let (empty, non_empty) = albums.partition_by_emptiness();

    for album in non_empty {
        println!("{}", format_report(&AlbumReport::Skipped { album }));
    }
    for album in &empty {
        println!("🗑️ Would remove empty album: {}.\n\tID: {}", album.title, album.id);
    }
    println!("\n{} empty albums would be removed", empty.len());

    Ok(())
}
