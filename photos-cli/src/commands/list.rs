use anyhow::{Context, Result};
use photos_core::{RunConfig, READONLY_SCOPE};

use super::{authenticate, list_with_spinner, lister};
use crate::report::format_album;

pub async fn execute(config: RunConfig) -> Result<()> {
    config.api.validate().context("Invalid configuration")?;

    let credentials = authenticate(&config, &[READONLY_SCOPE]).await?;
    let lister = lister(&config, &credentials)?;

    let albums = list_with_spinner(&lister).await;

    for album in &albums.albums {
        println!("{}", format_album(album));
    }

    let empty = albums.empty_albums().count();
    println!(
        "\n{} albums ({} empty) across {} pages",
        albums.len(),
        empty,
        albums.pages_fetched
    );

    Ok(())
}
