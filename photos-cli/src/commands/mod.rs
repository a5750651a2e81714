pub mod delete_empty;
pub mod list;

use anyhow::{Context, Result};
use photos_core::{
    AlbumCollection, AlbumLister, Authenticator, Credentials, PhotosClient, RunConfig,
    TokenFileAuthenticator,
};

use crate::report::listing_spinner;

async fn authenticate(config: &RunConfig, scopes: &[&str]) -> Result<Credentials> {
    let authenticator = TokenFileAuthenticator::new(&config.auth.token_file);
    authenticator
        .authenticate(scopes)
        .await
        .with_context(|| format!("Failed to authenticate with {}", authenticator.path().display()))
}

fn lister(config: &RunConfig, credentials: &Credentials) -> Result<AlbumLister> {
    let client = PhotosClient::new(&config.api, credentials).context("Failed to build API client")?;
    Ok(AlbumLister::new(client))
}

/// Walk every page with a spinner showing the running totals.
async fn list_with_spinner(lister: &AlbumLister) -> AlbumCollection {
    let spinner = listing_spinner();
    let albums = lister
        .list_albums_with_progress(|progress| {
            spinner.set_message(format!(
                "Listing albums... {} so far ({} pages)",
                progress.albums, progress.pages
            ));
        })
        .await;
    spinner.finish_and_clear();

    if let Some(halt) = &albums.halted {
        println!(
            "⚠️ Failed to retrieve albums page {}: {}. Continuing with {} albums.",
            halt.page,
            halt.error,
            albums.len()
        );
    }

    albums
}
