use crate::client::PhotosClient;
use crate::models::{AlbumCollection, ListingHalt};

/// Snapshot passed to the listing observer after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub pages: usize,
    pub albums: usize,
}

/// Walks the albums-list pagination chain.
#[derive(Debug, Clone)]
pub struct AlbumLister {
    client: PhotosClient,
}

impl AlbumLister {
    pub fn new(client: PhotosClient) -> Self {
        Self { client }
    }

    pub async fn list_albums(&self) -> AlbumCollection {
        self.list_albums_with_progress(|_| {}).await
    }

    pub async fn list_empty_albums(&self) -> AlbumCollection {
        self.list_albums().await.into_empty()
    }

    /// Fetch every page in order. A failed page stops the walk and the
    /// albums gathered so far are returned with `halted` set.
    pub async fn list_albums_with_progress<F>(&self, mut on_page: F) -> AlbumCollection
    where
        F: FnMut(PageProgress),
    {
        let mut collection = AlbumCollection::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_number = collection.pages_fetched + 1;
            let page = match self.client.list_page(page_token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Failed to retrieve albums page {}: {}", page_number, e);
                    collection.halted = Some(ListingHalt {
                        page: page_number,
                        error: e.to_string(),
                    });
                    break;
                }
            };

            page_token = page.continuation().map(str::to_string);
            collection.extend_from_page(page);

            tracing::info!(
                "Fetched albums page {} ({} albums so far)",
                collection.pages_fetched,
                collection.len()
            );
            on_page(PageProgress {
                pages: collection.pages_fetched,
                albums: collection.len(),
            });

            if page_token.is_none() {
                break;
            }
        }

        collection
    }
}
