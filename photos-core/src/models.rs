use serde::{Deserialize, Deserializer, Serialize};

/// A single album as returned by the albums-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub product_url: String,
    #[serde(
        rename = "mediaItemsCount",
        default,
        deserialize_with = "deserialize_item_count",
        serialize_with = "serialize_item_count"
    )]
    pub media_item_count: u64,
}

impl Album {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        product_url: impl Into<String>,
        media_item_count: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            product_url: product_url.into(),
            media_item_count,
        }
    }

    /// Only empty albums are ever deletion candidates.
    pub fn is_empty(&self) -> bool {
        self.media_item_count == 0
    }

    /// "1 item" / "12 items"
    pub fn item_count_label(&self) -> String {
        match self.media_item_count {
            1 => "1 item".to_string(),
            n => format!("{n} items"),
        }
    }
}

/// One response of the albums-list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPage {
    #[serde(default)]
    pub albums: Vec<Album>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl AlbumPage {
    /// Token for the following page, treating an empty string as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Why a listing stopped before the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingHalt {
    /// 1-based index of the page that failed.
    pub page: usize,
    pub error: String,
}

/// Albums accumulated over every page of one listing pass, in API order.
#[derive(Debug, Clone, Default)]
pub struct AlbumCollection {
    pub albums: Vec<Album>,
    pub pages_fetched: usize,
    pub halted: Option<ListingHalt>,
}

impl AlbumCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_from_page(&mut self, page: AlbumPage) {
        self.albums.extend(page.albums);
        self.pages_fetched += 1;
    }

    pub fn len(&self) -> usize {
        self.albums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.halted.is_some()
    }

    pub fn empty_albums(&self) -> impl Iterator<Item = &Album> {
        self.albums.iter().filter(|album| album.is_empty())
    }

    /// Keep only albums with no media items, preserving order.
    pub fn into_empty(self) -> Self {
        Self {
            albums: self.albums.into_iter().filter(Album::is_empty).collect(),
            pages_fetched: self.pages_fetched,
            halted: self.halted,
        }
    }

    /// Split into `(empty, non_empty)`, each in listing order.
    pub fn partition_by_emptiness(self) -> (Vec<Album>, Vec<Album>) {
        self.albums.into_iter().partition(Album::is_empty)
    }
}

impl IntoIterator for AlbumCollection {
    type Item = Album;
    type IntoIter = std::vec::IntoIter<Album>;

    fn into_iter(self) -> Self::IntoIter {
        self.albums.into_iter()
    }
}

/// The API encodes `mediaItemsCount` as a string; accept numbers too.
fn deserialize_item_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Count::Number(n)) => Ok(n),
        Some(Count::Text(text)) if text.trim().is_empty() => Ok(0),
        Some(Count::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid mediaItemsCount: {text}"))),
    }
}

fn serialize_item_count<S>(count: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&count.to_string())
}
