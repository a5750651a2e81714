use indicatif::{ProgressBar, ProgressStyle};
use photos_core::{Album, AlbumReport, ReportSink};
use std::time::Duration;

/// Prints one block per resolved album above the deletion progress bar.
pub struct ConsoleReporter {
    bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ReportSink for ConsoleReporter {
    fn report(&self, report: &AlbumReport) {
        let line = format_report(report);
        // Whole block in one write, with the bar cleared while it prints.
        self.bar.suspend(|| println!("{line}"));
        match report {
            AlbumReport::Removed { album } | AlbumReport::Failed { album, .. } => {
                self.bar.inc(1);
                self.bar.set_message(album.title.clone());
            }
            AlbumReport::Skipped { .. } => {}
        }
    }
}

pub fn format_report(report: &AlbumReport) -> String {
    match report {
        AlbumReport::Skipped { album } => format!(
            "🖼️ Album {} has {}. Skipping removal.",
            album.title,
            album.item_count_label()
        ),
        AlbumReport::Removed { album } => format!(
            "🗑️ Successfully removed empty album: {}.\n\tID: {}",
            album.title, album.id
        ),
        AlbumReport::Failed { album, reason } => format!(
            "⚠️ Failed to remove album: {}.\n\tError: {}\n\tID: {}",
            album.title, reason, album.id
        ),
    }
}

pub fn format_album(album: &Album) -> String {
    format!(
        "🖼️ Album: {}\n\tID: {}\n\tURL: {}\n\tNumber of photos: {}",
        album.title, album.id, album.product_url, album.media_item_count
    )
}

pub fn deletion_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.red/blue} {pos}/{len} {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░ "),
    );
    bar.set_message("Removing empty albums...");
    bar
}

pub fn listing_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("Invalid spinner template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Listing albums...");
    spinner
}
