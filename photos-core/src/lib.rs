pub mod auth;
pub mod client;
pub mod config;
pub mod deleter;
pub mod error;
pub mod lister;
pub mod models;
pub mod orchestrator;

pub use auth::{Authenticator, Credentials, TokenFileAuthenticator, LIBRARY_SCOPE, READONLY_SCOPE};
pub use client::PhotosClient;
pub use config::{
    ApiConfig, AuthConfig, BrowserConfig, DeletionConfig, DeletionStrategy, ElementLocator,
    RunConfig, UiSelectors,
};
pub use deleter::{build_deleter, AlbumDeleter, ApiDeleter, UiAutomationDeleter};
pub use error::{AuthError, ConfigError, DeleteError, PhotosError};
pub use lister::{AlbumLister, PageProgress};
pub use models::{Album, AlbumCollection, AlbumPage, ListingHalt};
pub use orchestrator::{
    AlbumReport, DeletionPool, DeletionTask, Orchestrator, OrchestratorOptions, ReportSink,
    RunSummary, TaskState,
};
