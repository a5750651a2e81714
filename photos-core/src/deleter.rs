use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::Instant;

use crate::auth::Credentials;
use crate::client::PhotosClient;
use crate::config::{BrowserConfig, DeletionStrategy, ElementLocator, RunConfig};
use crate::error::{DeleteError, PhotosError};
use crate::models::Album;

/// Profile files that carry the signed-in browser state.
const PROFILE_SESSION_FILES: &[&str] = &[
    "cookies.sqlite",
    "cookies.sqlite-wal",
    "cert9.db",
    "key4.db",
    "logins.json",
    "prefs.js",
    "permissions.sqlite",
    "webappsstore.sqlite",
];

/// Removes one album. Implementations are selected once per run.
#[async_trait]
pub trait AlbumDeleter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn delete(&self, album: &Album) -> Result<(), DeleteError>;
}

/// Pick the deleter for the configured strategy.
pub fn build_deleter(
    config: &RunConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn AlbumDeleter>, PhotosError> {
    Ok(match config.deletion.strategy {
        DeletionStrategy::Api => {
            Arc::new(ApiDeleter::new(PhotosClient::new(&config.api, credentials)?))
        }
        DeletionStrategy::Ui => Arc::new(UiAutomationDeleter::new(config.browser.clone())),
    })
}

/// Deletes through `albums:remove`.
#[derive(Debug, Clone)]
pub struct ApiDeleter {
    client: PhotosClient,
}

impl ApiDeleter {
    pub fn new(client: PhotosClient) -> Self {
        Self { client }
    }

    pub async fn delete_album(&self, album_id: &str) -> Result<(), DeleteError> {
        self.client.remove_album(album_id).await?;
        Ok(())
    }
}

#[async_trait]
impl AlbumDeleter for ApiDeleter {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn delete(&self, album: &Album) -> Result<(), DeleteError> {
        self.delete_album(&album.id).await
    }
}

/// Deletes by driving the album page in a headless Firefox over WebDriver.
///
/// Every call gets its own WebDriver session and, unless disabled, its own
/// copy of the signed-in profile, so concurrent deletions never share
/// browser state. The session is closed after the interaction whether or
/// not it succeeded.
#[derive(Debug, Clone)]
pub struct UiAutomationDeleter {
    config: BrowserConfig,
}

impl UiAutomationDeleter {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// WebDriver capabilities for one session using `profile`.
    pub fn capabilities(&self, profile: Option<&Path>) -> Map<String, Value> {
        let mut args = vec![Value::from("-headless")];
        if let Some(profile) = profile {
            args.push(Value::from("-profile"));
            args.push(Value::from(profile.to_string_lossy().into_owned()));
        }

        let mut caps = Map::new();
        caps.insert("browserName".into(), json!("firefox"));
        caps.insert(
            "moz:firefoxOptions".into(),
            json!({
                "binary": self.config.binary.to_string_lossy(),
                "args": args,
            }),
        );
        caps
    }

    /// Open the album page, open its menu and confirm deletion.
    pub async fn confirm_delete_via_ui(&self, product_url: &str) -> Result<(), DeleteError> {
        let profile = match &self.config.profile {
            Some(profile) if self.config.isolate_profile => {
                Some(ProfileCopy::snapshot(profile).map_err(|e| {
                    DeleteError::Session(format!(
                        "failed to copy profile {}: {e}",
                        profile.display()
                    ))
                })?)
            }
            _ => None,
        };
        let profile_path = match &profile {
            Some(copy) => Some(copy.path()),
            None => self.config.profile.as_deref(),
        };

        // Session start and the interaction share one deadline; close runs after it.
        let deadline = Instant::now() + self.config.session_timeout;
        let client = self.open_session(profile_path, deadline).await?;

        let driven = tokio::time::timeout_at(deadline, self.drive(&client, product_url)).await;
        let outcome = match driven {
            Ok(result) => result,
            Err(_) => Err(DeleteError::Timeout(self.config.session_timeout)),
        };

        if let Err(e) = client.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }
        drop(profile);

        outcome
    }

    async fn open_session(
        &self,
        profile: Option<&Path>,
        deadline: Instant,
    ) -> Result<Client, DeleteError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities(profile));

        tracing::debug!("Starting WebDriver session at {}", self.config.webdriver_url);
        match tokio::time::timeout_at(deadline, builder.connect(&self.config.webdriver_url)).await
        {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(e)) => Err(DeleteError::Session(e.to_string())),
            Err(_) => Err(DeleteError::Timeout(self.config.session_timeout)),
        }
    }

    async fn drive(&self, client: &Client, product_url: &str) -> Result<(), DeleteError> {
        let (width, height) = self.config.window_size;
        client
            .set_window_size(width, height)
            .await
            .map_err(ui_failure("resize window"))?;

        client
            .goto(product_url)
            .await
            .map_err(ui_failure("open album page"))?;

        let selectors = &self.config.selectors;
        let steps = [
            ("open album menu", &selectors.overflow_menu),
            ("choose delete album", &selectors.delete_menu_item),
            ("confirm deletion", &selectors.confirm_button),
        ];

        for (step, locator) in steps {
            let element = client
                .wait()
                .at_most(self.config.step_timeout)
                .for_element(to_locator(locator))
                .await
                .map_err(|e| DeleteError::Ui {
                    step,
                    reason: format!("{locator} not found: {e}"),
                })?;
            element.click().await.map_err(ui_failure(step))?;
            tracing::debug!("UI step done: {}", step);
            tokio::time::sleep(self.config.settle_delay).await;
        }

        Ok(())
    }
}

#[async_trait]
impl AlbumDeleter for UiAutomationDeleter {
    fn name(&self) -> &'static str {
        "ui"
    }

    async fn delete(&self, album: &Album) -> Result<(), DeleteError> {
        if album.product_url.is_empty() {
            return Err(DeleteError::NoProductUrl);
        }
        self.confirm_delete_via_ui(&album.product_url).await
    }
}

fn to_locator(locator: &ElementLocator) -> Locator<'_> {
    match locator {
        ElementLocator::Css(selector) => Locator::Css(selector.as_str()),
        ElementLocator::XPath(path) => Locator::XPath(path.as_str()),
    }
}

fn ui_failure<E: std::fmt::Display>(step: &'static str) -> impl Fn(E) -> DeleteError {
    move |e| DeleteError::Ui {
        step,
        reason: e.to_string(),
    }
}

/// Throwaway copy of the signed-in state of a Firefox profile. Firefox
/// locks a profile directory per process, so each session gets its own.
struct ProfileCopy {
    dir: TempDir,
}

impl ProfileCopy {
    fn snapshot(source: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("photos-profile-").tempdir()?;
        for name in PROFILE_SESSION_FILES {
            let from: PathBuf = source.join(name);
            if from.is_file() {
                std::fs::copy(&from, dir.path().join(name))?;
            }
        }
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DeletionConfig};
    use mockito::{Matcher, Server};
    use reqwest::StatusCode;
    use std::time::Duration;

    fn api_deleter_for(server: &Server) -> ApiDeleter {
        let config = ApiConfig {
            base_url: server.url(),
            ..ApiConfig::default()
        };
        let client = PhotosClient::new(&config, &Credentials::from_access_token("t")).unwrap();
        ApiDeleter::new(client)
    }

    #[tokio::test]
    async fn api_deletion_succeeds_on_200() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/albums:remove")
            .match_body(Matcher::Json(json!({"albumId": "a1"})))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let deleter = api_deleter_for(&server);
        deleter
            .delete(&Album::new("a1", "Trip", "u1", 0))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_deletion_reports_rejection_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/albums:remove")
            .with_status(403)
            .with_body(r#"{"error":{"status":"PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let err = api_deleter_for(&server).delete_album("a1").await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(matches!(err, DeleteError::Rejected { ref body, .. } if body.contains("PERMISSION_DENIED")));
    }

    #[test]
    fn capabilities_name_binary_profile_and_headless() {
        let deleter = UiAutomationDeleter::new(BrowserConfig {
            binary: PathBuf::from("/opt/firefox/firefox"),
            ..BrowserConfig::default()
        });

        let caps = deleter.capabilities(Some(Path::new("/tmp/profile")));
        let options = &caps["moz:firefoxOptions"];
        assert_eq!(caps["browserName"], "firefox");
        assert_eq!(options["binary"], "/opt/firefox/firefox");
        assert_eq!(options["args"], json!(["-headless", "-profile", "/tmp/profile"]));

        let caps = deleter.capabilities(None);
        assert_eq!(caps["moz:firefoxOptions"]["args"], json!(["-headless"]));
    }

    #[tokio::test]
    async fn ui_deletion_without_product_url_fails() {
        let deleter = UiAutomationDeleter::new(BrowserConfig::default());
        let err = deleter
            .delete(&Album::new("a3", "Empty2", "", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::NoProductUrl));
    }

    #[tokio::test]
    async fn ui_deletion_surfaces_session_start_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/session")
            .with_status(500)
            .with_body(r#"{"value":{"error":"session not created","message":"no firefox"}}"#)
            .create_async()
            .await;

        let deleter = UiAutomationDeleter::new(BrowserConfig {
            webdriver_url: server.url(),
            session_timeout: Duration::from_secs(10),
            ..BrowserConfig::default()
        });
        let err = deleter
            .delete(&Album::new("a1", "Trip", "https://photos.example/album/a1", 0))
            .await
            .unwrap_err();

        assert!(matches!(err, DeleteError::Session(_)), "got {err:?}");
    }

    const ALBUM_URL: &str = "https://photos.example/album/a1";

    /// WebDriver endpoints for one session `s1` up to the first element lookup.
    /// Returns the session-delete mock, which must be hit exactly once.
    async fn mock_webdriver_session(server: &mut Server) -> (Vec<mockito::Mock>, mockito::Mock) {
        let mocks = vec![
            server
                .mock("POST", "/session")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"value":{"sessionId":"s1","capabilities":{}}}"#)
                .create_async()
                .await,
            server
                .mock("POST", "/session/s1/window/rect")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"value":{"x":0,"y":0,"width":800,"height":600}}"#)
                .create_async()
                .await,
            server
                .mock("POST", "/session/s1/url")
                .match_body(Matcher::PartialJson(json!({"url": ALBUM_URL})))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"value":null}"#)
                .create_async()
                .await,
            server
                .mock("GET", "/session/s1/url")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(format!(r#"{{"value":"{ALBUM_URL}"}}"#))
                .create_async()
                .await,
        ];
        let close = server
            .mock("DELETE", "/session/s1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value":null}"#)
            .expect(1)
            .create_async()
            .await;
        (mocks, close)
    }

    fn ui_deleter_for(
        server: &Server,
        step_timeout: Duration,
        session_timeout: Duration,
    ) -> UiAutomationDeleter {
        UiAutomationDeleter::new(BrowserConfig {
            webdriver_url: server.url(),
            profile: None,
            step_timeout,
            settle_delay: Duration::ZERO,
            session_timeout,
            ..BrowserConfig::default()
        })
    }

    #[tokio::test]
    async fn ui_deletion_clicks_menu_delete_and_confirm() {
        let mut server = Server::new_async().await;
        let (_session, close) = mock_webdriver_session(&mut server).await;
        let lookups = server
            .mock("POST", "/session/s1/element")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value":{"element-6066-11e4-a52e-4f735466cecf":"e1"}}"#)
            .expect(3)
            .create_async()
            .await;
        let clicks = server
            .mock("POST", "/session/s1/element/e1/click")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value":null}"#)
            .expect(3)
            .create_async()
            .await;

        let deleter = ui_deleter_for(&server, Duration::from_secs(2), Duration::from_secs(10));
        deleter
            .delete(&Album::new("a1", "Trip", ALBUM_URL, 0))
            .await
            .unwrap();

        lookups.assert_async().await;
        clicks.assert_async().await;
        close.assert_async().await;
    }

    #[tokio::test]
    async fn ui_deletion_fails_on_missing_element_and_closes_session() {
        let mut server = Server::new_async().await;
        let (_session, close) = mock_webdriver_session(&mut server).await;
        let _lookup = server
            .mock("POST", "/session/s1/element")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"value":{"error":"no such element","message":"Unable to locate element","stacktrace":""}}"#,
            )
            .create_async()
            .await;
        let clicks = server
            .mock("POST", Matcher::Regex(r"^/session/s1/element/.+/click$".into()))
            .expect(0)
            .create_async()
            .await;

        let deleter = ui_deleter_for(&server, Duration::from_millis(300), Duration::from_secs(10));
        let err = deleter
            .delete(&Album::new("a1", "Trip", ALBUM_URL, 0))
            .await
            .unwrap_err();

        assert!(
            matches!(err, DeleteError::Ui { step: "open album menu", .. }),
            "got {err:?}"
        );
        clicks.assert_async().await;
        close.assert_async().await;
    }

    #[tokio::test]
    async fn ui_deletion_is_bounded_by_session_timeout_and_still_closes() {
        let mut server = Server::new_async().await;
        let (_session, close) = mock_webdriver_session(&mut server).await;
        let _lookup = server
            .mock("POST", "/session/s1/element")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"value":{"error":"no such element","message":"Unable to locate element","stacktrace":""}}"#,
            )
            .create_async()
            .await;

        // Element waits would outlast the session deadline.
        let session_timeout = Duration::from_millis(400);
        let deleter = ui_deleter_for(&server, Duration::from_secs(30), session_timeout);
        let started = std::time::Instant::now();
        let err = deleter
            .delete(&Album::new("a1", "Trip", ALBUM_URL, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, DeleteError::Timeout(t) if t == session_timeout), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
        close.assert_async().await;
    }

    #[test]
    fn profile_copy_takes_session_files_only() {
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("cookies.sqlite"), b"cookies").unwrap();
        std::fs::write(source.path().join("places.sqlite"), b"history").unwrap();

        let copy = ProfileCopy::snapshot(source.path()).unwrap();
        assert!(copy.path().join("cookies.sqlite").is_file());
        assert!(!copy.path().join("places.sqlite").exists());

        let copied_to = copy.path().to_path_buf();
        drop(copy);
        assert!(!copied_to.exists());
    }

    #[test]
    fn strategy_selects_the_deleter() {
        let credentials = Credentials::from_access_token("t");
        let mut config = RunConfig {
            deletion: DeletionConfig {
                strategy: DeletionStrategy::Api,
                ..DeletionConfig::default()
            },
            ..RunConfig::default()
        };
        assert_eq!(build_deleter(&config, &credentials).unwrap().name(), "api");

        config.deletion.strategy = DeletionStrategy::Ui;
        assert_eq!(build_deleter(&config, &credentials).unwrap().name(), "ui");
    }
}
