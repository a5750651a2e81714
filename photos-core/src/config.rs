use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{LIBRARY_SCOPE, READONLY_SCOPE};
use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://photoslibrary.googleapis.com";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Everything one run needs, passed explicitly into each component.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub browser: BrowserConfig,
    pub deletion: DeletionConfig,
}

impl RunConfig {
    /// Checks that must pass before the first request goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.deletion.validate()?;
        if self.deletion.strategy == DeletionStrategy::Ui && !self.deletion.dry_run {
            self.browser.validate()?;
            // Firefox locks a profile directory to one process.
            if !self.browser.isolate_profile && self.deletion.concurrency > 1 {
                return Err(ConfigError::Invalid {
                    field: "concurrency",
                    reason: "a shared browser profile requires --concurrency 1".into(),
                });
            }
            if self.deletion.task_timeout <= self.browser.session_timeout {
                return Err(ConfigError::Invalid {
                    field: "task timeout",
                    reason: format!(
                        "must exceed the browser session timeout of {}s",
                        self.browser.session_timeout.as_secs()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "api base url",
                reason: format!("not an http(s) url: {}", self.base_url),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from("token.json"),
        }
    }
}

/// Element locators for the album page's delete flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementLocator {
    Css(String),
    XPath(String),
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementLocator::Css(selector) => write!(f, "css `{selector}`"),
            ElementLocator::XPath(path) => write!(f, "xpath `{path}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSelectors {
    pub overflow_menu: ElementLocator,
    pub delete_menu_item: ElementLocator,
    pub confirm_button: ElementLocator,
}

impl Default for UiSelectors {
    fn default() -> Self {
        Self {
            overflow_menu: ElementLocator::Css(r#"[aria-label="More options"]"#.into()),
            delete_menu_item: ElementLocator::XPath(
                r#"//*[@role="menuitem"][.//*[normalize-space()="Delete album"]]"#.into(),
            ),
            confirm_button: ElementLocator::XPath(
                r#"//*[@role="dialog"]//button[normalize-space()="Delete"]"#.into(),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub binary: PathBuf,
    pub profile: Option<PathBuf>,
    /// Give each session a private copy of the profile's signed-in state.
    pub isolate_profile: bool,
    pub webdriver_url: String,
    pub window_size: (u32, u32),
    /// Upper bound on waiting for each element of the delete flow.
    pub step_timeout: Duration,
    /// Pause after each click so UI transitions can finish.
    pub settle_delay: Duration,
    /// Upper bound on session start plus the album interaction. Closing the
    /// session happens after it and is not counted.
    pub session_timeout: Duration,
    pub selectors: UiSelectors,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: default_browser_binary(),
            profile: None,
            isolate_profile: true,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            window_size: (800, 600),
            step_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            session_timeout: Duration::from_secs(90),
            selectors: UiSelectors::default(),
        }
    }
}

impl BrowserConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.binary.is_file() {
            return Err(ConfigError::MissingBrowserBinary(self.binary.clone()));
        }
        match &self.profile {
            None => Err(ConfigError::NoBrowserProfile),
            Some(profile) if !profile.is_dir() => {
                Err(ConfigError::MissingBrowserProfile(profile.clone()))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Which deleter variant a run uses. Chosen once, at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionStrategy {
    /// `albums:remove`, needs the full library scope.
    Api,
    /// Browser automation, works under the read-only scope.
    #[default]
    Ui,
}

impl DeletionStrategy {
    pub fn required_scopes(&self) -> &'static [&'static str] {
        match self {
            DeletionStrategy::Api => &[LIBRARY_SCOPE],
            DeletionStrategy::Ui => &[READONLY_SCOPE],
        }
    }
}

impl fmt::Display for DeletionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionStrategy::Api => f.write_str("api"),
            DeletionStrategy::Ui => f.write_str("ui"),
        }
    }
}

impl FromStr for DeletionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(DeletionStrategy::Api),
            "ui" | "browser" => Ok(DeletionStrategy::Ui),
            other => Err(format!("unknown deletion strategy `{other}` (expected `api` or `ui`)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeletionConfig {
    pub strategy: DeletionStrategy,
    pub concurrency: usize,
    pub task_timeout: Duration,
    pub dry_run: bool,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            strategy: DeletionStrategy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            task_timeout: Duration::from_secs(180),
            dry_run: false,
        }
    }
}

impl DeletionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.task_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "task timeout",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Platform default for the Firefox executable.
pub fn default_browser_binary() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Program Files\Mozilla Firefox\firefox.exe")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/Firefox.app/Contents/MacOS/firefox")
    } else {
        PathBuf::from("/usr/bin/firefox")
    }
}

/// Directory holding Firefox profiles on this platform, from the environment.
pub fn default_profile_root() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA")
            .map(|appdata| PathBuf::from(appdata).join("Mozilla").join("Firefox").join("Profiles"))
    } else if cfg!(target_os = "macos") {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("Firefox")
                .join("Profiles")
        })
    } else {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".mozilla").join("firefox"))
    }
}

/// First `*.default-release` profile under `root`, falling back to `*.default`.
pub fn discover_profile(root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    candidates.sort();

    let has_suffix = |path: &PathBuf, suffix: &str| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix))
    };

    candidates
        .iter()
        .find(|path| has_suffix(path, ".default-release"))
        .or_else(|| candidates.iter().find(|path| has_suffix(path, ".default")))
        .cloned()
}

pub fn default_browser_profile() -> Option<PathBuf> {
    default_profile_root().and_then(|root| discover_profile(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn strategy_parses_and_picks_scopes() {
        assert_eq!("API".parse::<DeletionStrategy>().unwrap(), DeletionStrategy::Api);
        assert_eq!("ui".parse::<DeletionStrategy>().unwrap(), DeletionStrategy::Ui);
        assert!("selenium".parse::<DeletionStrategy>().is_err());

        assert_eq!(DeletionStrategy::Api.required_scopes(), &[LIBRARY_SCOPE]);
        assert_eq!(DeletionStrategy::Ui.required_scopes(), &[READONLY_SCOPE]);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = DeletionConfig {
            concurrency: 0,
            ..DeletionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn browser_paths_must_exist() {
        let tmp = TempDir::new().unwrap();
        let binary = tmp.path().join("firefox");
        let profile = tmp.path().join("abc.default-release");

        let mut config = BrowserConfig {
            binary: binary.clone(),
            profile: Some(profile.clone()),
            ..BrowserConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingBrowserBinary(binary.clone()))
        );

        fs::write(&binary, b"").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingBrowserProfile(profile.clone()))
        );

        fs::create_dir(&profile).unwrap();
        assert_eq!(config.validate(), Ok(()));

        config.profile = None;
        assert_eq!(config.validate(), Err(ConfigError::NoBrowserProfile));
    }

    #[test]
    fn dry_run_skips_browser_validation() {
        let config = RunConfig {
            browser: BrowserConfig {
                binary: PathBuf::from("/definitely/not/here"),
                ..BrowserConfig::default()
            },
            deletion: DeletionConfig {
                dry_run: true,
                ..DeletionConfig::default()
            },
            ..RunConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    fn ui_run_with_browser(tmp: &TempDir) -> RunConfig {
        let binary = tmp.path().join("firefox");
        let profile = tmp.path().join("abc.default-release");
        fs::write(&binary, b"").unwrap();
        fs::create_dir(&profile).unwrap();
        RunConfig {
            browser: BrowserConfig {
                binary,
                profile: Some(profile),
                ..BrowserConfig::default()
            },
            ..RunConfig::default()
        }
    }

    #[test]
    fn shared_profile_requires_single_worker() {
        let tmp = TempDir::new().unwrap();
        let mut config = ui_run_with_browser(&tmp);
        config.browser.isolate_profile = false;
        assert_eq!(config.deletion.concurrency, DEFAULT_CONCURRENCY);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "concurrency", .. })
        ));

        config.deletion.concurrency = 1;
        assert_eq!(config.validate(), Ok(()));

        config.deletion.concurrency = 5;
        config.browser.isolate_profile = true;
        assert_eq!(config.validate(), Ok(()));

        config.browser.isolate_profile = false;
        config.deletion.strategy = DeletionStrategy::Api;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn task_timeout_must_outlast_browser_session() {
        let tmp = TempDir::new().unwrap();
        let mut config = ui_run_with_browser(&tmp);
        assert!(config.deletion.task_timeout > config.browser.session_timeout);
        assert_eq!(config.validate(), Ok(()));

        config.deletion.task_timeout = config.browser.session_timeout;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "task timeout", .. })
        ));

        config.deletion.strategy = DeletionStrategy::Api;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn discover_prefers_default_release() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("aaaa.default")).unwrap();
        fs::create_dir(tmp.path().join("zzzz.default-release")).unwrap();
        fs::write(tmp.path().join("profiles.ini"), b"").unwrap();

        let found = discover_profile(tmp.path()).unwrap();
        assert!(found.ends_with("zzzz.default-release"));
    }

    #[test]
    fn discover_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("aaaa.default")).unwrap();
        fs::create_dir(tmp.path().join("Crash Reports")).unwrap();

        let found = discover_profile(tmp.path()).unwrap();
        assert!(found.ends_with("aaaa.default"));
        assert_eq!(discover_profile(&tmp.path().join("missing")), None);
    }
}
