//! Application configuration for the sitelinks tool.
//!
//! User config lives at `~/.sitelinks/sitelinks.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: it only names the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SitelinksError};
use crate::types::{DeviceFilter, LocationId, SitelinkSpec};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitelinks.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitelinks";

// ---------------------------------------------------------------------------
// Config structs (matching sitelinks.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ads platform endpoint and credential sources.
    #[serde(default)]
    pub api: ApiConfig,

    /// Workflow defaults.
    #[serde(default)]
    pub workflow: WorkflowDefaults,

    /// Sitelinks to create, in submission order.
    #[serde(default = "default_sitelinks")]
    pub sitelinks: Vec<SitelinkSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            workflow: WorkflowDefaults::default(),
            sitelinks: default_sitelinks(),
        }
    }
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the mutate services.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API version path segment.
    #[serde(default = "default_version")]
    pub version: String,

    /// Account the workflow runs against.
    #[serde(default)]
    pub client_customer_id: String,

    /// Name of the env var holding the developer token.
    #[serde(default = "default_developer_token_env")]
    pub developer_token_env: String,

    /// Name of the env var holding an already-issued OAuth2 access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            version: default_version(),
            client_customer_id: String::new(),
            developer_token_env: default_developer_token_env(),
            access_token_env: default_access_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://adwords.google.com/api/adwords/cm".into()
}
fn default_version() -> String {
    "v201702".into()
}
fn default_developer_token_env() -> String {
    "SITELINKS_DEVELOPER_TOKEN".into()
}
fn default_access_token_env() -> String {
    "SITELINKS_ACCESS_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[workflow]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefaults {
    /// Feed names are this prefix plus a unique suffix.
    #[serde(default = "default_feed_name_prefix")]
    pub feed_name_prefix: String,

    /// Only serve the sitelinks on this device class. `Any` serves everywhere.
    #[serde(default)]
    pub device: DeviceFilter,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            feed_name_prefix: default_feed_name_prefix(),
            device: DeviceFilter::default(),
        }
    }
}

fn default_feed_name_prefix() -> String {
    "Feed For Sitelinks".into()
}

/// Geo criterion id for California.
const CALIFORNIA: LocationId = LocationId(21137);

/// The stock sitelink set; the last one only serves in California.
pub fn default_sitelinks() -> Vec<SitelinkSpec> {
    vec![
        SitelinkSpec::new("Home", "http://www.example.com", "Home line 1", "Home line 2"),
        SitelinkSpec::new(
            "Stores",
            "http://www.example.com/stores",
            "Stores line 1",
            "Stores line 2",
        ),
        SitelinkSpec::new(
            "On Sale",
            "http://www.example.com/sale",
            "On Sale line 1",
            "On Sale line 2",
        ),
        SitelinkSpec::new(
            "Support",
            "http://www.example.com/support",
            "Support line 1",
            "Support line 2",
        ),
        SitelinkSpec::new(
            "Products",
            "http://www.example.com/products",
            "Products line 1",
            "Products line 2",
        ),
        SitelinkSpec::new(
            "About Us",
            "http://www.example.com/about",
            "About Us line 1",
            "About Us line 2",
        )
        .with_location(CALIFORNIA),
    ]
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Session credentials resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub developer_token: String,
    pub access_token: String,
    pub client_customer_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("developer_token", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("client_customer_id", &self.client_customer_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitelinks/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SitelinksError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitelinks/sitelinks.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SitelinksError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SitelinksError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SitelinksError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SitelinksError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SitelinksError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve credentials from the env vars the config names.
pub fn validate_credentials(config: &AppConfig) -> Result<Credentials> {
    if config.api.client_customer_id.trim().is_empty() {
        return Err(SitelinksError::config(
            "api.client_customer_id is not set in the config file",
        ));
    }

    Ok(Credentials {
        developer_token: read_secret(&config.api.developer_token_env, "developer token")?,
        access_token: read_secret(&config.api.access_token_env, "access token")?,
        client_customer_id: config.api.client_customer_id.clone(),
    })
}

fn read_secret(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SitelinksError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))),
    }
}
