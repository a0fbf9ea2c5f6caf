/// `load_config` module: Loads a static YAML publish config and injects Blogger secrets from the environment.
///
/// This module is the only place where untrusted YAML is parsed and mapped to the
/// strongly-typed settings the publish steps are built from.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]
/// - Read the Blogger url, id and access token from the environment (`.env` honoured)
///   into [`BloggerSettings`]
/// - Surface clear diagnostics: every loading failure names the file and the cause
///
/// Missing Blogger variables are *not* an error here. The blog step is built
/// anyway and the pipeline reports every missing setting when it is built.
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use scans_publish_core::retry::{FolderTarget, RetryPolicy};
use scans_publish_core::state::{LinkKind, ReleaseInfo};
use scans_publish_core::steps::{Artifact, BloggerSettings};
use scans_publish_core::Compensation;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

pub const BLOGGER_URL_ENV: &str = "BLOGGER_URL";
pub const BLOGGER_ID_ENV: &str = "BLOGGER_ID";
pub const BLOGGER_ACCESS_TOKEN_ENV: &str = "BLOGGER_ACCESS_TOKEN";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub release: ReleaseInfo,
    pub working_dir: PathBuf,
    pub pdf_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Directory holding `blogger-template.html`; the executable's `config/` dir when absent.
    pub template_dir: Option<PathBuf>,
    pub compensation: Compensation,
    pub retry: RetryPolicy,
    pub storage: Vec<StorageTarget>,
    pub blogger: BloggerSection,
    /// Blogger url, id and access token, all from the environment.
    pub blogger_settings: BloggerSettings,
}

/// One upload destination: a directory published under `base_url`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StorageTarget {
    /// Provider label used in step names and logs (e.g. "box").
    pub provider: String,
    pub root: PathBuf,
    pub base_url: String,
    pub artifact: Artifact,
    pub link: LinkKind,
    #[serde(default)]
    pub reader_link: Option<LinkKind>,
    #[serde(default)]
    pub folder: FolderTarget,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BloggerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub label: Option<String>,
    /// Blogger API root; the public Google endpoint when absent.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for BloggerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            label: None,
            api_base: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RetrySection {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: 0,
        }
    }
}

fn default_attempts() -> u32 {
    1
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        RetryPolicy::attempts(section.attempts).with_delay(Duration::from_millis(section.delay_ms))
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    release: ReleaseInfo,
    working_dir: PathBuf,
    #[serde(default)]
    pdf_file: Option<PathBuf>,
    output_dir: PathBuf,
    #[serde(default)]
    template_dir: Option<PathBuf>,
    #[serde(default)]
    compensation: Compensation,
    #[serde(default)]
    retry: RetrySection,
    #[serde(default)]
    storage: Vec<StorageTarget>,
    #[serde(default)]
    blogger: BloggerSection,
}

fn non_blank_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Loads a static YAML config file (no secrets) and injects the Blogger settings from env vars.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    dotenvy::dotenv().ok();
    let blogger_settings = BloggerSettings::new(
        non_blank_env(BLOGGER_URL_ENV),
        non_blank_env(BLOGGER_ID_ENV),
    )
    .with_access_token(non_blank_env(BLOGGER_ACCESS_TOKEN_ENV));
    if raw.blogger.enabled && blogger_settings.access_token.is_none() {
        warn!(
            env = BLOGGER_ACCESS_TOKEN_ENV,
            "Blogger access token missing in environment"
        );
    }

    Ok(CliConfig {
        retry: RetryPolicy::from(&raw.retry),
        release: raw.release,
        working_dir: raw.working_dir,
        pdf_file: raw.pdf_file,
        output_dir: raw.output_dir,
        template_dir: raw.template_dir,
        compensation: raw.compensation,
        storage: raw.storage,
        blogger: raw.blogger,
        blogger_settings,
    })
}
