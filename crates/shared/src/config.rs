//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Identity-token verification.
    pub auth: AuthConfig,
    /// Object store credentials and network policy.
    pub storage: StorageSettings,
    /// External format converters.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Upload limits and placement.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
}

/// Identity-token verification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the identity provider signs tokens with.
    pub secret: String,
    /// Expected `iss` claim, when the provider sets one.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Lifetime of locally issued tokens in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    3600 // 1 hour
}

/// Object store credentials and network policy.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Application key ID.
    pub key_id: String,
    /// Application key secret.
    pub application_key: String,
    /// Bucket name used in public download URLs.
    pub bucket_name: String,
    /// Bucket ID; defaults to the one the key is restricted to.
    #[serde(default)]
    pub bucket_id: Option<String>,
    /// Base URL of the account authorization endpoint.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Retries after the first attempt of an upload.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Backoff multiplier per attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u64,
    /// Upper bound for a single backoff in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_auth_url() -> String {
    "https://api.backblazeb2.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    200
}

fn default_backoff_factor() -> u64 {
    2
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

/// A converter invocation as an argument vector.
///
/// Arguments may contain `{input}`, `{output}` and `{outdir}`, which are
/// substituted per argument. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConverterCommand {
    /// Executable name or path.
    pub program: String,
    /// Argument template.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ConverterCommand {
    /// Creates a converter command.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// External format converter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    /// Directory for temporary input files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Directory the converters write PDFs into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Subprocess timeout in seconds.
    #[serde(default = "default_converter_timeout")]
    pub timeout_secs: u64,
    /// Raster image to PDF converter.
    #[serde(default = "default_image_converter")]
    pub image: ConverterCommand,
    /// Office document to PDF converter.
    #[serde(default = "default_office_converter")]
    pub office: ConverterCommand,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            output_dir: default_output_dir(),
            timeout_secs: default_converter_timeout(),
            image: default_image_converter(),
            office: default_office_converter(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("dossier").join("incoming")
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("dossier").join("converted")
}

fn default_converter_timeout() -> u64 {
    120
}

fn default_image_converter() -> ConverterCommand {
    ConverterCommand::new("img2pdf", ["{input}", "-o", "{output}"])
}

fn default_office_converter() -> ConverterCommand {
    ConverterCommand::new(
        "soffice",
        [
            "--headless",
            "--convert-to",
            "pdf",
            "--outdir",
            "{outdir}",
            "{input}",
        ],
    )
}

/// Upload limits and placement.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted payload in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Object key prefix for stored documents.
    #[serde(default = "default_folder")]
    pub folder: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            folder: default_folder(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_folder() -> String {
    "documents".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("DOSSIER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
