use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Used for health checks when `ML_SERVICE_URL` is unset.
pub const DEFAULT_ML_SERVICE_URL: &str = "http://localhost:5001";

/// Origins allowed outside production.
const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:5001",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5001",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraderKind {
    /// Fabricated grades, no inference
    Random,
    /// Delegate to the ML grading service at `ML_SERVICE_URL`
    Remote,
}

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Deployment environment ("production" switches CORS origins)
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub node_env: String,

    /// Frontend origin allowed in production
    #[arg(long, env = "CLIENT_URL")]
    pub client_url: Option<String>,

    /// Base URL of the ML grading service
    #[arg(long, env = "ML_SERVICE_URL")]
    pub ml_service_url: Option<String>,

    /// Which grader answers predictions
    #[arg(long, env = "GRADER", value_enum, default_value = "random")]
    pub grader: GraderKind,

    /// Staging directory for uploaded images
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Keep staged uploads on disk after the request completes
    #[arg(long, env = "RETAIN_UPLOADS")]
    pub retain_uploads: bool,

    /// Maximum request body size for uploads, in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: usize,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "MONGO_URI", hide_env_values = true)]
    pub mongo_uri: Option<String>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "JWT_EXPIRE", default_value = "7d")]
    pub jwt_expire: String,

    /// Cookie lifetime in days
    #[arg(long, env = "JWT_COOKIE_EXPIRE", default_value = "30")]
    pub jwt_cookie_expire: u32,

    #[arg(long, env = "KANNADA_LANGUAGE_CODE", default_value = "kn-IN")]
    pub kannada_language_code: String,

    #[arg(long, env = "GCP_SERVICE_ACCOUNT_KEY", hide_env_values = true)]
    pub gcp_service_account_key: Option<String>,
}

impl Config {
    /// Names of required variables that are unset or empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.required()
            .into_iter()
            .filter(|(_, value)| value.is_none_or(str::is_empty))
            .map(|(name, _)| name)
            .collect()
    }

    /// Required variables with their values masked for logging.
    pub fn masked_required(&self) -> Vec<(&'static str, String)> {
        self.required()
            .into_iter()
            .map(|(name, value)| (name, mask(value.unwrap_or_default())))
            .collect()
    }

    fn required(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("GEMINI_API_KEY", self.gemini_api_key.as_deref()),
            ("MONGO_URI", self.mongo_uri.as_deref()),
            ("JWT_SECRET", self.jwt_secret.as_deref()),
        ]
    }

    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }

    pub fn ml_service_url(&self) -> &str {
        self.ml_service_url
            .as_deref()
            .unwrap_or(DEFAULT_ML_SERVICE_URL)
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        if self.is_production() {
            [self.client_url.as_deref(), self.ml_service_url.as_deref()]
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect()
        } else {
            DEV_ORIGINS.iter().map(|origin| origin.to_string()).collect()
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("node_env", &self.node_env)
            .field("client_url", &self.client_url)
            .field("ml_service_url", &self.ml_service_url)
            .field("grader", &self.grader)
            .field("upload_dir", &self.upload_dir)
            .field("retain_uploads", &self.retain_uploads)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("jwt_expire", &self.jwt_expire)
            .field("jwt_cookie_expire", &self.jwt_cookie_expire)
            .field("kannada_language_code", &self.kannada_language_code)
            .finish_non_exhaustive()
    }
}

/// Keeps the first 10 and last 4 characters of a secret.
fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 14 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["crop-grader"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn empty_required_values_count_as_missing() {
        let config = parse(&[
            "--gemini-api-key",
            "",
            "--mongo-uri",
            "mongodb://localhost/farm",
            "--jwt-secret",
            "",
        ]);
        assert_eq!(config.missing_required(), vec!["GEMINI_API_KEY", "JWT_SECRET"]);
    }

    #[test]
    fn complete_config_has_nothing_missing() {
        let config = parse(&[
            "--gemini-api-key",
            "key",
            "--mongo-uri",
            "mongodb://localhost/farm",
            "--jwt-secret",
            "secret",
        ]);
        assert!(config.missing_required().is_empty());
    }

    #[test]
    fn production_origins_come_from_urls() {
        let config = parse(&[
            "--node-env",
            "production",
            "--client-url",
            "https://farm.example",
            "--ml-service-url",
            "https://ml.example",
        ]);
        assert_eq!(
            config.allowed_origins(),
            vec!["https://farm.example", "https://ml.example"]
        );

        let config = parse(&["--node-env", "development"]);
        assert_eq!(config.allowed_origins().len(), DEV_ORIGINS.len());
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("mongodb+srv://user:pw@cluster"), "mongodb+sr...ster");
    }
}
