use clap::Parser;
use repolook::github::API_BASE_URL;
use repolook::suggest::{DEFAULT_MODEL, GEMINI_API_URL};

#[derive(Parser)]
#[command(name = "repolook")]
#[command(about = "RepoLook - Look up GitHub repositories and discover related projects")]
#[command(version)]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP server
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = API_BASE_URL)]
    pub github_api_url: String,

    /// Timeout for outbound requests, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout: u64,

    /// API key for the Gemini backend that suggests related repositories
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_URL", default_value = GEMINI_API_URL)]
    pub gemini_api_url: String,
}

impl Cli {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
