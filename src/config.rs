use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Input, Password};
use reqwest::Url;
use std::path::PathBuf;

/// Wiki Gateway - authenticated client for the wiki API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the wiki API
    #[arg(short = 'u', long, env = "WIKI_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Path to the credentials SQLite database
    #[arg(short = 'd', long, env = "WIKI_CREDENTIALS_DB", global = true)]
    pub credentials_db: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30", global = true)]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in and store the session credentials
    Signin {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Clear the stored credentials
    Signout,

    /// Show the signed-in user
    Whoami,

    /// Wiki profiles
    #[command(subcommand)]
    Profiles(ProfileCommand),

    /// Free board articles
    #[command(subcommand)]
    Articles(ArticleCommand),

    /// Send a raw request through the gateway
    Request(RawRequest),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// List wiki profiles
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "5")]
        page_size: u32,
        /// Search by name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show a wiki profile
    Show { code: String },

    /// Create your wiki profile
    Create {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
    },

    /// Check whether a wiki is being edited
    Status { code: String },

    /// Answer the security quiz to start editing
    Quiz {
        code: String,
        /// Prompted for when omitted
        #[arg(long)]
        answer: Option<String>,
    },

    /// Replace the wiki content
    Edit {
        code: String,
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        /// New wiki body
        #[arg(long)]
        content: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ArticleCommand {
    /// List board articles
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "10")]
        page_size: u32,
        /// Sort order (recent, like)
        #[arg(long, default_value = "recent")]
        order: String,
        #[arg(long)]
        keyword: Option<String>,
    },

    /// Show an article
    Show { id: i64 },

    /// Post an article
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "")]
        image: String,
    },

    /// List comments of an article
    Comments {
        id: i64,
        #[arg(long, default_value = "10")]
        limit: u32,
        #[arg(long)]
        cursor: Option<i64>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RawRequest {
    /// HTTP method
    pub method: String,
    /// Path relative to the API base URL
    pub path: String,
    /// JSON body
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_base_url: String,

    // Credentials
    pub credentials_db: PathBuf,

    // Timeouts
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub refresh_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    /// Build config from parsed arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let api_base_url = args
            .api_url
            .clone()
            .context("WIKI_API_URL is required (use -u or set WIKI_API_URL env var)")?;

        let credentials_db = match args.credentials_db {
            Some(ref path) => expand_tilde(path),
            None => default_credentials_db()
                .context("Cannot locate a data directory; set WIKI_CREDENTIALS_DB")?,
        };

        Ok(Config {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            credentials_db,

            http_connect_timeout: env_or("HTTP_CONNECT_TIMEOUT", 10),
            http_request_timeout: args.http_timeout,
            refresh_timeout: env_or("REFRESH_TIMEOUT", 10),

            log_level: args.log_level.clone(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("WIKI_API_URL is not a valid URL: {}", self.api_base_url))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "WIKI_API_URL must use http or https: {}",
                self.api_base_url
            );
        }

        if self.http_request_timeout == 0 || self.refresh_timeout == 0 {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        Ok(())
    }
}

fn env_or(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Default location of the credentials database
fn default_credentials_db() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("wiki-gateway").join("credentials.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// === Interactive prompts ===

/// Use the given value or ask for it
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .with_context(|| format!("Failed to read {}", prompt)),
    }
}

/// Use the given secret or ask for it without echo
pub fn secret_or_prompt(value: Option<String>, prompt: &str, confirm: bool) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }

    let mut password = Password::new().with_prompt(prompt);
    if confirm {
        password = password.with_confirmation("Repeat to confirm", "Entries do not match");
    }
    let secret = password
        .interact()
        .with_context(|| format!("Failed to read {}", prompt))?;

    if secret.is_empty() {
        anyhow::bail!("{} cannot be empty", prompt);
    }
    Ok(secret)
}
