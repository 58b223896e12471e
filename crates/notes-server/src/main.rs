//! Note-taking backend service
//!
//! Provides:
//! - Email OTP signup and login
//! - Google OAuth sign-in
//! - Per-user notes behind signed session tokens

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_server::config::{Config, GoogleConfig, SessionConfig, SmtpConfig};
use notes_server::credentials::{CredentialService, TokenSigner};
use notes_server::mailer::SmtpMailer;
use notes_server::notes::NoteService;
use notes_server::oauth::GoogleOAuth;
use notes_server::storage::MongoStore;
use notes_server::AppState;

#[derive(Parser, Debug)]
#[command(name = "notes-server")]
#[command(about = "Note-taking backend with email OTP and Google sign-in")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 5000, env = "PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "BIND")]
    bind: String,

    /// Optional JSON file with token and OTP lifetimes
    #[arg(long, env = "NOTES_CONFIG")]
    config: Option<PathBuf>,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, default_value = "note-taking-app", env = "MONGODB_DATABASE")]
    mongodb_database: String,

    /// Secret used to sign session tokens
    #[arg(long, env = "SECRET_KEY", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    secret_key: String,

    /// SMTP relay host
    #[arg(long, default_value = "smtp.gmail.com", env = "SMTP_HOST")]
    smtp_host: String,

    /// SMTP relay port (STARTTLS)
    #[arg(long, default_value_t = 587, env = "SMTP_PORT")]
    smtp_port: u16,

    /// SMTP username
    #[arg(long, env = "EMAIL_USER", value_parser = NonEmptyStringValueParser::new())]
    email_user: String,

    /// SMTP password
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    email_pass: String,

    /// Sender address (defaults to the SMTP username)
    #[arg(long, env = "EMAIL_FROM")]
    email_from: Option<String>,

    /// Google OAuth client id
    #[arg(long, env = "GOOGLE_CLIENT_ID", value_parser = NonEmptyStringValueParser::new())]
    google_client_id: String,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    google_client_secret: String,

    /// Callback URL registered with Google
    #[arg(
        long,
        default_value = "http://localhost:5000/auth/google/callback",
        env = "GOOGLE_REDIRECT_URL"
    )]
    google_redirect_url: String,

    /// Front-end URL (CORS origin and post-login redirect target)
    #[arg(long, default_value = "http://localhost:5173", env = "FRONTEND_URL")]
    frontend_url: url::Url,

    /// Mark the session cookie Secure
    #[arg(long, default_value_t = true, env = "COOKIE_SECURE", action = clap::ArgAction::Set)]
    cookie_secure: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG from it reaches the filter.
    // A missing file is fine; required values are enforced by clap below
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let store = Arc::new(
        MongoStore::connect(&cli.mongodb_uri, &cli.mongodb_database)
            .await
            .context("Failed to connect to MongoDB")?,
    );

    let mailer = SmtpMailer::new(&SmtpConfig {
        host: cli.smtp_host.clone(),
        port: cli.smtp_port,
        username: cli.email_user.clone(),
        password: cli.email_pass.clone(),
        from: cli.email_from.clone().unwrap_or_else(|| cli.email_user.clone()),
    })?;
    match mailer.verify().await {
        Ok(()) => tracing::info!("Email service is ready"),
        Err(e) => tracing::warn!("Email service check failed: {:#}", e),
    }

    let google = GoogleOAuth::new(&GoogleConfig {
        client_id: cli.google_client_id.clone(),
        client_secret: cli.google_client_secret.clone(),
        redirect_url: cli.google_redirect_url.clone(),
    })?;

    let credentials = CredentialService::new(
        store.clone(),
        Arc::new(mailer),
        TokenSigner::new(
            cli.secret_key.as_bytes(),
            config.tokens.session_lifetime_secs,
        )?,
        config.otp.lifetime_secs,
    );

    let state = Arc::new(AppState {
        credentials,
        notes: NoteService::new(store.clone(), store),
        oauth: Arc::new(google),
        session: SessionConfig {
            cookie_secure: cli.cookie_secure,
            frontend_url: cli.frontend_url.clone(),
        },
    });

    let app = notes_server::router(state)?;

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;

    tracing::info!("Starting notes-server on {}", addr);
    tracing::info!("Front end: {}", cli.frontend_url);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("notes-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn args(secret: &str) -> Vec<String> {
        [
            "notes-server",
            "--mongodb-uri",
            "mongodb://localhost:27017",
            "--secret-key",
            secret,
            "--email-user",
            "notes@example.com",
            "--email-pass",
            "pw",
            "--google-client-id",
            "id",
            "--google-client-secret",
            "shh",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_values_parse() {
        let cli = Cli::try_parse_from(args("signing-secret")).unwrap();
        assert_eq!(cli.secret_key, "signing-secret");
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(Cli::try_parse_from(args("")).is_err());
    }
}
