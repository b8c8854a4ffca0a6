//! Warden token verifier
//!
//! Verifies a provider-issued token the way a network-facing service would:
//! against the provider's public keys, with no SDK state involved.
//!
//! ## Usage
//!
//! ```bash
//! warden-verify verify "$TOKEN"
//! echo "$TOKEN" | warden-verify verify
//! warden-verify header "$TOKEN"
//! ```
//!
//! Configuration comes from `WARDEN_*` environment variables (or `.env`).
//! The session JSON is printed to stdout; logs go to stderr.

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use warden_auth_core::{
    decode_token_header, token_fingerprint, AuthConfig, AuthError, TokenVerifier,
};

/// Exit code for a token that was read and rejected
const EXIT_REJECTED: u8 = 2;

/// Exit code for unusable configuration (sysexits `EX_CONFIG`)
const EXIT_CONFIG: u8 = 78;

#[derive(Parser)]
#[command(name = "warden-verify")]
#[command(about = "Verify provider-issued tokens against the provider's public keys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Key-distribution endpoint (overrides WARDEN_PUBLIC_KEYS_URL)
    #[arg(long, global = true)]
    keys_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a token and print its session
    Verify {
        /// Token to verify; read from stdin when omitted or "-"
        token: Option<String>,
    },
    /// Decode a token header without verifying anything
    Header {
        /// Token to decode; read from stdin when omitted or "-"
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging (stderr only - stdout carries the result)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    warden_auth_core::metrics::describe_metrics();

    let cli = Cli::parse();

    match cli.command {
        Command::Verify { token } => {
            let token = read_token(token)?;
            let config = match load_config(cli.keys_url) {
                Ok(config) => config,
                Err(e) => return report(&e, EXIT_CONFIG),
            };

            verify(&config, &token).await
        }
        Command::Header { token } => {
            let token = read_token(token)?;
            match decode_token_header(&token) {
                Ok(header) => {
                    let output = serde_json::json!({
                        "kid": header.kid,
                        "alg": format!("{:?}", header.alg),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => report(&AuthError::from(e), EXIT_REJECTED),
            }
        }
    }
}

fn load_config(keys_url: Option<String>) -> Result<AuthConfig, AuthError> {
    let config = AuthConfig::from_env()?;
    Ok(match keys_url {
        Some(url) => config.with_public_keys_url(url),
        None => config,
    })
}

async fn verify(config: &AuthConfig, token: &str) -> anyhow::Result<ExitCode> {
    tracing::info!(
        issuer = %config.expected_issuer(),
        token = %token_fingerprint(token),
        "Verifying token"
    );

    let verifier = TokenVerifier::new(config);

    match verifier.verify(token).await {
        Ok(session) => {
            tracing::info!(uid = session.uid().unwrap_or_default(), "Token verified");
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => report(&AuthError::from(e), EXIT_REJECTED),
    }
}

fn report(err: &AuthError, code: u8) -> anyhow::Result<ExitCode> {
    tracing::warn!(code = err.error_code(), "Verification failed: {}", err);
    println!("{}", serde_json::to_string_pretty(&error_body(err))?);
    Ok(ExitCode::from(code))
}

fn error_body(err: &AuthError) -> serde_json::Value {
    let kind = match err {
        AuthError::Verification(e) => Some(e.kind()),
        _ => None,
    };
    serde_json::json!({
        "error": err.error_code(),
        "kind": kind,
        "message": err.to_string(),
    })
}

fn read_token(arg: Option<String>) -> anyhow::Result<String> {
    let raw = match arg.as_deref() {
        Some("-") | None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read token from stdin")?;
            buf
        }
        Some(token) => token.to_string(),
    };

    let token = raw.trim().to_string();
    anyhow::ensure!(!token.is_empty(), "No token given");
    Ok(token)
}
