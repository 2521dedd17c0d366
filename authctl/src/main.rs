/*
 * Responsibility
 * - tokio runtime
 * - Operator commands over the grant vocabulary and token issuance
 */
use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use grants::Grant;
use simpleauth::{
    app,
    config::Config,
    error::AppError,
    models::{Principal, UserDirectory},
};
use uuid::Uuid;

/// Inspect grants and issue or check tokens with the configured keys.
///
/// Settings come from the environment (or `.env`), the same keys the
/// library reads: AUTH_ISSUER, ACCESS_JWT_PRIVATE_KEY_PEM, CUSTOM_GRANTS, ...
#[derive(Parser, Debug)]
#[command(name = "authctl", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every grant name with its bit value
    Grants,

    /// Parse a comma-separated grant expression
    Parse {
        /// e.g. "otp,users-refresh" or "authenticated"
        grant: String,
    },

    /// Issue tokens for a principal using the login policy
    Issue {
        #[arg(long)]
        user_id: Option<Uuid>,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "USER")]
        user_type: String,
        /// Issue the short-lived otp-validate token instead
        #[arg(long, default_value_t = false)]
        totp_enabled: bool,
    },

    /// Verify a token and require a grant
    Check {
        token: String,
        #[arg(long, default_value = "authenticated")]
        require: String,
    },

    /// Exchange a refresh token, looking the principal up in a JSON file
    Refresh {
        token: String,
        /// JSON array of principals
        #[arg(long, value_name = "FILE")]
        users: PathBuf,
    },
}

/// Principals loaded from a file, keyed by id.
struct FileDirectory(HashMap<Uuid, Principal>);

impl FileDirectory {
    fn load(path: &PathBuf) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let users: Vec<Principal> = serde_json::from_str(&raw)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(Self(users.into_iter().map(|u| (u.user_id, u)).collect()))
    }
}

impl UserDirectory for FileDirectory {
    fn find_by_id(
        &self,
        user_id: Uuid,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Option<Principal>, AppError>> + Send + '_>,
    > {
        Box::pin(async move { Ok(self.0.get(&user_id).cloned()) })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    app::init_tracing();
    let args = Args::parse();

    let config = Config::from_env().context("load configuration")?;
    let state = app::build_state(&config)?;

    match args.command {
        Command::Grants => {
            let table = state.grants.snapshot();
            for (grant, name) in table.entries() {
                let kind = if table.custom_mask().intersects(grant) {
                    "custom"
                } else {
                    "builtin"
                };
                println!("{:#010x}  {:<8} {}", grant.bits(), kind, name);
            }
        }
        Command::Parse { grant } => {
            let table = state.grants.snapshot();
            let parsed = table.parse(&grant)?;
            let cleaned = table.clean(parsed);
            let out = serde_json::json!({
                "bits": format!("{:#010x}", parsed.bits()),
                "long": table.to_long_string(parsed),
                "short": table.to_short_string(parsed),
                "clean": table.to_long_string(cleaned),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Issue {
            user_id,
            email,
            username,
            user_type,
            totp_enabled,
        } => {
            let principal = Principal {
                user_id: user_id.unwrap_or_else(Uuid::new_v4),
                email,
                username,
                user_type,
                totp_enabled,
            };
            let token = state.tokens.login(&principal)?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        Command::Check { token, require } => {
            let required: Grant = state.grants.to_grant(&require)?;
            match state.tokens.authorize(&token, required) {
                Ok(verified) => {
                    let out = serde_json::json!({
                        "sub": verified.user_id,
                        "grant": verified.grant,
                        "expires_at": verified.expires_at,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                Err(err) => bail!("denied: {err}"),
            }
        }
        Command::Refresh { token, users } => {
            let users = FileDirectory::load(&users)?;
            let token = state.tokens.refresh(&token, &users).await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
    }

    Ok(())
}
