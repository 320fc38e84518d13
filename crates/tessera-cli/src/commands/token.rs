//! Token management commands.
//!
//! `tessera token issue` - Issue a token for a principal in the directory.
//! `tessera token verify` - Verify a token and show who it belongs to.
//! `tessera token inspect` - Show a token's claims without verifying it.
//! `tessera token revoke` - Log the token's principal out everywhere.

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_core::{RequestContext, TesseraConfig};
use tessera_token::{
    Authentication, ClaimProviderRegistry, SaltPolicy, TokenCodec, TokenHandler, bearer,
};
use tracing::warn;

use crate::directory::PrincipalDirectory;

/// Where the handler gets its configuration and principals.
#[derive(Args, Debug, Clone)]
pub struct HandlerArgs {
    /// Tessera configuration file (YAML). Defaults apply when omitted.
    #[arg(long, env = "TESSERA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Principal directory file (YAML)
    #[arg(long, env = "TESSERA_PRINCIPALS")]
    pub principals: PathBuf,

    /// Client address of the simulated request
    #[arg(long)]
    pub ip: Option<IpAddr>,

    /// Use the short-lived token profile
    #[arg(long, default_value_t = false)]
    pub short_lived: bool,
}

/// A handler wired to a principal directory.
pub struct Session {
    handler: TokenHandler,
    directory: Arc<PrincipalDirectory>,
    ip: Option<IpAddr>,
}

impl Session {
    pub fn open(args: &HandlerArgs) -> anyhow::Result<Self> {
        let config = load_config(args.config.as_deref())?;
        let directory = Arc::new(PrincipalDirectory::load(&args.principals)?);
        let registry = ClaimProviderRegistry::standard(directory.clone(), directory.clone());

        let handler = if args.short_lived {
            TokenHandler::short_lived(&config.short_lived, registry, directory.clone())
        } else {
            TokenHandler::login(&config.token, registry, directory.clone())
        }
        .context("Failed to initialise token handler")?;

        Ok(Self {
            handler,
            directory,
            ip: args.ip,
        })
    }

    fn request(&self) -> RequestContext {
        RequestContext {
            client_address: self.ip,
            previous_login: None,
        }
    }

    /// Issue a token for a principal given by identifier or email.
    pub async fn issue(&self, principal: &str) -> anyhow::Result<String> {
        let principal = self
            .directory
            .find(principal)?
            .with_context(|| format!("No principal matching {:?}", principal))?;

        let request = RequestContext {
            previous_login: principal.last_active,
            ..self.request()
        };
        let token = self.handler.issue(&principal, &request).await?;

        if self.handler.policy().salt_policy == SaltPolicy::RotateWhenStale {
            self.directory.touch(principal.id, Utc::now())?;
        }
        Ok(token)
    }

    pub async fn verify(&self, token: &str) -> anyhow::Result<Authentication> {
        self.handler
            .authenticate_detailed(token, &self.request())
            .await
            .context("Token verification failed")?
            .context("No token provided")
    }

    pub async fn revoke(&self, token: &str) -> anyhow::Result<()> {
        self.handler
            .invalidate(token, &self.request())
            .await
            .context("Failed to revoke token")
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TesseraConfig> {
    match path {
        Some(path) if path.exists() => TesseraConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        Some(path) => {
            warn!(config = %path.display(), "Config file not found, using defaults");
            Ok(TesseraConfig::default())
        }
        None => Ok(TesseraConfig::default()),
    }
}

/// Accept a token, a file containing one, or an `Authorization` header value.
fn read_token(token: &str) -> anyhow::Result<String> {
    let raw = if Path::new(token).exists() {
        fs::read_to_string(token)?
    } else {
        token.to_string()
    };
    let raw = raw.trim();
    Ok(bearer::extract(raw).unwrap_or(raw).to_string())
}

/// Issue a token and print it.
pub async fn issue(args: &HandlerArgs, principal: &str, header: bool) -> anyhow::Result<()> {
    let session = Session::open(args)?;
    let token = session.issue(principal).await?;

    if header {
        println!("{}: {}", bearer::AUTHORIZATION_HEADER, bearer::header_value(&token));
    } else {
        println!("{}", token);
    }
    Ok(())
}

/// Verify a token and print the principal it resolves to.
pub async fn verify(args: &HandlerArgs, token: &str) -> anyhow::Result<()> {
    let session = Session::open(args)?;
    let auth = session.verify(&read_token(token)?).await?;

    println!("✔ Token is valid");
    println!();
    println!("Token Details:");
    println!("  Principal: {} ({})", auth.principal.email, auth.principal.id);
    println!("  Expires: {}", auth.expires_at.to_rfc3339());
    if auth.special_groups.is_empty() {
        println!("  Special groups: (none)");
    } else {
        println!("  Special groups:");
        for group in &auth.special_groups {
            println!("    - {}", group);
        }
    }
    Ok(())
}

/// Print a token's claims without verifying anything.
pub fn inspect(token: &str) -> anyhow::Result<()> {
    let claims = TokenCodec::inspect_unverified(&read_token(token)?)
        .context("Failed to inspect token (encrypted tokens cannot be inspected)")?;

    println!("Token Claims (unverified):");
    println!("{}", serde_json::to_string_pretty(&claims)?);
    if let Some(expires_at) = claims.expiration() {
        println!();
        println!("  Expires: {}", expires_at.to_rfc3339());
    }
    Ok(())
}

/// Revoke every token held by the token's principal.
pub async fn revoke(args: &HandlerArgs, token: &str) -> anyhow::Result<()> {
    let session = Session::open(args)?;
    session.revoke(&read_token(token)?).await?;

    println!("✔ Revocation secret cleared; all tokens for this principal are now invalid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    const ALICE: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    const GROUP: &str = "8f14e45f-ceea-467a-9a2b-5c4b9d2f1a11";

    fn setup() -> (TempDir, HandlerArgs) {
        let dir = tempdir().unwrap();
        let config = dir.path().join("tessera.yaml");
        fs::write(
            &config,
            "token:\n  signing:\n    value: cli-test-signing-secret\n  expiration: 30\n",
        )
        .unwrap();
        let principals = dir.path().join("principals.yaml");
        fs::write(
            &principals,
            format!(
                "principals:\n  - id: {ALICE}\n    email: alice@example.org\n    special_groups: [{GROUP}]\n"
            ),
        )
        .unwrap();

        let args = HandlerArgs {
            config: Some(config),
            principals,
            ip: Some("192.0.2.10".parse().unwrap()),
            short_lived: false,
        };
        (dir, args)
    }

    #[tokio::test]
    async fn test_issue_verify_revoke() {
        let (_dir, args) = setup();

        let token = Session::open(&args)
            .unwrap()
            .issue("alice@example.org")
            .await
            .unwrap();

        // A fresh session sees the persisted revocation secret.
        let session = Session::open(&args).unwrap();
        let auth = session.verify(&token).await.unwrap();
        assert_eq!(auth.principal.id.to_string(), ALICE);
        assert_eq!(auth.special_groups[0].to_string(), GROUP);
        assert!(auth.principal.last_active.is_some());

        session.revoke(&token).await.unwrap();
        assert!(Session::open(&args).unwrap().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_from_other_address_fails() {
        let (_dir, args) = setup();
        let token = Session::open(&args).unwrap().issue(ALICE).await.unwrap();

        let elsewhere = HandlerArgs {
            ip: Some("198.51.100.1".parse().unwrap()),
            ..args
        };
        assert!(Session::open(&elsewhere).unwrap().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_short_lived_needs_login_first() {
        let (_dir, args) = setup();
        let short_lived = HandlerArgs {
            short_lived: true,
            ..args.clone()
        };
        assert!(
            Session::open(&short_lived)
                .unwrap()
                .issue(ALICE)
                .await
                .is_err()
        );

        Session::open(&args).unwrap().issue(ALICE).await.unwrap();
        let session = Session::open(&short_lived).unwrap();
        let link = session.issue(ALICE).await.unwrap();
        assert_eq!(session.verify(&link).await.unwrap().principal.id.to_string(), ALICE);
    }

    #[tokio::test]
    async fn test_unknown_principal() {
        let (_dir, args) = setup();
        let err = Session::open(&args)
            .unwrap()
            .issue("nobody@example.org")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No principal"));
    }

    #[test]
    fn test_read_token_strips_bearer_scheme() {
        assert_eq!(read_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(read_token("  abc.def.ghi\n").unwrap(), "abc.def.ghi");
    }
}
