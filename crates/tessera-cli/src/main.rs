use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod directory;

use commands::token::HandlerArgs;

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Tessera bearer token CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Server secret management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Issue, verify, inspect and revoke tokens
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a random secret (24 bytes, base64)
    Generate {
        /// Write the secret to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a token for a principal
    Issue {
        #[command(flatten)]
        handler: HandlerArgs,

        /// Principal identifier or email
        #[arg(long)]
        principal: String,

        /// Print as an Authorization header
        #[arg(long, default_value_t = false)]
        header: bool,
    },

    /// Verify a token
    Verify {
        #[command(flatten)]
        handler: HandlerArgs,

        /// Token, file containing one, or "Bearer <token>"
        token: String,
    },

    /// Show a token's claims without verifying it
    Inspect {
        /// Token, file containing one, or "Bearer <token>"
        token: String,
    },

    /// Log the token's principal out everywhere
    Revoke {
        #[command(flatten)]
        handler: HandlerArgs,

        /// Token, file containing one, or "Bearer <token>"
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output } => commands::keys::generate(output)?,
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Issue {
                handler,
                principal,
                header,
            } => commands::token::issue(&handler, &principal, header).await?,
            TokenCommand::Verify { handler, token } => {
                commands::token::verify(&handler, &token).await?
            }
            TokenCommand::Inspect { token } => commands::token::inspect(&token)?,
            TokenCommand::Revoke { handler, token } => {
                commands::token::revoke(&handler, &token).await?
            }
        },
    }

    Ok(())
}
