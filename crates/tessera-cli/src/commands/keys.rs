//! Key management commands.
//!
//! `tessera keys generate` - Generate a server secret.

use std::fs;
use std::path::PathBuf;
use tessera_token::generate_secret;

/// Generate a secret for `token.signing` or `token.encryption`.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let secret = generate_secret();

    if let Some(output_path) = output {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, &secret)?;

        println!("✔ Secret written to: {}", output_path.display());
        println!();
        println!("⚠️  Keep it secure! Never commit it to version control.");
        println!();
        println!("Set as an environment variable:");
        println!(
            "  export TESSERA_TOKEN_SECRET=$(cat {})",
            output_path.display()
        );
    } else {
        println!("{}", secret);
    }

    Ok(())
}
