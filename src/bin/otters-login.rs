//! Exchange a Google-issued credential for Otters tokens.
//!
//! The browser-based consent flow is outside this tool's scope: obtain a
//! credential from Google's identity service (for example via the OAuth
//! playground), then paste it here. On success the token pair is persisted
//! and picked up by otters-chat and otters-diary.
//!
//! # Usage
//!
//! ```bash
//! # Prompt for a credential
//! otters-login
//!
//! # Pass the credential directly
//! otters-login --credential "eyJhbGciOi..."
//!
//! # Forget the stored tokens
//! otters-login --logout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;

use otters::{Otters, TokenStore};

/// Command-line arguments for the otters-login tool.
#[derive(arrrg_derive::CommandLine, Debug, Default, PartialEq, Eq)]
struct LoginArgs {
    /// Base URL of the Otters backend.
    #[arrrg(optional, "Base URL of the Otters API (default: http://localhost:8000/)", "URL")]
    base_url: Option<String>,

    /// Token file location.
    #[arrrg(optional, "Token file path (default: $OTTERS_TOKEN_FILE or ~/.otters/tokens.json)", "PATH")]
    token_file: Option<String>,

    /// Credential to exchange.
    #[arrrg(optional, "Google-issued credential to exchange", "CREDENTIAL")]
    credential: Option<String>,

    /// Clear stored tokens instead of logging in.
    #[arrrg(flag, "Forget the stored token pair and exit")]
    logout: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = LoginArgs::from_command_line_relaxed("otters-login [OPTIONS]");

    let path = args
        .token_file
        .map(PathBuf::from)
        .or_else(TokenStore::default_path)
        .ok_or("cannot resolve a token file path; set OTTERS_TOKEN_FILE or HOME")?;
    let tokens = Arc::new(TokenStore::open(&path)?);

    if args.logout {
        tokens.clear()?;
        println!("Stored tokens cleared.");
        return Ok(());
    }

    let credential = match args.credential {
        Some(credential) => credential,
        None => {
            let mut rl = DefaultEditor::new()?;
            rl.readline("Google credential: ")?.trim().to_string()
        }
    };
    if credential.is_empty() {
        return Err("no credential provided".into());
    }

    let client = Otters::with_options(Arc::clone(&tokens), args.base_url, None)?;
    client.login_google(&credential).await?;
    println!("Logged in; tokens saved to {}.", path.display());

    Ok(())
}
