//! Save a diary entry to the Otters backend.
//!
//! # Usage
//!
//! ```bash
//! # Entry dated now
//! otters-diary "lunch with Sam at 1pm"
//!
//! # Entry for a specific moment
//! otters-diary --date 2025-06-01T12:00:00Z "dentist"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use otters::types::DiaryParams;
use otters::{Otters, TokenStore};

/// Command-line arguments for the otters-diary tool.
#[derive(arrrg_derive::CommandLine, Debug, Default, PartialEq, Eq)]
struct DiaryArgs {
    /// Base URL of the Otters backend.
    #[arrrg(optional, "Base URL of the Otters API (default: http://localhost:8000/)", "URL")]
    base_url: Option<String>,

    /// Token file location.
    #[arrrg(optional, "Token file path (default: $OTTERS_TOKEN_FILE or ~/.otters/tokens.json)", "PATH")]
    token_file: Option<String>,

    /// Entry date as RFC 3339.
    #[arrrg(optional, "Entry date as RFC 3339 (default: now)", "DATE")]
    date: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = DiaryArgs::from_command_line_relaxed("otters-diary [OPTIONS] <entry>");

    let text = free.join(" ");
    let text = text.trim();
    if text.is_empty() {
        return Err("no entry text provided".into());
    }

    let date = match args.date {
        Some(date) => OffsetDateTime::parse(&date, &Rfc3339)?,
        None => OffsetDateTime::now_utc(),
    };

    let path = args
        .token_file
        .map(PathBuf::from)
        .or_else(TokenStore::default_path)
        .ok_or("cannot resolve a token file path; set OTTERS_TOKEN_FILE or HOME")?;
    let tokens = Arc::new(TokenStore::open(&path)?);

    let client = Otters::with_options(tokens, args.base_url, None)?;
    client.create_diary(&DiaryParams::new(text, date)).await?;
    println!("Diary entry saved.");

    Ok(())
}
