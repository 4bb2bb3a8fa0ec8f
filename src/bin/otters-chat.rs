//! Interactive chat with the Otters assistant.
//!
//! This binary provides a REPL interface over the Otters backend. A new
//! server-side session is established when the REPL starts; if that fails the
//! conversation continues without one.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage against a local backend
//! otters-chat
//!
//! # Point at a deployed backend
//! otters-chat --base-url https://otters.example.com/
//!
//! # Disable colors (useful for piping output)
//! otters-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new conversation with a fresh session
//! - `/record` - Toggle voice capture (placeholder)
//! - `/diary <text>` - Save a diary entry
//! - `/stats` - Show conversation statistics
//! - `/logout` - Forget the stored login tokens
//! - `/quit` - Exit the application

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use otters::chat::{
    ChatArgs, ChatCommand, ChatConfig, Conversation, PlainTextObserver, RecordingState,
    SendOutcome, SessionState, TranscriptObserver, help_text, parse_command,
};
use otters::types::DiaryParams;
use otters::{Otters, TokenStore};

/// Main entry point for the otters-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("otters-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let tokens = open_token_store(config.token_file.clone());
    if tokens.get().is_none() {
        eprintln!("No stored login; run otters-login first or requests will be rejected.");
    }

    let client = Arc::new(Otters::with_options(
        tokens,
        Some(config.base_url.clone()),
        Some(config.timeout),
    )?);
    let printer = Arc::new(PlainTextObserver::with_color(use_color));
    let observer: Arc<dyn TranscriptObserver> = printer.clone();

    let mut conversation = Conversation::new(Arc::clone(&client), Arc::clone(&observer));
    let _ = conversation.start().await;

    let mut rl = DefaultEditor::new()?;

    println!("Otters Chat ({})", config.base_url);
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::New => {
                            conversation =
                                Conversation::new(Arc::clone(&client), Arc::clone(&observer));
                            let _ = conversation.start().await;
                            printer.print_info("Started a new conversation.");
                        }
                        ChatCommand::Record => {
                            let state = conversation.toggle_recording();
                            match state {
                                RecordingState::Recording => printer.print_info(
                                    "Recording on (voice capture is not yet implemented).",
                                ),
                                RecordingState::Idle => printer.print_info("Recording off."),
                            }
                        }
                        ChatCommand::Diary(text) => {
                            match client.create_diary(&DiaryParams::now(text)).await {
                                Ok(()) => printer.print_info("Diary entry saved."),
                                Err(err) => printer
                                    .print_error(&format!("Failed to save diary entry: {err}")),
                            }
                        }
                        ChatCommand::Logout => match client.logout() {
                            Ok(()) => printer.print_info("Logged out."),
                            Err(err) => {
                                printer.print_error(&format!("Failed to clear tokens: {err}"))
                            }
                        },
                        ChatCommand::Stats => {
                            print_stats(&conversation);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            printer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send through the conversation.
                if conversation.send(line).await == SendOutcome::RejectedBusy {
                    printer.print_info("Still waiting on the previous message.");
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                printer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Open the token store, falling back to an in-memory store if the file is
/// unusable.
fn open_token_store(path: Option<PathBuf>) -> Arc<TokenStore> {
    let path = path.or_else(TokenStore::default_path);
    match path {
        Some(path) => match TokenStore::open(&path) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                eprintln!(
                    "Could not read token file {}: {err}; continuing without stored tokens.",
                    path.display()
                );
                Arc::new(TokenStore::in_memory())
            }
        },
        None => Arc::new(TokenStore::in_memory()),
    }
}

fn print_stats(conversation: &Conversation<Otters>) {
    let stats = conversation.stats();
    println!("    Conversation Statistics:");
    match &stats.session {
        SessionState::Active(id) => println!("      Session: {id}"),
        SessionState::Failed => println!("      Session: (creation failed; running without one)"),
        SessionState::Creating => println!("      Session: (creating)"),
        SessionState::Uninitialized => println!("      Session: (not started)"),
    }
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Send in flight: {}",
        if stats.pending { "yes" } else { "no" }
    );
    println!(
        "      Recording: {}",
        if stats.recording.is_recording() {
            "on"
        } else {
            "off"
        }
    );
}
