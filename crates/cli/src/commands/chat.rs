//! `sera chat` runs exchanges from the terminal.
//!
//! History lives in an in-memory store for the lifetime of the process.
//! Typing `/reset` starts the conversation over; `exit` quits.

use std::io::Write;
use std::sync::Arc;

use sera_config::AppConfig;
use sera_conversation::{ConversationOrchestrator, ExchangeStatus};
use sera_core::session::SessionId;
use sera_sessions::InMemoryStore;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the user typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Empty,
    Exit,
    Reset,
    Message(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    match line.trim() {
        "" => Line::Empty,
        "exit" | "quit" | "/exit" | "/quit" => Line::Exit,
        "/reset" => Line::Reset,
        _ => Line::Message(line.trim_end_matches(['\r', '\n'])),
    }
}

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = match sera_providers::build_from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set SERA_API_KEY (or OPENAI_API_KEY), or edit the [provider] section of:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            return Err(e.into());
        }
    };
    let token_counter = sera_providers::build_token_counter(&config)?;
    let store = Arc::new(InMemoryStore::new(1));
    let orchestrator =
        ConversationOrchestrator::from_config(&config, provider, token_counter, store);
    let name = config.persona.assistant_name.clone();
    let session = SessionId::new();

    if let Some(msg) = message {
        eprint!("  ...");
        let outcome = orchestrator.exchange(&session, Some(&msg)).await;
        eprint!("\r     \r");
        println!("{}", outcome?.response);
        return Ok(());
    }

    println!();
    println!("  Sera, interactive mode");
    println!();
    println!("  Backend:   {} ({})", config.provider.kind, config.provider.model);
    println!("  Token cap: {}", config.max_tokens_limit);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type '/reset' to start over, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        match classify(&line) {
            Line::Empty => {}
            Line::Exit => break,
            Line::Reset => {
                orchestrator.reset(&session).await?;
                println!("  (conversation reset)");
                println!();
            }
            Line::Message(text) => {
                eprint!("  ...");
                let result = orchestrator.exchange(&session, Some(text)).await;
                eprint!("\r     \r");
                match result {
                    Ok(outcome) => {
                        println!();
                        for reply_line in outcome.response.lines() {
                            println!("  {name} > {reply_line}");
                        }
                        if let ExchangeStatus::Rejected(reason) = &outcome.status {
                            println!("  ({reason}; type /reset to start over)");
                        }
                        println!();
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Take care.");
    println!();

    Ok(())
}
