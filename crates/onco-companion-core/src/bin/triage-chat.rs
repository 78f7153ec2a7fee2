//! Interactive terminal client for the triage chat.
//!
//! Environment:
//! - `GEMINI_API_KEY`: provider credential (required)
//! - `GEMINI_MODEL`, `GEMINI_BASE_URL`, `TRIAGE_TIMEOUT_SECS`: optional overrides
//! - `ONCO_DB_PATH`: symptom journal file (default: in-memory)

use std::io::{self, BufRead, Write};

use onco_companion_core::{Database, OncoCompanion, OncoCompanionError};
use onco_companion_llm::{TriageAdapter, TriageConfig};
use tracing_subscriber::prelude::*;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("onco_companion=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = TriageConfig::from_env()?;
    tracing::info!(model = %config.model, "Starting triage chat");

    let db = match std::env::var("ONCO_DB_PATH") {
        Ok(path) => Database::open(path)?,
        Err(_) => Database::open_in_memory()?,
    };
    let companion = OncoCompanion::new(db, TriageAdapter::from_config(&config)?);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        match companion.send_message(line) {
            Ok(result) => {
                writeln!(stdout, "{}", result.response_text)?;
                if let (Some(title), Some(message)) =
                    (result.urgent_alert_title, result.urgent_alert_message)
                {
                    writeln!(stdout, "\n!! {} {}", title, message)?;
                }
            }
            Err(OncoCompanionError::InvalidInput(_)) => {}
            Err(e) => writeln!(stdout, "[{}]", e)?,
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }

    companion.close_chat()?;
    for entry in companion.list_symptoms(20)? {
        tracing::info!(name = %entry.name, urgent = entry.is_urgent, "Journaled symptom");
    }
    Ok(())
}
