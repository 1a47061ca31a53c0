//! `switchyard chat`: interactive conversation with history.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use switchyard_core::message::Message;
use switchyard_core::tier::OutcomeTier;
use switchyard_router::RouteOptions;

use super::provenance;
use crate::wiring::{build_router, load_config};

/// Turns kept in history; older ones are dropped.
const MAX_HISTORY: usize = 20;

pub async fn run(explicit: Option<PathBuf>, admin: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    let router = build_router(&config)?;
    router.init().await;

    println!("{} (type 'exit' to quit)", config.identity.name);
    println!();

    let stdin = std::io::stdin();
    let mut history: Vec<Message> = Vec::new();
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let options = RouteOptions {
            is_admin: admin,
            ..RouteOptions::default()
        };
        let outcome = router.route(input, &history, options).await;
        println!("{}", outcome.content);
        println!("  {}", provenance(&outcome));
        println!();

        remember(&mut history, input, &outcome.content, outcome.tier);
    }

    router.shutdown();
    Ok(())
}

/// Emergency replies stay out of history so the next turn is not anchored
/// on an apology.
fn remember(history: &mut Vec<Message>, user: &str, reply: &str, tier: OutcomeTier) {
    if tier == OutcomeTier::Emergency {
        return;
    }
    history.push(Message::user(user));
    history.push(Message::assistant(reply));
    if history.len() > MAX_HISTORY {
        let excess = history.len() - MAX_HISTORY;
        history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_turns_are_not_remembered() {
        let mut history = Vec::new();
        remember(&mut history, "hi", "hello", OutcomeTier::Primary);
        remember(&mut history, "status?", "sorry", OutcomeTier::Emergency);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut history = Vec::new();
        for i in 0..(MAX_HISTORY + 4) {
            remember(&mut history, &format!("q{i}"), "a", OutcomeTier::Fallback);
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history[0].content, "q14");
    }
}
