//! `vlk search` and `vlk shell`: household lookup from the terminal.
//!
//! `search` runs one query against the cached working set (optionally
//! refreshing first). `shell` keeps a [`SearchSession`] open: each input
//! line becomes the raw query, and `:`-prefixed lines change settings.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use vehicle_lookup_core::models::Record;
use vehicle_lookup_core::search::{self, SearchMode, Strictness};

use crate::lifecycle::{App, LogReady};
use crate::session::SearchSession;
use crate::sync::SyncOutcome;

const SHELL_HELP: &str = "commands: :mode all|stickers, :exact on|off, :refresh, :quit";

/// Run a single search and print the matching households.
pub async fn run_search(
    app: &App,
    query: &str,
    mode: &str,
    exact: bool,
    refresh: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mode: SearchMode = mode.parse().map_err(anyhow::Error::msg)?;
    let strictness = Strictness::from_exact(exact);

    let records = if refresh {
        let outcome = app.sync(false).await;
        print_outcome(&outcome);
        outcome.records.as_ref().clone()
    } else {
        match app.cache.load().await {
            Some(entry) => entry.records,
            None => {
                println!("No cached data. Run `vlk sync` first.");
                return Ok(());
            }
        }
    };

    let found = search::filter(&records, query, mode, strictness);
    if found.is_empty() {
        println!("No results.");
        return Ok(());
    }
    let total = found.len();
    let shown = limit.unwrap_or(total).min(total);
    print_records(found.into_iter().take(shown));
    if shown < total {
        println!("({} of {} shown)", shown, total);
    }
    Ok(())
}

/// Interactive lookup loop over stdin.
pub async fn run_shell(app: &App) -> Result<()> {
    let outcome = app.start(&LogReady, false).await?;
    print_outcome(&outcome);
    println!("{}", SHELL_HELP);

    let mut session = SearchSession::new(
        app.working_set(),
        Duration::from_millis(app.config.search.debounce_ms),
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("[{} {}] > ", session.mode(), strictness_label(session.strictness()));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match parse_shell_command(line) {
            ShellCommand::Quit => break,
            ShellCommand::Mode(mode) => session.set_mode(mode),
            ShellCommand::Exact(exact) => session.set_strictness(Strictness::from_exact(exact)),
            ShellCommand::Refresh => {
                let outcome = app.sync(true).await;
                print_outcome(&outcome);
                continue;
            }
            ShellCommand::Invalid(msg) => {
                println!("{}", msg);
                continue;
            }
            ShellCommand::Query(text) => {
                session.set_query(text);
                session.settled().await;
            }
        }

        let results = session.results();
        if results.is_empty() {
            println!("No results.");
        } else {
            print_records(results.iter().take(20));
            println!("{} match(es)", results.len());
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Query(String),
    Mode(SearchMode),
    Exact(bool),
    Refresh,
    Quit,
    Invalid(String),
}

fn parse_shell_command(line: &str) -> ShellCommand {
    let Some(cmd) = line.strip_prefix(':') else {
        return ShellCommand::Query(line.to_string());
    };
    let mut parts = cmd.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit") | Some("q"), None) => ShellCommand::Quit,
        (Some("refresh"), None) => ShellCommand::Refresh,
        (Some("mode"), Some(m)) => match m.parse() {
            Ok(mode) => ShellCommand::Mode(mode),
            Err(e) => ShellCommand::Invalid(e),
        },
        (Some("exact"), Some("on")) => ShellCommand::Exact(true),
        (Some("exact"), Some("off")) => ShellCommand::Exact(false),
        _ => ShellCommand::Invalid(SHELL_HELP.to_string()),
    }
}

fn strictness_label(s: Strictness) -> &'static str {
    match s {
        Strictness::Partial => "partial",
        Strictness::Exact => "exact",
    }
}

/// Print the source, size, and any problem of a sync.
pub fn print_outcome(outcome: &SyncOutcome) {
    match outcome.source {
        Some(source) => println!("source: {} ({} records)", source, outcome.records.len()),
        None => println!("source: none"),
    }
    if let Some(err) = &outcome.error {
        println!("error: {}", err);
    }
    for warning in &outcome.warnings {
        println!("warning: {}", warning);
    }
}

fn print_records<'a>(records: impl Iterator<Item = &'a Record>) {
    for (i, record) in records.enumerate() {
        println!("{}.", i + 1);
        for (name, value) in record.fields() {
            println!("    {}: {}", name, value);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_commands() {
        assert_eq!(parse_shell_command("abc"), ShellCommand::Query("abc".into()));
        assert_eq!(parse_shell_command(""), ShellCommand::Query(String::new()));
        assert_eq!(parse_shell_command(":quit"), ShellCommand::Quit);
        assert_eq!(parse_shell_command(":refresh"), ShellCommand::Refresh);
        assert_eq!(
            parse_shell_command(":mode stickers"),
            ShellCommand::Mode(SearchMode::StickersOnly)
        );
        assert_eq!(parse_shell_command(":exact on"), ShellCommand::Exact(true));
        assert!(matches!(
            parse_shell_command(":mode plates"),
            ShellCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_shell_command(":exact maybe"),
            ShellCommand::Invalid(_)
        ));
    }
}
