//! Habit journal CLI.
//!
//! One-shot commands over the local document store, with best-effort remote
//! sync when `REMOTE_BASE` and `USER_ID` are configured.

use anyhow::{anyhow, Result};
use chrono::Datelike;
use tokio::time::{sleep, Duration};

use habitlog::clock::{Clock, SystemClock};
use habitlog::config::Config;
use habitlog::derive::HeatmapFilter;
use habitlog::logging::{log, obj, v_str, Domain, Level};
use habitlog::model::{parse_date_key, Awareness, Outcome, Quantity};
use habitlog::remote::RemoteKind;
use habitlog::report::WindowReport;
use habitlog::session::{Command, EventDraft, Session};

/// Entries shown by the report command; the rest collapse into a count.
const REPORT_PREVIEW_CAP: usize = 5;

const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Widest histogram bar, in characters.
const HISTOGRAM_BAR_WIDTH: u32 = 40;

fn usage() {
    println!("habitlog - date-partitioned habit journal\n");
    println!("Commands:");
    println!("  log <success|failure> [--on YYYY-MM-DD] [--time HH:MM]");
    println!("      [--qty small|medium|large] [--aware yes|no|unknown] [--note TEXT]");
    println!("  quick <success|failure>     - log now, defaults for the rest");
    println!("  edit <YYYY-MM-DD> <index> <success|failure> [flags as for log]");
    println!("  delete <YYYY-MM-DD> <index>");
    println!("  stats                       - snapshot JSON");
    println!("  report [days]               - trailing-window report (default REPORT_DAYS)");
    println!("  heatmap [failures]          - weekday x hour counts");
    println!("  histogram                   - events per hour of day");
    println!("  calendar [YYYY MM]          - month grid JSON (default: current month)");
    println!("  collection                  - prize shelf JSON");
    println!("  ack                         - dismiss a resolved draw");
    println!("\nEnvironment: SQLITE_PATH, REMOTE_BASE, USER_ID, DRAW_DELAY_MS,");
    println!("SYNC_MAX_RETRIES, REPORT_DAYS, LOG_LEVEL, LOG_DOMAINS, LOG_FILE");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn parse_outcome(token: Option<&str>) -> Result<Outcome> {
    token
        .and_then(Outcome::parse)
        .ok_or_else(|| anyhow!("expected 'success' or 'failure'"))
}

/// Overrides `base` with whatever flags were given; absent flags keep the
/// base values.
fn draft_from_args(rest: &[String], base: EventDraft) -> Result<EventDraft> {
    let mut draft = base;
    if let Some(tok) = flag_value(rest, "--time") {
        draft.time = tok.to_string();
    }
    if let Some(tok) = flag_value(rest, "--qty") {
        draft.quantity = Quantity::parse(tok).ok_or_else(|| anyhow!("bad --qty '{}'", tok))?;
    }
    if let Some(tok) = flag_value(rest, "--aware") {
        draft.awareness = Awareness::parse(tok).ok_or_else(|| anyhow!("bad --aware '{}'", tok))?;
    }
    if let Some(tok) = flag_value(rest, "--note") {
        draft.note = tok.to_string();
    }
    Ok(draft)
}

fn print_report(report: &WindowReport) {
    println!(
        "{} days ({} .. {}): {} success / {} failure, {}% success rate, {}% aware",
        report.window_days,
        report.from,
        report.to,
        report.success_count,
        report.failure_count,
        report.success_rate_percent,
        report.awareness_rate_percent
    );
    for entry in report.entries.iter().take(REPORT_PREVIEW_CAP) {
        let note = if entry.note.is_empty() {
            String::new()
        } else {
            format!("  # {}", entry.note)
        };
        println!(
            "  {} {}  {:<7} {:<6} aware={}{}",
            entry.date,
            entry.time,
            entry.outcome.as_str(),
            entry.quantity.as_str(),
            entry.awareness.as_str(),
            note
        );
    }
    let hidden = report.entries.len().saturating_sub(REPORT_PREVIEW_CAP);
    if hidden > 0 {
        println!("  ... and {} more", hidden);
    }
}

fn print_heatmap(matrix: &[[u32; 24]; 7]) {
    for (day, row) in matrix.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| format!("{:3}", c)).collect();
        println!("{} {}", DAY_LABELS[day], cells.join(""));
    }
}

fn print_histogram(buckets: &[u32; 24]) {
    let peak = buckets.iter().copied().max().unwrap_or(0).max(1);
    for (hour, &count) in buckets.iter().enumerate() {
        let bar = "#".repeat((count * HISTOGRAM_BAR_WIDTH / peak) as usize);
        println!("{:02}h {:4} {}", hour, count, bar);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
        return Ok(());
    }

    let cfg = Config::from_env();
    let kind = RemoteKind::detect(&cfg);
    log(
        Level::Info,
        Domain::System,
        "remote_mode",
        obj(&[(
            "mode",
            v_str(match kind {
                RemoteKind::Http => "http",
                RemoteKind::Null => "local-only",
            }),
        )]),
    );
    let remote = kind.build(&cfg);
    let mut session = Session::open(cfg, Box::new(SystemClock), remote)?;
    session.sync_startup().await;

    let cmd = args[1].as_str();
    let rest = &args[2..];

    let applied = match cmd {
        "log" | "l" => {
            let outcome = parse_outcome(rest.first().map(|s| s.as_str()))?;
            let date = match flag_value(rest, "--on") {
                Some(key) => parse_date_key(key)?,
                None => SystemClock.today(),
            };
            let draft = draft_from_args(rest, EventDraft::quick(outcome, SystemClock.hhmm()))?;
            Some(session.handle(Command::Log { date, draft })?)
        }
        "quick" | "q" => {
            let outcome = parse_outcome(rest.first().map(|s| s.as_str()))?;
            Some(session.handle(Command::QuickLog { outcome })?)
        }
        "edit" | "e" => {
            let date = parse_date_key(rest.first().map(|s| s.as_str()).unwrap_or(""))?;
            let index: usize = rest
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow!("edit needs <date> <index>"))?;
            let outcome = parse_outcome(rest.get(2).map(|s| s.as_str()))?;
            // Flags left out keep the entry's current values.
            let mut base = EventDraft::from_event(session.journal().event_at(date, index)?);
            base.outcome = outcome;
            let draft = draft_from_args(rest, base)?;
            Some(session.handle(Command::Edit { date, index, draft })?)
        }
        "delete" | "rm" => {
            let date = parse_date_key(rest.first().map(|s| s.as_str()).unwrap_or(""))?;
            let index: usize = rest
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow!("delete needs <date> <index>"))?;
            Some(session.handle(Command::Delete { date, index })?)
        }
        "ack" => Some(session.handle(Command::AcknowledgeDraw)?),
        "stats" | "s" => {
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
            None
        }
        "report" | "r" => {
            let days = rest
                .first()
                .and_then(|s| s.parse().ok())
                .unwrap_or(session.config().report_days);
            print_report(&session.report(days));
            None
        }
        "heatmap" | "hm" => {
            let filter = if rest.first().map(|s| s.as_str()) == Some("failures") {
                HeatmapFilter::FailuresOnly
            } else {
                HeatmapFilter::AllEvents
            };
            print_heatmap(&session.heatmap(filter));
            None
        }
        "histogram" | "hist" => {
            print_histogram(&session.histogram());
            None
        }
        "calendar" | "cal" => {
            let today = SystemClock.today();
            let year = rest.first().and_then(|s| s.parse().ok()).unwrap_or(today.year());
            let month = rest.get(1).and_then(|s| s.parse().ok()).unwrap_or(today.month());
            match session.calendar(year, month) {
                Some(grid) => println!("{}", serde_json::to_string_pretty(&grid)?),
                None => eprintln!("no such month: {}-{:02}", year, month),
            }
            None
        }
        "collection" | "c" => {
            println!("{}", serde_json::to_string_pretty(session.shelf())?);
            None
        }
        _ => {
            eprintln!("unknown command: {}", cmd);
            usage();
            None
        }
    };

    if let Some(applied) = applied {
        if applied.draw_armed {
            sleep(Duration::from_millis(session.config().draw_delay_ms)).await;
            match session.resolve_draw(&mut rand::thread_rng()) {
                Ok(prize) => println!(
                    "{}",
                    serde_json::json!({
                        "prize": prize.id,
                        "name": prize.display_name,
                        "rarity": prize.rarity_tier,
                    })
                ),
                Err(err) => eprintln!("draw: {}", err.msg),
            }
        }
        if applied.mutated {
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
            session.sync_push().await;
        }
    }
    Ok(())
}
