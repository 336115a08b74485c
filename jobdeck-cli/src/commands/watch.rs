//! Live dashboard
//!
//! Redraws whenever the session signals a change and reads one gesture per
//! line from stdin. Gestures run in their own tasks so a slow remote call
//! never freezes the screen.

use anyhow::{Result, anyhow, bail};
use colored::*;
use jobdeck_core::domain::job::JobId;
use jobdeck_monitor::{Session, SessionEvent};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::id_resolver::{resolve_filter, resolve_job_id};
use crate::render;

/// A user gesture typed on stdin
#[derive(Debug, Clone, PartialEq, Eq)]
enum Gesture {
    Refresh,
    Trigger(String),
    Cancel(String),
    ToggleAuto,
    Interval(i64),
    Help,
    Quit,
}

impl Gesture {
    fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            bail!("Empty command");
        };
        let rest = parts.collect::<Vec<_>>().join(" ");

        let gesture = match (verb, rest.is_empty()) {
            ("r" | "refresh", true) => Gesture::Refresh,
            ("t" | "trigger", false) => Gesture::Trigger(rest),
            ("c" | "cancel", false) => Gesture::Cancel(rest),
            ("a" | "auto", true) => Gesture::ToggleAuto,
            ("i" | "interval", false) => Gesture::Interval(
                rest.parse()
                    .map_err(|_| anyhow!("Interval must be a number of seconds, got '{}'", rest))?,
            ),
            ("h" | "help" | "?", true) => Gesture::Help,
            ("q" | "quit" | "exit", true) => Gesture::Quit,
            ("t" | "trigger" | "c" | "cancel", true) => bail!("Usage: {} <job id or name>", verb),
            ("i" | "interval", true) => bail!("Usage: i <seconds>"),
            _ => bail!("Unknown command '{}' (h for help)", line.trim()),
        };
        Ok(gesture)
    }
}

const HELP: &str = "r refresh | t <job> trigger | c <job> cancel | a toggle auto-refresh | i <secs> interval | q quit";

pub async fn handle_watch(
    config: &Config,
    interval: Option<i64>,
    no_auto: bool,
    job: Option<&str>,
) -> Result<()> {
    let session = Arc::new(config.open_session()?);
    let only = resolve_filter(session.registry(), job)?;

    if let Some(secs) = interval {
        session.set_interval(secs);
    }
    session.set_auto_refresh(!no_auto);

    let mut events = session.subscribe();
    let (messages_tx, mut messages) = mpsc::unbounded_channel::<String>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut footer = HELP.dimmed().to_string();

    let timer = session.start_auto_refresh();
    spawn_refresh(&session, messages_tx.clone());
    redraw(&session, only, &footer);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::PollStarted) => {}
                Ok(SessionEvent::PollCompleted(report)) => {
                    footer = render::describe_poll(&report).to_string();
                    redraw(&session, only, &footer);
                }
                Ok(SessionEvent::ActionUpdated(_)) => redraw(&session, only, &footer),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} session event(s)", skipped);
                    redraw(&session, only, &footer);
                }
                Err(RecvError::Closed) => break,
            },
            Some(message) = messages.recv() => {
                footer = message;
                redraw(&session, only, &footer);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    redraw(&session, only, &footer);
                    continue;
                }
                match Gesture::parse(&line) {
                    Ok(Gesture::Quit) => break,
                    Ok(gesture) => {
                        if let Some(message) = apply(&session, gesture, &messages_tx) {
                            footer = message;
                            redraw(&session, only, &footer);
                        }
                    }
                    Err(e) => {
                        footer = e.to_string().red().to_string();
                        redraw(&session, only, &footer);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown();
    let _ = timer.await;
    Ok(())
}

/// Applies a gesture; returns a footer message when it completes immediately
fn apply(
    session: &Arc<Session>,
    gesture: Gesture,
    messages: &mpsc::UnboundedSender<String>,
) -> Option<String> {
    match gesture {
        Gesture::Refresh => {
            spawn_refresh(session, messages.clone());
            None
        }
        Gesture::Trigger(selector) => spawn_action(session, messages.clone(), &selector, true),
        Gesture::Cancel(selector) => spawn_action(session, messages.clone(), &selector, false),
        Gesture::ToggleAuto => {
            let enabled = !session.auto_refresh().enabled;
            session.set_auto_refresh(enabled);
            Some(format!("Auto-refresh {}", if enabled { "on" } else { "off" }))
        }
        Gesture::Interval(secs) => {
            let interval = session.set_interval(secs);
            Some(format!("Refresh interval set to {}s", interval.as_secs()))
        }
        Gesture::Help => Some(HELP.to_string()),
        Gesture::Quit => None,
    }
}

fn spawn_refresh(session: &Arc<Session>, messages: mpsc::UnboundedSender<String>) {
    let session = Arc::clone(session);
    tokio::spawn(async move {
        if session.refresh_now().await.is_none() {
            let _ = messages.send("Refresh already in progress".dimmed().to_string());
        }
    });
}

/// Resolves the job and runs the action in the background; an unknown job
/// is reported right away
fn spawn_action(
    session: &Arc<Session>,
    messages: mpsc::UnboundedSender<String>,
    selector: &str,
    trigger: bool,
) -> Option<String> {
    let job_id = match resolve_job_id(session.registry(), selector) {
        Ok(job_id) => job_id,
        Err(e) => return Some(e.to_string().red().to_string()),
    };

    let session = Arc::clone(session);
    tokio::spawn(async move {
        let result = if trigger {
            session.trigger(job_id).await
        } else {
            session.cancel(job_id).await
        };
        let _ = messages.send(render::describe_action_result(job_id, &result).to_string());
    });
    None
}

fn redraw(session: &Session, only: Option<JobId>, footer: &str) {
    render::clear_screen();
    render::print_dashboard(&session.view(only));
    render::print_legend();
    println!();
    println!("{}", footer);
    print!("{} ", ">".cyan());
    let _ = std::io::stdout().flush();
}
