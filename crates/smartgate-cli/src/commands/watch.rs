//! `smartgate watch` -- follow the live detection stream.

use owo_colors::OwoColorize;

use smartgate_core::{
    ConnectionState, DetectionEvent, DetectionFeed, DetectionId, FeedConfig, Stats,
};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

pub async fn handle(args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = FeedConfig::new(global.stream_endpoint()?);
    config.history_capacity = args.history;

    let feed = DetectionFeed::new(config);
    let mut state = feed.state();
    let mut conn = feed.connection_state();
    feed.start().await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_seen: Option<DetectionId> = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            changed = conn.changed() => {
                if changed.is_err() {
                    break;
                }
                print_connection(*conn.borrow_and_update());
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = state.borrow_and_update().clone();
                // State also changes on alert expiry; only report fresh detections.
                if let Some(event) = snap.current.as_ref() {
                    if last_seen != Some(event.id) {
                        last_seen = Some(event.id);
                        print_detection(event, args.stats.then_some(snap.stats));
                    }
                }
            }
        }
    }

    feed.stop().await;
    print_connection(ConnectionState::Disconnected);
    Ok(())
}

fn print_connection(state: ConnectionState) {
    match state {
        ConnectionState::Connected => println!("{} connected", "●".green()),
        ConnectionState::Connecting => println!("{} connecting...", "●".yellow()),
        ConnectionState::Disconnected => println!("{} disconnected", "●".red()),
    }
}

fn print_detection(event: &DetectionEvent, stats: Option<Stats>) {
    let mut line = format!("{}  {}  ", event.received_at.format("%H:%M:%S"), event.plate.bold());

    if event.access_granted {
        line.push_str(&format!("{}", "GRANTED".green().bold()));
    } else {
        line.push_str(&format!("{}", "DENIED".red().bold()));
    }

    if let Some(confidence) = event.confidence {
        line.push_str(&format!("  ({:.0}%)", confidence * 100.0));
    }

    if let Some(name) = event.owner.as_ref().and_then(|o| o.name.as_deref()) {
        line.push_str(&format!("  {name}"));
        if let Some(unit) = event.owner.as_ref().and_then(|o| o.unit.as_deref()) {
            line.push_str(&format!(" (unit {unit})"));
        }
    }

    if let Some(reason) = event
        .payment
        .as_ref()
        .and_then(|p| p.denial_reason.as_deref())
    {
        line.push_str(&format!("  [{}]", reason.red()));
    }

    println!("{line}");

    if let Some(stats) = stats {
        println!(
            "    total {}  granted {}  denied {}",
            stats.total,
            stats.granted.green(),
            stats.denied.red()
        );
    }
}
