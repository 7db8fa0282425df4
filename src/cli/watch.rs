use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use crate::cli::commands::WatchArgs;
use crate::cli::context::open_session;
use crate::cli::render::{render_bulk_report, render_event, render_indicator};
use crate::errors::HarvesterError;
use crate::lookup::LookupEvent;
use crate::session::{AutoLoadReport, HarvestSession};

/// Read indicators line by line and let auto-load fetch results as soon as
/// every indicator's type is known.
pub async fn handle_watch(args: WatchArgs, config: Option<&str>, quiet: bool) -> Result<(), HarvesterError> {
    let (_, session) = open_session(config).await?;
    let (tx, mut events) = mpsc::unbounded_channel();
    let mut session = session.with_event_channel(tx);

    if !session.auto_load_enabled() {
        warn!("Auto-load is disabled; enable it with `harvester settings auto-load true`");
    }
    session.refresh_providers().await?;
    info!(saved = session.indicators().len(), "Watching stdin for indicators");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        session.add_indicators(&line);
                    }
                    None => stdin_open = false,
                }
            }
            round = session.next_identification() => {
                if round.is_none() {
                    break;
                }
                auto_load(&mut session, &mut events, &args, quiet).await?;
            }
        }

        if !stdin_open && !session.identification_pending() {
            // a round may have landed between the last poll and now
            if session.poll_identification() > 0 {
                auto_load(&mut session, &mut events, &args, quiet).await?;
            }
            break;
        }
    }
    Ok(())
}

async fn auto_load(
    session: &mut HarvestSession,
    events: &mut mpsc::UnboundedReceiver<LookupEvent>,
    args: &WatchArgs,
    quiet: bool,
) -> Result<(), HarvesterError> {
    let report = session.run_auto_load().await?;
    while let Ok(event) = events.try_recv() {
        if !quiet && !args.json {
            eprintln!("{}", render_event(&event));
        }
    }
    print_report(session, &report, args.json)
}

fn print_report(session: &HarvestSession, report: &AutoLoadReport, json: bool) -> Result<(), HarvesterError> {
    if report.is_noop() {
        return Ok(());
    }
    let mut touched: Vec<String> = report
        .initial
        .as_ref()
        .map(|bulk| bulk.loaded.clone())
        .unwrap_or_default();
    if !report.refetched.is_empty() || !report.purged.is_empty() {
        touched = session.indicators().values().to_vec();
    }

    for indicator in &touched {
        let Some(result) = session.result_for(indicator) else { continue };
        if json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            print!("{}", render_indicator(&result, session.layout()));
        }
    }
    if !json {
        if let Some(bulk) = &report.initial {
            println!("{}", render_bulk_report(bulk));
        }
    }
    Ok(())
}
