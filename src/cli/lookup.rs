use std::io::Read;
use tokio::sync::mpsc;
use tracing::info;
use crate::cli::commands::{LoadArgs, LookupArgs};
use crate::cli::context::open_session;
use crate::cli::render::{render_bulk_report, render_indicator, LookupProgress};
use crate::errors::HarvesterError;
use crate::lookup::LookupEvent;
use crate::models::{IndicatorResult, LookupType};

pub async fn handle_lookup(args: LookupArgs, config: Option<&str>, quiet: bool) -> Result<(), HarvesterError> {
    let (_, session) = open_session(config).await?;
    let (tx, rx) = mpsc::unbounded_channel();
    let mut session = session.with_event_channel(tx);

    let mut raw = args.indicators.join("\n");
    if args.stdin {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        raw.push('\n');
        raw.push_str(&input);
    }
    let added = session.add_indicators(&raw);
    if session.indicators().is_empty() {
        return Err(HarvesterError::InvalidInput("No indicators given and none saved".into()));
    }
    info!(added = added.len(), total = session.indicators().len(), "Starting lookup");

    session.identify_now().await;
    session.refresh_providers().await?;

    let report = with_progress(rx, quiet || args.json, session.lookup_all()).await?;
    if let Some(message) = report.common_failure() {
        return Err(batch_error(report.failures[0].error_type, message));
    }

    let results: Vec<IndicatorResult> = session
        .results()
        .into_iter()
        .filter(|r| args.only.as_deref().map_or(true, |only| r.indicator == only))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print!("{}", render_indicator(result, session.layout()));
        }
        if !quiet {
            println!("\n{}", render_bulk_report(&report));
        }
    }
    Ok(())
}

pub async fn handle_load(args: LoadArgs, config: Option<&str>, quiet: bool) -> Result<(), HarvesterError> {
    let lookup_type = parse_lookup_type(&args.lookup_type)?;
    let (_, session) = open_session(config).await?;
    let (tx, rx) = mpsc::unbounded_channel();
    let mut session = session.with_event_channel(tx);

    session.add_indicators(&args.indicator);
    session.identify_now().await;

    let indicator = args.indicator.trim().to_string();
    with_progress(
        rx,
        quiet || args.json,
        session.load_category(&indicator, lookup_type, args.provider.as_deref()),
    )
    .await?;

    let result = session
        .result_for(&indicator)
        .map(|mut r| {
            r.results.retain(|l| l.lookup_type == lookup_type);
            r
        })
        .ok_or_else(|| HarvesterError::Internal(format!("No results recorded for {}", indicator)))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_indicator(&result, session.layout()));
    }
    Ok(())
}

pub fn parse_lookup_type(name: &str) -> Result<LookupType, HarvesterError> {
    LookupType::parse(name).ok_or_else(|| {
        let known: Vec<&str> = LookupType::all().map(|t| t.as_str()).collect();
        HarvesterError::InvalidInput(format!("Unknown lookup type '{}'. Known: {}", name, known.join(", ")))
    })
}

/// Drive `work` while rendering its events, unless `silent`.
pub(crate) async fn with_progress<T>(
    mut rx: mpsc::UnboundedReceiver<LookupEvent>,
    silent: bool,
    work: impl std::future::Future<Output = T>,
) -> T {
    let mut progress = (!silent).then(LookupProgress::new);
    tokio::pin!(work);
    let output = loop {
        tokio::select! {
            output = &mut work => break output,
            Some(event) = rx.recv() => {
                if let Some(progress) = progress.as_mut() {
                    progress.handle_event(&event);
                }
            }
        }
    };
    while let Ok(event) = rx.try_recv() {
        if let Some(progress) = progress.as_mut() {
            progress.handle_event(&event);
        }
    }
    if let Some(progress) = progress.as_mut() {
        progress.finish();
    }
    output
}

/// Surface a batch where every indicator failed alike as one error.
fn batch_error(error_type: &str, message: &str) -> HarvesterError {
    match error_type {
        "NoProvidersAvailableError" => HarvesterError::NoProvidersAvailable,
        "AuthenticationError" => HarvesterError::Authentication(message.to_string()),
        _ => HarvesterError::Internal(message.to_string()),
    }
}

