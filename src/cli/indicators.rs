use console::style;
use crate::cli::commands::{IndicatorsAction, IndicatorsArgs, SettingsAction, SettingsArgs};
use crate::cli::context::open_session;
use crate::errors::HarvesterError;
use crate::storage::Layout;

pub async fn handle_indicators(args: IndicatorsArgs, config: Option<&str>) -> Result<(), HarvesterError> {
    let (_, mut session) = open_session(config).await?;

    match args.action {
        IndicatorsAction::List { identify } => {
            if identify {
                session.identify_now().await;
            }
            if session.indicators().is_empty() {
                println!("No saved indicators");
            }
            for value in session.indicators().values() {
                let label = match session.indicators().indicator_type(value) {
                    Some(t) => style(t.as_str().to_string()).cyan(),
                    None => style("-".to_string()).dim(),
                };
                println!("{:<48} {}", value, label);
            }
        }
        IndicatorsAction::Add { indicators } => {
            let added = session.add_indicators(&indicators.join("\n"));
            println!("Added {} ({} total)", added.len(), session.indicators().len());
        }
        IndicatorsAction::Remove { indicators } => {
            for value in indicators {
                if !session.remove_indicator(value.trim()) {
                    println!("{} {} not in list", style("⚠").yellow(), value);
                }
            }
            println!("{} remaining", session.indicators().len());
        }
        IndicatorsAction::Clear => {
            let removed = session.clear_all();
            println!("Removed {}", removed.len());
        }
    }
    Ok(())
}

pub async fn handle_settings(args: SettingsArgs, config: Option<&str>) -> Result<(), HarvesterError> {
    let (config, mut session) = open_session(config).await?;

    match args.action {
        SettingsAction::Show => {
            println!("api.base_url        {}", config.api.base_url);
            println!("storage.path        {}", config.storage.path);
            println!("auto_load           {}", session.auto_load_enabled());
            println!("layout              {}", session.layout().as_str());
            println!("saved indicators    {}", session.indicators().len());
        }
        SettingsAction::AutoLoad { enabled } => {
            session.set_auto_load(enabled);
            println!("Auto-load {}", if enabled { "enabled" } else { "disabled" });
        }
        SettingsAction::Layout { layout } => {
            let layout: Layout = layout.parse().map_err(HarvesterError::InvalidInput)?;
            session.set_layout(layout);
            println!("Layout set to {}", layout.as_str());
        }
    }
    Ok(())
}
