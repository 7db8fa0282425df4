use console::style;
use crate::cli::commands::IdentifyArgs;
use crate::cli::context::{build_api, load_settings};
use crate::errors::HarvesterError;
use crate::indicators::{identify_now, parse_indicators};

/// Resolve types without touching the saved indicator list.
pub async fn handle_identify(args: IdentifyArgs, config: Option<&str>) -> Result<(), HarvesterError> {
    let config = load_settings(config).await?;
    let api = build_api(&config)?;
    let values = parse_indicators(&args.indicators.join("\n"));
    let types = identify_now(api.as_ref(), &values).await;

    if args.json {
        let rows: Vec<serde_json::Value> = values
            .iter()
            .map(|v| serde_json::json!({"value": v, "type": types.get(v).map(|t| t.as_str())}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for value in &values {
        match types.get(value) {
            Some(t) => println!("{:<48} {}", value, style(t.as_str()).cyan()),
            None => println!("{:<48} {}", value, style("unresolved").yellow()),
        }
    }
    Ok(())
}
