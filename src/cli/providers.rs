use console::style;
use serde_json::json;
use crate::cli::commands::{PresetsArgs, ProvidersArgs, SelectionAction, SelectionArgs};
use crate::cli::context::{build_api, load_settings, open_storage};
use crate::cli::lookup::parse_lookup_type;
use crate::client::HarvesterApi;
use crate::errors::HarvesterError;
use crate::models::{LookupType, ProvidersMetadata};
use crate::selection::ProviderSelectionStore;

pub async fn handle_providers(args: ProvidersArgs, config: Option<&str>) -> Result<(), HarvesterError> {
    let only = args.lookup_type.as_deref().map(parse_lookup_type).transpose()?;
    let config = load_settings(config).await?;
    let metadata = build_api(&config)?.providers().await?;
    let store = ProviderSelectionStore::load(open_storage(&config)?);

    let types: Vec<LookupType> = match only {
        Some(t) => vec![t],
        None => LookupType::all().collect(),
    };

    if args.json {
        let rows: Vec<serde_json::Value> = types
            .iter()
            .map(|t| {
                json!({
                    "lookup_type": t,
                    "providers": metadata.providers_for(*t),
                    "selected": store.providers_for_type(*t),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if let Some(version) = &metadata.version {
        println!("{}", style(format!("Backend version {}", version)).dim());
    }
    for t in types {
        print_type(&metadata, &store, t);
    }
    Ok(())
}

fn print_type(metadata: &ProvidersMetadata, store: &ProviderSelectionStore, lookup_type: LookupType) {
    let definition = lookup_type.definition();
    let applies: Vec<&str> = definition.applies_to.iter().map(|t| t.as_str()).collect();
    println!(
        "\n{} {} {}",
        style(definition.display_name).cyan().bold(),
        style(lookup_type.as_str()).dim(),
        style(format!("[{}]", applies.join(", "))).dim(),
    );

    let selected = store.providers_for_type(lookup_type);
    let providers = metadata.providers_for(lookup_type);
    if providers.is_empty() {
        println!("  {}", style("no providers reported").dim());
    }
    for provider in providers {
        let mark = if selected.contains(&provider.id) { style("✓").green() } else { style(" ").dim() };
        let availability = if provider.available { style("available").green() } else { style("unavailable").red() };
        println!("  {} {:<24} {}", mark, provider.display_name(), availability);
    }
    for stale in selected.iter().filter(|id| !providers.iter().any(|p| &p.id == *id)) {
        println!("  {} {:<24} {}", style("✓").yellow(), stale, style("not offered by backend").yellow());
    }
}

pub async fn handle_presets(args: PresetsArgs, config: Option<&str>) -> Result<(), HarvesterError> {
    let config = load_settings(config).await?;
    let metadata = build_api(&config)?.providers().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metadata.presets)?);
        return Ok(());
    }
    if metadata.presets.is_empty() {
        println!("No presets offered by the backend");
    }
    for preset in &metadata.presets {
        println!(
            "{}  {}",
            style(&preset.name).cyan().bold(),
            preset.description.as_deref().unwrap_or("")
        );
        let mut types: Vec<_> = preset.providers_by_type.iter().collect();
        types.sort_by(|a, b| a.0.cmp(b.0));
        for (name, ids) in types {
            println!("  {:<18} {}", name, ids.join(", "));
        }
    }
    Ok(())
}

pub async fn handle_selection(args: SelectionArgs, config: Option<&str>) -> Result<(), HarvesterError> {
    let config = load_settings(config).await?;
    let mut store = ProviderSelectionStore::load(open_storage(&config)?);

    match args.action {
        SelectionAction::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.selection().to_named_map())?);
            } else {
                for t in LookupType::all() {
                    let ids = store.providers_for_type(t);
                    let shown = if ids.is_empty() { style("disabled".to_string()).dim() } else { style(ids.join(", ")).white() };
                    println!("{:<18} {}", t.as_str(), shown);
                }
            }
        }
        SelectionAction::Set { lookup_type, providers } => {
            let lookup_type = parse_lookup_type(&lookup_type)?;
            store.set_providers_for_type(lookup_type, providers);
            println!("{}: {}", lookup_type, store.providers_for_type(lookup_type).join(", "));
        }
        SelectionAction::Disable { lookup_type } => {
            let lookup_type = parse_lookup_type(&lookup_type)?;
            store.set_providers_for_type(lookup_type, Vec::new());
            println!("{} disabled", lookup_type);
        }
        SelectionAction::Preset { name } => {
            let metadata = build_api(&config)?.providers().await?;
            let preset = metadata
                .preset(&name)
                .ok_or_else(|| HarvesterError::InvalidInput(format!("Unknown preset: {}", name)))?;
            let unknown = store.apply_preset(preset);
            println!("Applied preset {}", preset.name);
            if !unknown.is_empty() {
                println!("{} ignored unknown lookup types: {}", style("⚠").yellow(), unknown.join(", "));
            }
        }
        SelectionAction::Reset => {
            store.reset_to_defaults();
            println!("Provider selection reset to defaults");
        }
    }
    Ok(())
}
