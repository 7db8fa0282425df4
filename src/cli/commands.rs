use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "harvester", version, about = "Multi-provider threat-intelligence indicator lookups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "HARVESTER_CONFIG")]
    pub config: Option<String>,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up indicators against every enabled lookup type
    Lookup(LookupArgs),
    /// Load one lookup category for one indicator
    Load(LoadArgs),
    /// Resolve indicator types without looking anything up
    Identify(IdentifyArgs),
    /// Show providers per lookup type and the current selection
    Providers(ProvidersArgs),
    /// List provider presets offered by the backend
    Presets(PresetsArgs),
    /// Inspect or change the provider selection
    Selection(SelectionArgs),
    /// Manage the saved indicator list
    Indicators(IndicatorsArgs),
    /// Show or change saved preferences
    Settings(SettingsArgs),
    /// Read indicators from stdin and auto-load results as they resolve
    Watch(WatchArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct LookupArgs {
    /// Indicators (comma or whitespace separated). Omit to use the saved list
    pub indicators: Vec<String>,

    /// Also read indicators from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Only print results for this indicator
    #[arg(long)]
    pub only: Option<String>,
}

#[derive(Args, Clone)]
pub struct LoadArgs {
    /// Indicator to look up
    pub indicator: String,

    /// Lookup type, e.g. whois, dns, reputation
    pub lookup_type: String,

    /// Query only this provider
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct IdentifyArgs {
    /// Indicators (comma or whitespace separated)
    #[arg(required = true)]
    pub indicators: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ProvidersArgs {
    /// Only show this lookup type
    #[arg(short = 't', long = "type")]
    pub lookup_type: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct PresetsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct SelectionArgs {
    #[command(subcommand)]
    pub action: SelectionAction,
}

#[derive(Subcommand, Clone)]
pub enum SelectionAction {
    /// Print the selection per lookup type
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the providers of one lookup type
    Set {
        lookup_type: String,
        /// Provider IDs; none disables the type
        providers: Vec<String>,
    },
    /// Disable one lookup type
    Disable { lookup_type: String },
    /// Apply a backend preset
    Preset { name: String },
    /// Restore the default providers for every type
    Reset,
}

#[derive(Args, Clone)]
pub struct IndicatorsArgs {
    #[command(subcommand)]
    pub action: IndicatorsAction,
}

#[derive(Subcommand, Clone)]
pub enum IndicatorsAction {
    /// Print the saved indicators and their types
    List {
        /// Resolve types before printing
        #[arg(long)]
        identify: bool,
    },
    /// Add indicators to the saved list
    Add {
        #[arg(required = true)]
        indicators: Vec<String>,
    },
    /// Remove indicators from the saved list
    Remove {
        #[arg(required = true)]
        indicators: Vec<String>,
    },
    /// Remove every saved indicator
    Clear,
}

#[derive(Args, Clone)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Clone)]
pub enum SettingsAction {
    /// Print saved preferences
    Show,
    /// Turn auto-load on or off
    AutoLoad {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Result layout: grid or list
    Layout { layout: String },
}

#[derive(Args, Clone)]
pub struct WatchArgs {
    /// Output as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
