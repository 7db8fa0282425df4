use std::collections::HashMap;
use std::time::Duration;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use crate::lookup::LookupEvent;
use crate::models::{IndicatorResult, LookupResult, LookupType};
use crate::session::{BulkReport, LookupFailure};
use crate::storage::Layout;
use crate::utils::formatting::{format_duration, format_value};
use crate::utils::truncation::truncate_value;

/// indicatif bars driven by lookup events.
pub struct LookupProgress {
    multi: MultiProgress,
    bulk_bar: Option<ProgressBar>,
    category_bars: HashMap<(String, LookupType), ProgressBar>,
}

impl LookupProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bulk_bar: None,
            category_bars: HashMap::new(),
        }
    }

    pub fn handle_event(&mut self, event: &LookupEvent) {
        match event {
            LookupEvent::BulkStarted { indicators } => {
                let bar = self.multi.add(ProgressBar::new(*indicators as u64));
                if let Ok(bar_style) = ProgressStyle::default_bar()
                    .template("  {bar:30.cyan/dark_gray} {pos}/{len} indicators | {msg}")
                {
                    bar.set_style(bar_style.progress_chars("█▓░"));
                }
                bar.set_message("Looking up");
                bar.enable_steady_tick(Duration::from_millis(120));
                self.bulk_bar = Some(bar);
            }
            LookupEvent::IndicatorLoaded { indicator, .. } => {
                if let Some(bar) = &self.bulk_bar {
                    bar.set_message(indicator.clone());
                    bar.inc(1);
                }
            }
            LookupEvent::IndicatorFailed { indicator, error } => {
                if let Some(bar) = &self.bulk_bar {
                    bar.inc(1);
                }
                self.println(&format!("  {} {}: {}", style("✗").red(), indicator, error));
            }
            LookupEvent::IndicatorSkipped { indicator } => {
                self.println(&format!(
                    "  {} {} skipped: type not resolved",
                    style("⚠").yellow(),
                    indicator
                ));
            }
            LookupEvent::BulkCompleted { loaded, failed, duration_ms } => {
                if let Some(bar) = self.bulk_bar.take() {
                    bar.finish_and_clear();
                }
                self.println(&format!(
                    "  {} {} loaded, {} failed in {}",
                    style("✓").green(),
                    loaded,
                    failed,
                    format_duration(*duration_ms)
                ));
            }
            LookupEvent::CategoryStarted { indicator, lookup_type } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                if let Ok(spinner) = ProgressStyle::default_spinner().template("    {spinner:.yellow} {msg}") {
                    bar.set_style(spinner);
                }
                bar.set_message(format!("{} ({})", indicator, lookup_type.definition().display_name));
                bar.enable_steady_tick(Duration::from_millis(100));
                self.category_bars.insert((indicator.clone(), *lookup_type), bar);
            }
            LookupEvent::CategoryLoaded { indicator, lookup_type, .. } => {
                if let Some(bar) = self.category_bars.remove(&(indicator.clone(), *lookup_type)) {
                    bar.finish_and_clear();
                }
            }
            LookupEvent::CategoryFailed { indicator, lookup_type, error } => {
                if let Some(bar) = self.category_bars.remove(&(indicator.clone(), *lookup_type)) {
                    bar.abandon_with_message(format!("{} ({}): {}", indicator, lookup_type, error));
                }
            }
        }
    }

    /// Clear any bars still running.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bulk_bar.take() {
            bar.finish_and_clear();
        }
        for (_, bar) in self.category_bars.drain() {
            bar.finish_and_clear();
        }
    }

    /// Print a line through the multi-progress (won't interfere with bars).
    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for LookupProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a lookup event as one plain styled line.
pub fn render_event(event: &LookupEvent) -> String {
    match event {
        LookupEvent::BulkStarted { indicators } => {
            format!("{} Looking up {} indicators", style("▶").green().bold(), indicators)
        }
        LookupEvent::IndicatorLoaded { indicator, results, errors } => {
            format!("  {} {} ({} results, {} errors)", style("✓").green(), indicator, results, errors)
        }
        LookupEvent::IndicatorFailed { indicator, error } => {
            format!("  {} {}: {}", style("✗").red(), indicator, error)
        }
        LookupEvent::IndicatorSkipped { indicator } => {
            format!("  {} {} skipped: type not resolved", style("⚠").yellow(), indicator)
        }
        LookupEvent::BulkCompleted { loaded, failed, duration_ms } => format!(
            "{} {} loaded, {} failed in {}",
            style("■").cyan(),
            loaded,
            failed,
            format_duration(*duration_ms)
        ),
        LookupEvent::CategoryStarted { indicator, lookup_type } => {
            format!("  {} {} {}", style("⏳").yellow(), indicator, lookup_type)
        }
        LookupEvent::CategoryLoaded { indicator, lookup_type, results } => {
            format!("  {} {} {} ({} results)", style("✓").green(), indicator, lookup_type, results)
        }
        LookupEvent::CategoryFailed { indicator, lookup_type, error } => {
            format!("  {} {} {}: {}", style("✗").red(), indicator, lookup_type, error)
        }
    }
}

/// Render every result for one indicator.
pub fn render_indicator(result: &IndicatorResult, layout: Layout) -> String {
    let type_label = result
        .indicator_type
        .map(|t| t.as_str())
        .unwrap_or("unresolved");
    let mut out = format!(
        "\n{} {} {}\n",
        style("●").cyan().bold(),
        style(&result.indicator).white().bold(),
        style(format!("[{}]", type_label)).dim(),
    );

    if result.results.is_empty() {
        out.push_str(&format!("  {}\n", style("No results").dim()));
        return out;
    }

    for lookup in &result.results {
        match layout {
            Layout::Grid => out.push_str(&render_card(lookup)),
            Layout::List => out.push_str(&render_row(lookup)),
        }
    }
    out
}

fn heading(lookup: &LookupResult) -> String {
    format!(
        "{} / {}",
        lookup.lookup_type.definition().display_name,
        lookup.provider.as_deref().unwrap_or("unknown")
    )
}

fn render_card(lookup: &LookupResult) -> String {
    let mut out = format!("  {}\n", style(heading(lookup)).cyan());
    if let Some(error) = &lookup.error {
        out.push_str(&format!("    {} {}\n", style("error:").red(), truncate_value(&error.summary())));
        return out;
    }
    if lookup.essential.is_empty() {
        out.push_str(&format!("    {}\n", style("(no data)").dim()));
    }
    for (key, value) in &lookup.essential {
        out.push_str(&format!("    {}: {}\n", style(key).dim(), truncate_value(&format_value(value))));
    }
    if !lookup.additional.is_empty() {
        out.push_str(&format!("    {}\n", style(format!("+{} more fields", lookup.additional.len())).dim()));
    }
    out
}

fn render_row(lookup: &LookupResult) -> String {
    let summary = match &lookup.error {
        Some(error) => style(truncate_value(&error.summary())).red().to_string(),
        None => lookup
            .essential
            .iter()
            .take(3)
            .map(|(k, v)| format!("{}={}", k, truncate_value(&format_value(v))))
            .collect::<Vec<_>>()
            .join("  "),
    };
    format!("  {:<32} {}\n", heading(lookup), summary)
}

/// One-paragraph summary of a bulk run.
pub fn render_bulk_report(report: &BulkReport) -> String {
    if let Some(message) = report.common_failure() {
        return format!("{} {}", style("✗").red(), message);
    }
    let mut out = format!(
        "{} {} loaded, {} failed, {} skipped ({})",
        style("■").cyan(),
        report.loaded.len(),
        report.failures.len(),
        report.skipped.len(),
        format_duration(report.duration_ms)
    );
    for LookupFailure { indicator, error, .. } in &report.failures {
        out.push_str(&format!("\n  {} {}: {}", style("✗").red(), indicator, error));
    }
    out
}
