use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use crate::client::HarvesterApi;
use crate::config::types::LookupConfig;
use crate::errors::HarvesterError;
use crate::indicators::{identify_now, Identification, IndicatorStore, TypeIdentifier};
use crate::lookup::{merge, AutoLoadController, LookupEvent, LookupExecutor, ManualResults, ResultSet};
use crate::models::{IndicatorResult, LookupResult, LookupType, ProvidersMetadata};
use crate::selection::{ProviderSelection, ProviderSelectionStore};
use crate::storage::prefs;
use crate::storage::{KeyValueStore, Layout};
use super::state::{AutoLoadReport, BulkReport, LookupFailure};

/// One analyst's harvester view: indicators, provider selection, cached
/// results and auto-load state, all owned by a single task.
pub struct HarvestSession {
    api: Arc<dyn HarvesterApi>,
    storage: Arc<dyn KeyValueStore>,
    executor: LookupExecutor,
    indicators: IndicatorStore,
    selection: ProviderSelectionStore,
    identifier: TypeIdentifier,
    identified: mpsc::UnboundedReceiver<Identification>,
    metadata: Option<Arc<ProvidersMetadata>>,
    bulk: ResultSet,
    manual: ManualResults,
    autoload: AutoLoadController,
    layout: Layout,
    event_tx: Option<mpsc::UnboundedSender<LookupEvent>>,
}

impl HarvestSession {
    /// Build a session from persisted preferences.
    ///
    /// Must run inside a Tokio runtime: a restored indicator list is queued
    /// for identification straight away.
    pub fn new(api: Arc<dyn HarvesterApi>, storage: Arc<dyn KeyValueStore>, config: &LookupConfig) -> Self {
        let selection = ProviderSelectionStore::load(storage.clone());
        let auto_load = prefs::load_auto_load(storage.as_ref(), config.auto_load);
        let layout = prefs::load_layout(storage.as_ref());
        let (identifier, identified) =
            TypeIdentifier::new(api.clone(), Duration::from_millis(config.identify_debounce_ms));
        let autoload = AutoLoadController::new(auto_load, selection.snapshot());

        let mut session = Self {
            executor: LookupExecutor::new(api.clone()),
            api,
            storage,
            indicators: IndicatorStore::new(),
            selection,
            identifier,
            identified,
            metadata: None,
            bulk: ResultSet::new(),
            manual: ManualResults::new(),
            autoload,
            layout,
            event_tx: None,
        };
        session.restore();
        session
    }

    /// Attach an event channel for streaming lookup progress to a renderer.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<LookupEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: LookupEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn restore(&mut self) {
        let persisted = prefs::load_indicators(self.storage.as_ref());
        if persisted.is_empty() {
            return;
        }
        let restored = self.indicators.add_indicators(&persisted.join("\n"));
        info!(count = restored.len(), "Restored indicator list");
        self.identifier.schedule(self.indicators.values().to_vec());
    }

    // ── Indicators ──

    pub fn indicators(&self) -> &IndicatorStore {
        &self.indicators
    }

    /// Add indicators from free text. Any change re-identifies the full list.
    pub fn add_indicators(&mut self, raw: &str) -> Vec<String> {
        let added = self.indicators.add_indicators(raw);
        if !added.is_empty() {
            debug!(added = added.len(), total = self.indicators.len(), "Indicators added");
            self.persist_indicators();
            self.identifier.schedule(self.indicators.values().to_vec());
        }
        added
    }

    pub fn remove_indicator(&mut self, value: &str) -> bool {
        if !self.indicators.remove_indicator(value) {
            return false;
        }
        self.forget_results(&[value.to_string()]);
        true
    }

    pub fn remove_selected(&mut self) -> Vec<String> {
        let removed = self.indicators.remove_selected();
        if !removed.is_empty() {
            self.forget_results(&removed);
        }
        removed
    }

    pub fn clear_all(&mut self) -> Vec<String> {
        let removed = self.indicators.clear_all();
        self.identifier.cancel();
        self.bulk.clear();
        self.manual.clear();
        self.autoload.reset();
        self.persist_indicators();
        info!(removed = removed.len(), "Indicator list cleared");
        removed
    }

    pub fn toggle_select(&mut self, value: &str) {
        self.indicators.toggle_select(value);
    }

    pub fn toggle_select_all(&mut self, checked: bool) {
        self.indicators.toggle_select_all(checked);
    }

    pub fn set_active(&mut self, value: &str) -> bool {
        self.indicators.set_active(value)
    }

    fn forget_results(&mut self, removed: &[String]) {
        for value in removed {
            self.bulk.remove(value);
            self.manual.forget(value);
            self.autoload.forget(value);
        }
        if self.indicators.is_empty() {
            self.identifier.cancel();
            self.bulk.clear();
            self.manual.clear();
        }
        self.persist_indicators();
    }

    fn persist_indicators(&self) {
        prefs::save_indicators(self.storage.as_ref(), self.indicators.values());
    }

    // ── Identification ──

    /// Wait for the next debounced identification round and apply it.
    /// Returns how many types were recorded, or `None` once the identifier
    /// is gone.
    pub async fn next_identification(&mut self) -> Option<usize> {
        let round = self.identified.recv().await?;
        Some(self.apply_identification(round))
    }

    /// Apply every round that has already arrived without waiting.
    pub fn poll_identification(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(round) = self.identified.try_recv() {
            applied += self.apply_identification(round);
        }
        applied
    }

    pub fn identification_pending(&self) -> bool {
        self.identifier.is_pending()
    }

    /// Identify unresolved indicators right now, skipping the debounce.
    pub async fn identify_now(&mut self) -> usize {
        let unresolved: Vec<String> = self.indicators.unresolved().into_iter().map(str::to_string).collect();
        if unresolved.is_empty() {
            return 0;
        }
        self.identifier.cancel();
        let types = identify_now(self.api.as_ref(), &unresolved).await;
        self.indicators.set_types(&types)
    }

    fn apply_identification(&mut self, round: Identification) -> usize {
        let applied = self.indicators.set_types(&round.types);
        debug!(
            requested = round.requested.len(),
            applied,
            unresolved = self.indicators.unresolved().len(),
            "Applied identification round"
        );
        applied
    }

    // ── Providers and selection ──

    pub async fn refresh_providers(&mut self) -> Result<Arc<ProvidersMetadata>, HarvesterError> {
        let metadata = Arc::new(self.api.providers().await?);
        info!(
            backend = self.api.backend_name(),
            types = metadata.providers.len(),
            presets = metadata.presets.len(),
            version = ?metadata.version,
            "Provider metadata loaded"
        );
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    async fn ensure_metadata(&mut self) -> Result<Arc<ProvidersMetadata>, HarvesterError> {
        match &self.metadata {
            Some(metadata) => Ok(metadata.clone()),
            None => self.refresh_providers().await,
        }
    }

    pub fn metadata(&self) -> Option<&ProvidersMetadata> {
        self.metadata.as_deref()
    }

    pub fn selection(&self) -> &ProviderSelectionStore {
        &self.selection
    }

    pub fn set_providers_for_type(&mut self, lookup_type: LookupType, provider_ids: Vec<String>) {
        self.selection.set_providers_for_type(lookup_type, provider_ids);
    }

    /// Apply a backend preset by name. Returns lookup-type names the preset
    /// mentions that this client does not know.
    pub async fn apply_preset(&mut self, name: &str) -> Result<Vec<String>, HarvesterError> {
        let metadata = self.ensure_metadata().await?;
        let preset = metadata
            .preset(name)
            .ok_or_else(|| HarvesterError::InvalidInput(format!("Unknown preset: {}", name)))?;
        Ok(self.selection.apply_preset(preset))
    }

    pub fn reset_selection(&mut self) {
        self.selection.reset_to_defaults();
    }

    // ── Preferences ──

    pub fn auto_load_enabled(&self) -> bool {
        self.autoload.is_enabled()
    }

    pub fn set_auto_load(&mut self, enabled: bool) {
        self.autoload.set_enabled(enabled);
        prefs::save_auto_load(self.storage.as_ref(), enabled);
        info!(enabled, "Auto-load toggled");
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        prefs::save_layout(self.storage.as_ref(), layout);
    }

    // ── Lookups ──

    /// Look up every indicator with a resolved type. The results replace the
    /// previous bulk run once all indicators have completed.
    pub async fn lookup_all(&mut self) -> Result<BulkReport, HarvesterError> {
        if self.indicators.is_empty() {
            return Ok(BulkReport::default());
        }
        let values = self.indicators.values().to_vec();
        let (results, report) = self.run_bulk(&values).await?;
        self.bulk = results;
        self.autoload
            .mark_loaded(values.into_iter().filter(|v| !report.skipped.contains(v)));
        Ok(report)
    }

    /// Load a single category for one indicator, optionally from a single
    /// provider. The results take precedence over bulk results.
    pub async fn load_category(
        &mut self,
        indicator: &str,
        lookup_type: LookupType,
        provider: Option<&str>,
    ) -> Result<Vec<LookupResult>, HarvesterError> {
        if !self.indicators.contains(indicator) {
            return Err(HarvesterError::InvalidInput(format!("Unknown indicator: {}", indicator)));
        }
        let indicator_type = self.indicators.indicator_type(indicator).ok_or_else(|| {
            HarvesterError::InvalidInput(format!("Indicator type not resolved yet: {}", indicator))
        })?;
        let metadata = self.ensure_metadata().await?;
        let selection = self.selection.snapshot();

        self.emit(LookupEvent::CategoryStarted {
            indicator: indicator.to_string(),
            lookup_type,
        });
        let outcome = self
            .executor
            .execute_single(indicator, indicator_type, lookup_type, provider, &metadata, &selection)
            .await;

        match outcome {
            Ok(results) => {
                self.emit(LookupEvent::CategoryLoaded {
                    indicator: indicator.to_string(),
                    lookup_type,
                    results: results.len(),
                });
                if self.indicators.contains(indicator) {
                    self.manual.merge_in(indicator, results.clone());
                }
                Ok(results)
            }
            Err(e) => {
                self.emit(LookupEvent::CategoryFailed {
                    indicator: indicator.to_string(),
                    lookup_type,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// One auto-load pass: bulk-load indicators never loaded before, then
    /// react to provider-selection changes since the last pass.
    pub async fn run_auto_load(&mut self) -> Result<AutoLoadReport, HarvesterError> {
        let mut report = AutoLoadReport::default();

        let pending = self.autoload.pending_initial_load(&self.indicators);
        if !pending.is_empty() {
            info!(count = pending.len(), "Auto-loading new indicators");
            let (results, bulk) = self.run_bulk(&pending).await?;
            self.bulk.absorb(results);
            self.autoload.mark_loaded(pending.iter().cloned());
            report.initial = Some(bulk);
        }

        let current = self.selection.snapshot();
        if let Some(change) = self.autoload.observe_selection(&self.indicators, &current) {
            self.manual.purge_types(&change.disabled);
            report.purged = change.disabled.clone();

            if !change.newly_enabled.is_empty() {
                let metadata = self.ensure_metadata().await?;
                for &lookup_type in &change.newly_enabled {
                    self.manual
                        .retain_providers(lookup_type, current.providers_for(lookup_type));
                    let failures = self
                        .refetch_type(lookup_type, &metadata, &current, &pending)
                        .await;
                    report.failures.extend(failures);
                }
                report.refetched = change.newly_enabled;
            }
        }

        Ok(report)
    }

    /// Fan out over `values` concurrently and publish nothing until every
    /// indicator has finished.
    async fn run_bulk(&mut self, values: &[String]) -> Result<(ResultSet, BulkReport), HarvesterError> {
        let metadata = self.ensure_metadata().await?;
        let selection = self.selection.snapshot();
        let enabled = selection.enabled_types();
        let started = Instant::now();
        let mut report = BulkReport::default();

        let mut targets = Vec::with_capacity(values.len());
        for value in values {
            match self.indicators.indicator_type(value) {
                Some(indicator_type) => targets.push((value.clone(), indicator_type)),
                None => {
                    self.emit(LookupEvent::IndicatorSkipped { indicator: value.clone() });
                    report.skipped.push(value.clone());
                }
            }
        }

        self.emit(LookupEvent::BulkStarted { indicators: targets.len() });

        let executor = self.executor.clone();
        let event_tx = self.event_tx.clone();
        let jobs = targets.into_iter().map(|(value, indicator_type)| {
            let executor = &executor;
            let metadata = &metadata;
            let selection = &selection;
            let enabled = &enabled;
            let event_tx = &event_tx;
            async move {
                let outcome = executor
                    .execute(&value, indicator_type, enabled, metadata, selection)
                    .await;
                if let Some(tx) = event_tx {
                    let event = match &outcome {
                        Ok(results) => LookupEvent::IndicatorLoaded {
                            indicator: value.clone(),
                            results: results.len(),
                            errors: results.iter().filter(|r| r.is_error()).count(),
                        },
                        Err(e) => LookupEvent::IndicatorFailed {
                            indicator: value.clone(),
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(event);
                }
                (value, outcome)
            }
        });
        let outcomes = join_all(jobs).await;

        let mut results = ResultSet::new();
        for (value, outcome) in outcomes {
            if !self.indicators.contains(&value) {
                debug!(indicator = %value, "Dropping results for removed indicator");
                continue;
            }
            match outcome {
                Ok(lookups) => {
                    results.insert(&value, lookups);
                    report.loaded.push(value);
                }
                Err(e) => {
                    warn!(indicator = %value, error = %e, "Lookup failed");
                    report.failures.push(failure(value, &e));
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            duration_ms = report.duration_ms,
            "Bulk lookup finished"
        );
        self.emit(LookupEvent::BulkCompleted {
            loaded: report.loaded.len(),
            failed: report.failures.len(),
            duration_ms: report.duration_ms,
        });
        Ok((results, report))
    }

    /// Re-run one type for every applicable indicator, writing each result
    /// into the manual cache as soon as it resolves. Indicators in `fresh`
    /// were just bulk-loaded with this selection and are skipped.
    async fn refetch_type(
        &mut self,
        lookup_type: LookupType,
        metadata: &Arc<ProvidersMetadata>,
        selection: &ProviderSelection,
        fresh: &[String],
    ) -> Vec<LookupFailure> {
        let targets: Vec<_> = self
            .indicators
            .values()
            .iter()
            .filter(|v| !fresh.contains(v))
            .filter_map(|v| self.indicators.indicator_type(v).map(|t| (v.clone(), t)))
            .filter(|(_, t)| lookup_type.applies_to(*t))
            .collect();

        let mut pending = FuturesUnordered::new();
        for (value, indicator_type) in targets {
            self.emit(LookupEvent::CategoryStarted {
                indicator: value.clone(),
                lookup_type,
            });
            let executor = self.executor.clone();
            let metadata = metadata.clone();
            let selection = selection.clone();
            pending.push(async move {
                let outcome = executor
                    .execute_single(&value, indicator_type, lookup_type, None, &metadata, &selection)
                    .await;
                (value, outcome)
            });
        }

        let mut failures = Vec::new();
        while let Some((value, outcome)) = pending.next().await {
            if !self.indicators.contains(&value) {
                debug!(indicator = %value, "Dropping results for removed indicator");
                continue;
            }
            match outcome {
                Ok(results) => {
                    self.emit(LookupEvent::CategoryLoaded {
                        indicator: value.clone(),
                        lookup_type,
                        results: results.len(),
                    });
                    self.manual.merge_in(&value, results);
                }
                Err(e) => {
                    warn!(indicator = %value, lookup_type = %lookup_type, error = %e, "Re-fetch failed");
                    self.emit(LookupEvent::CategoryFailed {
                        indicator: value.clone(),
                        lookup_type,
                        error: e.to_string(),
                    });
                    failures.push(failure(value, &e));
                }
            }
        }
        failures
    }

    // ── Results ──

    /// Bulk and manual results merged per indicator, limited to what the
    /// current provider selection shows.
    pub fn results(&self) -> Vec<IndicatorResult> {
        merge(&self.bulk, &self.manual, self.indicators.types(), self.selection.selection())
    }

    pub fn result_for(&self, indicator: &str) -> Option<IndicatorResult> {
        self.results().into_iter().find(|r| r.indicator == indicator)
    }

    pub fn bulk_results(&self) -> &ResultSet {
        &self.bulk
    }

    pub fn manual_results(&self) -> &ManualResults {
        &self.manual
    }
}

fn failure(indicator: String, error: &HarvesterError) -> LookupFailure {
    LookupFailure {
        indicator,
        error: error.to_string(),
        error_type: error.classify().error_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use crate::client::{BatchLookupRequest, BatchLookupResponse, IdentifiedIndicator, IndicatorRecords};
    use crate::models::IndicatorType;
    use crate::storage::MemoryStore;

    /// Answers every requested provider with a tagged record.
    #[derive(Default)]
    struct FakeBackend {
        batches: Mutex<Vec<BatchLookupRequest>>,
        identify_calls: AtomicUsize,
        fail_for: Option<String>,
    }

    impl FakeBackend {
        fn failing_for(indicator: &str) -> Self {
            Self {
                fail_for: Some(indicator.to_string()),
                ..Default::default()
            }
        }

        fn batches(&self) -> Vec<BatchLookupRequest> {
            self.batches.lock().unwrap().clone()
        }
    }

    fn classify(value: &str) -> IndicatorType {
        if value.contains('@') {
            IndicatorType::Email
        } else if value.parse::<std::net::IpAddr>().is_ok() {
            IndicatorType::Ip
        } else {
            IndicatorType::Domain
        }
    }

    #[async_trait]
    impl HarvesterApi for FakeBackend {
        async fn identify(&self, indicators: &[String]) -> Result<Vec<IdentifiedIndicator>, HarvesterError> {
            self.identify_calls.fetch_add(1, Ordering::SeqCst);
            Ok(indicators
                .iter()
                .map(|v| IdentifiedIndicator { value: v.clone(), indicator_type: classify(v) })
                .collect())
        }

        async fn batch_lookup(&self, request: &BatchLookupRequest) -> Result<BatchLookupResponse, HarvesterError> {
            self.batches.lock().unwrap().push(request.clone());
            let indicator = request.indicators[0].clone();
            if self.fail_for.as_deref() == Some(indicator.as_str()) {
                return Err(HarvesterError::Api { status: 502, message: "upstream down".into() });
            }
            let records: Vec<Value> = request
                .providers_by_type
                .iter()
                .flat_map(|(t, ids)| ids.iter().map(move |id| json!({"lookup_type": t, "provider": id, "ok": true})))
                .collect();
            Ok(BatchLookupResponse {
                results: vec![IndicatorRecords { indicator, results: records }],
                indicator_types: HashMap::new(),
            })
        }

        async fn providers(&self) -> Result<ProvidersMetadata, HarvesterError> {
            Ok(serde_json::from_value(json!({
                "providers": {
                    "whois": [{"id": "whois", "available": true}],
                    "dns": [{"id": "dns", "available": true}, {"id": "cloudflare", "available": true}],
                    "ip_info": [{"id": "ipinfo", "available": true}],
                    "email_validator": [{"id": "email_validator", "available": true}],
                    "screenshot": [{"id": "urlscan", "available": true}]
                },
                "presets": [{"name": "dns-only", "providers_by_type": {"dns": ["cloudflare"], "asn": ["bgp"]}}]
            }))
            .unwrap())
        }
    }

    fn config() -> LookupConfig {
        LookupConfig { auto_load: true, identify_debounce_ms: 5 }
    }

    fn session_with(backend: Arc<FakeBackend>) -> HarvestSession {
        HarvestSession::new(backend, Arc::new(MemoryStore::new()), &config())
    }

    #[tokio::test]
    async fn test_add_then_identify_via_debounce() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("example.com, 8.8.8.8");
        session.add_indicators("analyst@example.com");

        let applied = session.next_identification().await.unwrap();
        assert_eq!(applied, 3);
        assert_eq!(session.indicators().indicator_type("8.8.8.8"), Some(IndicatorType::Ip));
        assert_eq!(backend.identify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lookup_all_skips_unresolved() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("example.com");
        let report = session.lookup_all().await.unwrap();
        assert_eq!(report.skipped, vec!["example.com"]);
        assert!(backend.batches().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_all_isolates_failures() {
        let backend = Arc::new(FakeBackend::failing_for("bad.com"));
        let mut session = session_with(backend.clone());
        session.add_indicators("good.com bad.com 8.8.8.8");
        session.identify_now().await;

        let report = session.lookup_all().await.unwrap();
        assert_eq!(report.loaded, vec!["good.com", "8.8.8.8"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].indicator, "bad.com");
        assert_eq!(report.failures[0].error_type, "ApiError");

        let results = session.results();
        let good = results.iter().find(|r| r.indicator == "good.com").unwrap();
        assert!(good.find(LookupType::Whois, "whois").is_some());
        assert!(results.iter().all(|r| r.indicator != "bad.com"));
    }

    #[tokio::test]
    async fn test_manual_load_outranks_bulk() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("example.com");
        session.identify_now().await;
        session.lookup_all().await.unwrap();

        let before = session.result_for("example.com").unwrap();
        let bulk_fetched = before.find(LookupType::Dns, "dns").unwrap().fetched_at;

        session.load_category("example.com", LookupType::Dns, None).await.unwrap();
        let after = session.result_for("example.com").unwrap();
        let dns: Vec<_> = after.results.iter().filter(|r| r.lookup_type == LookupType::Dns).collect();
        assert_eq!(dns.len(), 1);
        assert!(dns[0].fetched_at >= bulk_fetched);
        assert!(session.manual_results().get("example.com").is_some());
    }

    #[tokio::test]
    async fn test_load_category_rejects_unknown_indicator() {
        let mut session = session_with(Arc::new(FakeBackend::default()));
        let err = session.load_category("nope.com", LookupType::Dns, None).await.unwrap_err();
        assert!(matches!(err, HarvesterError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_removal_cascades_everywhere() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend);
        session.add_indicators("a.com b.com");
        session.identify_now().await;
        session.lookup_all().await.unwrap();
        session.load_category("a.com", LookupType::Whois, None).await.unwrap();
        session.toggle_select("a.com");
        session.set_active("a.com");

        assert!(session.remove_indicator("a.com"));
        assert!(session.bulk_results().get("a.com").is_none());
        assert!(session.manual_results().get("a.com").is_none());
        assert!(!session.indicators().is_selected("a.com"));
        assert_ne!(session.indicators().active(), Some("a.com"));
        assert!(session.indicators().indicator_type("a.com").is_none());
        assert!(session.results().iter().all(|r| r.indicator != "a.com"));
    }

    #[tokio::test]
    async fn test_readded_indicator_loads_again() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("a.com");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();
        let calls = backend.batches().len();

        session.remove_indicator("a.com");
        session.add_indicators("a.com");
        session.identify_now().await;
        let report = session.run_auto_load().await.unwrap();
        assert_eq!(report.initial.unwrap().loaded, vec!["a.com"]);
        assert_eq!(backend.batches().len(), calls + 1);
    }

    #[tokio::test]
    async fn test_auto_load_runs_once() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("a.com");
        session.identify_now().await;

        let first = session.run_auto_load().await.unwrap();
        assert_eq!(first.initial.unwrap().loaded, vec!["a.com"]);
        let calls = backend.batches().len();

        let second = session.run_auto_load().await.unwrap();
        assert!(second.is_noop());
        assert_eq!(backend.batches().len(), calls);
    }

    #[tokio::test]
    async fn test_auto_load_waits_for_every_type() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("a.com");
        session.identify_now().await;
        session.add_indicators("b.com");

        let report = session.run_auto_load().await.unwrap();
        assert!(report.is_noop());
        assert!(backend.batches().is_empty());
    }

    #[tokio::test]
    async fn test_auto_load_disabled_is_persisted() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let backend = Arc::new(FakeBackend::default());
        {
            let mut session = HarvestSession::new(backend.clone(), storage.clone(), &config());
            session.set_auto_load(false);
        }
        let mut session = HarvestSession::new(backend.clone(), storage, &config());
        assert!(!session.auto_load_enabled());
        session.add_indicators("a.com");
        session.identify_now().await;
        assert!(session.run_auto_load().await.unwrap().is_noop());
        assert!(backend.batches().is_empty());
    }

    #[tokio::test]
    async fn test_selection_change_refetches_only_changed_type() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("a.com 8.8.8.8");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();
        let before = backend.batches().len();

        session.set_providers_for_type(LookupType::Screenshot, vec!["urlscan".into()]);
        let report = session.run_auto_load().await.unwrap();
        assert_eq!(report.refetched, vec![LookupType::Screenshot]);

        let refetches = &backend.batches()[before..];
        assert_eq!(refetches.len(), 1);
        assert_eq!(refetches[0].indicators, vec!["a.com"]);
        assert_eq!(refetches[0].providers_by_type.keys().collect::<Vec<_>>(), vec!["screenshot"]);
        let merged = session.result_for("a.com").unwrap();
        assert!(merged.find(LookupType::Screenshot, "urlscan").is_some());
    }

    #[tokio::test]
    async fn test_disabling_type_purges_manual_cache() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("a.com");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();
        session.load_category("a.com", LookupType::Dns, None).await.unwrap();

        session.set_providers_for_type(LookupType::Dns, vec![]);
        let report = session.run_auto_load().await.unwrap();
        assert_eq!(report.purged, vec![LookupType::Dns]);
        let manual = session.manual_results().get("a.com").unwrap();
        assert!(manual.iter().all(|r| r.lookup_type != LookupType::Dns));
    }

    #[tokio::test]
    async fn test_disabling_type_hides_bulk_results() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend);
        session.add_indicators("a.com");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();
        assert!(session.result_for("a.com").unwrap().find(LookupType::Dns, "dns").is_some());

        session.set_providers_for_type(LookupType::Dns, vec![]);
        session.run_auto_load().await.unwrap();
        let merged = session.result_for("a.com").unwrap();
        assert!(merged.results.iter().all(|r| r.lookup_type != LookupType::Dns));
        assert!(merged.find(LookupType::Whois, "whois").is_some());
        assert!(session.bulk_results().get("a.com").unwrap().iter().any(|r| r.lookup_type == LookupType::Dns));
    }

    #[tokio::test]
    async fn test_switching_provider_replaces_bulk_card() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend);
        session.add_indicators("a.com");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();

        session.set_providers_for_type(LookupType::Dns, vec!["cloudflare".into()]);
        session.run_auto_load().await.unwrap();
        let merged = session.result_for("a.com").unwrap();
        let dns: Vec<String> = merged
            .results
            .iter()
            .filter(|r| r.lookup_type == LookupType::Dns)
            .map(LookupResult::merge_key)
            .collect();
        assert_eq!(dns, vec!["dns::cloudflare"]);
    }

    #[tokio::test]
    async fn test_new_indicator_not_refetched_in_same_pass() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend.clone());
        session.add_indicators("a.com");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();
        let before = backend.batches().len();

        session.add_indicators("b.com");
        session.identify_now().await;
        session.set_providers_for_type(LookupType::Dns, vec!["cloudflare".into()]);
        let report = session.run_auto_load().await.unwrap();
        assert_eq!(report.initial.unwrap().loaded, vec!["b.com"]);
        assert_eq!(report.refetched, vec![LookupType::Dns]);

        let issued = &backend.batches()[before..];
        assert_eq!(issued.len(), 2);
        let b_requests = issued.iter().filter(|r| r.indicators == vec!["b.com"]).count();
        assert_eq!(b_requests, 1);
    }

    #[tokio::test]
    async fn test_deselected_provider_dropped_from_manual_cache() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = session_with(backend);
        session.add_indicators("a.com");
        session.identify_now().await;
        session.run_auto_load().await.unwrap();
        session.set_providers_for_type(LookupType::Dns, vec!["dns".into(), "cloudflare".into()]);
        session.run_auto_load().await.unwrap();
        assert_eq!(session.manual_results().get("a.com").unwrap().len(), 2);

        session.set_providers_for_type(LookupType::Dns, vec!["cloudflare".into()]);
        session.run_auto_load().await.unwrap();
        let keys: Vec<String> = session
            .manual_results()
            .get("a.com")
            .unwrap()
            .iter()
            .map(LookupResult::merge_key)
            .collect();
        assert_eq!(keys, vec!["dns::cloudflare"]);
    }

    #[tokio::test]
    async fn test_apply_preset_by_name() {
        let mut session = session_with(Arc::new(FakeBackend::default()));
        let unknown = session.apply_preset("DNS-ONLY").await.unwrap();
        assert_eq!(unknown, vec!["asn"]);
        assert_eq!(session.selection().enabled_types(), vec![LookupType::Dns]);

        let err = session.apply_preset("missing").await.unwrap_err();
        assert!(matches!(err, HarvesterError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_indicators_restored_from_storage() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let backend = Arc::new(FakeBackend::default());
        {
            let mut session = HarvestSession::new(backend.clone(), storage.clone(), &config());
            session.add_indicators("a.com b.com");
            session.remove_indicator("b.com");
        }
        let mut session = HarvestSession::new(backend, storage, &config());
        assert_eq!(session.indicators().values(), ["a.com".to_string()]);
        assert_eq!(session.next_identification().await, Some(1));
    }

    #[tokio::test]
    async fn test_clear_all_resets_results() {
        let mut session = session_with(Arc::new(FakeBackend::default()));
        session.add_indicators("a.com");
        session.identify_now().await;
        session.lookup_all().await.unwrap();
        let removed = session.clear_all();
        assert_eq!(removed, vec!["a.com"]);
        assert!(session.bulk_results().is_empty());
        assert!(session.results().is_empty());
        assert!(!session.identification_pending());
    }

    #[tokio::test]
    async fn test_events_stream_bulk_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = session_with(Arc::new(FakeBackend::default())).with_event_channel(tx);
        session.add_indicators("a.com");
        session.identify_now().await;
        session.lookup_all().await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&LookupEvent::BulkStarted { indicators: 1 }));
        assert!(matches!(events.last(), Some(LookupEvent::BulkCompleted { loaded: 1, failed: 0, .. })));
    }
}
