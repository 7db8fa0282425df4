use std::collections::BTreeMap;
use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::client::{BatchLookupRequest, BatchLookupResponse, HarvesterApi};
use crate::errors::HarvesterError;
use crate::models::{IndicatorType, LookupResult, LookupType, ProvidersMetadata};
use crate::selection::ProviderSelection;

/// Lookup type -> effective provider IDs for one request.
pub type RequestPlan = BTreeMap<LookupType, Vec<String>>;

/// Work out which types and providers to ask for.
///
/// `Ok(None)` means no enabled type applies to the indicator (nothing to do);
/// an empty plan after filtering by availability is `NoProvidersAvailable`.
pub fn plan_request(
    indicator_type: IndicatorType,
    enabled_types: &[LookupType],
    metadata: &ProvidersMetadata,
    selection: &ProviderSelection,
) -> Result<Option<RequestPlan>, HarvesterError> {
    let types_to_run: Vec<LookupType> = enabled_types
        .iter()
        .copied()
        .filter(|t| t.applies_to(indicator_type))
        .collect();

    if types_to_run.is_empty() {
        return Ok(None);
    }

    let mut plan = RequestPlan::new();
    for lookup_type in types_to_run {
        let effective: Vec<String> = selection
            .providers_for(lookup_type)
            .iter()
            .filter(|id| metadata.is_available(lookup_type, id))
            .cloned()
            .collect();
        if effective.is_empty() {
            debug!(lookup_type = %lookup_type, "No available providers selected, dropping type");
            continue;
        }
        plan.insert(lookup_type, effective);
    }

    if plan.is_empty() {
        return Err(HarvesterError::NoProvidersAvailable);
    }
    Ok(Some(plan))
}

/// Runs one indicator's lookups against the batch endpoint.
#[derive(Clone)]
pub struct LookupExecutor {
    api: Arc<dyn HarvesterApi>,
}

impl LookupExecutor {
    pub fn new(api: Arc<dyn HarvesterApi>) -> Self {
        Self { api }
    }

    /// Look up `indicator` for every enabled type that applies to it.
    pub async fn execute(
        &self,
        indicator: &str,
        indicator_type: IndicatorType,
        enabled_types: &[LookupType],
        metadata: &ProvidersMetadata,
        selection: &ProviderSelection,
    ) -> Result<Vec<LookupResult>, HarvesterError> {
        let plan = match plan_request(indicator_type, enabled_types, metadata, selection)? {
            Some(plan) => plan,
            None => {
                debug!(indicator, indicator_type = %indicator_type, "No applicable lookup types");
                return Ok(Vec::new());
            }
        };

        let request = BatchLookupRequest {
            indicators: vec![indicator.to_string()],
            providers_by_type: plan
                .iter()
                .map(|(t, ids)| (t.as_str().to_string(), ids.clone()))
                .collect(),
        };

        info!(
            indicator,
            types = plan.len(),
            providers = plan.values().map(Vec::len).sum::<usize>(),
            "Running lookups"
        );
        let response = self.api.batch_lookup(&request).await?;
        Ok(tag_records(indicator, &response, &plan))
    }

    /// Look up a single type, optionally narrowed to one provider.
    pub async fn execute_single(
        &self,
        indicator: &str,
        indicator_type: IndicatorType,
        lookup_type: LookupType,
        provider: Option<&str>,
        metadata: &ProvidersMetadata,
        selection: &ProviderSelection,
    ) -> Result<Vec<LookupResult>, HarvesterError> {
        match provider {
            Some(provider) => {
                let mut narrowed = selection.clone();
                narrowed.set(lookup_type, vec![provider.to_string()]);
                self.execute(indicator, indicator_type, &[lookup_type], metadata, &narrowed).await
            }
            None => self.execute(indicator, indicator_type, &[lookup_type], metadata, selection).await,
        }
    }
}

/// Decode the indicator's records and stamp each with its lookup type.
fn tag_records(indicator: &str, response: &BatchLookupResponse, plan: &RequestPlan) -> Vec<LookupResult> {
    let records = match response.results.as_slice() {
        [only] if only.indicator != indicator => {
            debug!(indicator, returned = %only.indicator, "Backend normalised indicator value");
            only.results.as_slice()
        }
        _ => response.records_for(indicator),
    };

    records
        .iter()
        .filter_map(|record| {
            let lookup_type = resolve_lookup_type(record, plan);
            if lookup_type.is_none() {
                warn!(indicator, provider = ?LookupResult::record_provider(record), "Dropping record without lookup type");
            }
            LookupResult::from_record(record, lookup_type?)
        })
        .collect()
}

fn resolve_lookup_type(record: &Value, plan: &RequestPlan) -> Option<LookupType> {
    if let Some(tagged) = LookupResult::record_lookup_type(record) {
        return Some(tagged);
    }
    if plan.len() == 1 {
        return plan.keys().next().copied();
    }
    let provider = LookupResult::record_provider(record)?;
    let mut owners = plan
        .iter()
        .filter(|(_, ids)| ids.iter().any(|id| id == provider))
        .map(|(t, _)| *t);
    match (owners.next(), owners.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use serde_json::json;
    use crate::client::{IdentifiedIndicator, IndicatorRecords};

    /// Records every request and answers with canned records.
    struct ScriptedApi {
        requests: Mutex<Vec<BatchLookupRequest>>,
        records: Vec<Value>,
    }

    impl ScriptedApi {
        fn new(records: Vec<Value>) -> Arc<Self> {
            Arc::new(Self { requests: Mutex::new(Vec::new()), records })
        }

        fn requests(&self) -> Vec<BatchLookupRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HarvesterApi for ScriptedApi {
        async fn identify(&self, _indicators: &[String]) -> Result<Vec<IdentifiedIndicator>, HarvesterError> {
            Ok(Vec::new())
        }

        async fn batch_lookup(&self, request: &BatchLookupRequest) -> Result<BatchLookupResponse, HarvesterError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(BatchLookupResponse {
                results: vec![IndicatorRecords {
                    indicator: request.indicators[0].clone(),
                    results: self.records.clone(),
                }],
                ..Default::default()
            })
        }

        async fn providers(&self) -> Result<ProvidersMetadata, HarvesterError> {
            Ok(ProvidersMetadata::default())
        }
    }

    fn metadata() -> ProvidersMetadata {
        serde_json::from_value(json!({
            "providers": {
                "whois": [{"id": "whois", "available": true}],
                "email_validator": [{"id": "email_validator", "available": true}],
                "dns": [{"id": "dns", "available": true}, {"id": "cloudflare", "available": true}],
                "reputation": [{"id": "virustotal", "available": false}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_plan_filters_by_applicability() {
        let selection = ProviderSelection::defaults();
        let plan = plan_request(
            IndicatorType::Email,
            &[LookupType::Whois, LookupType::EmailValidator],
            &metadata(),
            &selection,
        )
        .unwrap()
        .unwrap();
        assert_eq!(plan.keys().copied().collect::<Vec<_>>(), vec![LookupType::EmailValidator]);
    }

    #[test]
    fn test_plan_no_applicable_types_is_none() {
        let plan = plan_request(
            IndicatorType::Cve,
            &[LookupType::Whois],
            &metadata(),
            &ProviderSelection::defaults(),
        )
        .unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_plan_all_unavailable_is_error() {
        let result = plan_request(
            IndicatorType::Domain,
            &[LookupType::Reputation],
            &metadata(),
            &ProviderSelection::defaults(),
        );
        assert!(matches!(result, Err(HarvesterError::NoProvidersAvailable)));
    }

    #[test]
    fn test_plan_drops_only_unavailable_types() {
        let plan = plan_request(
            IndicatorType::Domain,
            &[LookupType::Whois, LookupType::Reputation],
            &metadata(),
            &ProviderSelection::defaults(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.contains_key(&LookupType::Whois));
    }

    #[test]
    fn test_plan_keeps_selection_order_and_filters_stale_ids() {
        let mut selection = ProviderSelection::defaults();
        selection.set(LookupType::Dns, vec!["cloudflare".into(), "retired".into(), "dns".into()]);
        let plan = plan_request(IndicatorType::Domain, &[LookupType::Dns], &metadata(), &selection)
            .unwrap()
            .unwrap();
        assert_eq!(plan[&LookupType::Dns], vec!["cloudflare".to_string(), "dns".to_string()]);
    }

    #[tokio::test]
    async fn test_execute_email_runs_only_email_validator() {
        let api = ScriptedApi::new(vec![json!({"lookup_type": "email_validator", "provider": "email_validator", "valid": true})]);
        let executor = LookupExecutor::new(api.clone());
        let results = executor
            .execute(
                "analyst@example.com",
                IndicatorType::Email,
                &[LookupType::Whois, LookupType::EmailValidator],
                &metadata(),
                &ProviderSelection::defaults(),
            )
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.lookup_type != LookupType::Whois));
        assert_eq!(results.len(), 1);
        let sent = api.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].providers_by_type.keys().collect::<Vec<_>>(), vec!["email_validator"]);
    }

    #[tokio::test]
    async fn test_execute_without_applicable_types_makes_no_call() {
        let api = ScriptedApi::new(vec![]);
        let executor = LookupExecutor::new(api.clone());
        let results = executor
            .execute("CVE-2024-0001", IndicatorType::Cve, &[LookupType::Whois], &metadata(), &ProviderSelection::defaults())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_execute_no_providers_rejects() {
        let api = ScriptedApi::new(vec![]);
        let executor = LookupExecutor::new(api.clone());
        let result = executor
            .execute("example.com", IndicatorType::Domain, &[LookupType::Reputation], &metadata(), &ProviderSelection::defaults())
            .await;
        assert!(matches!(result, Err(HarvesterError::NoProvidersAvailable)));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_untagged_records_retagged() {
        let api = ScriptedApi::new(vec![
            json!({"provider": "whois", "registrar": "X"}),
            json!({"provider": "cloudflare", "a": ["1.2.3.4"]}),
            json!({"provider": "mystery"}),
            json!({"lookup_type": "dns", "provider": "dns", "a": []}),
        ]);
        let executor = LookupExecutor::new(api);
        let mut selection = ProviderSelection::defaults();
        selection.set(LookupType::Dns, vec!["dns".into(), "cloudflare".into()]);
        let results = executor
            .execute("example.com", IndicatorType::Domain, &[LookupType::Whois, LookupType::Dns], &metadata(), &selection)
            .await
            .unwrap();

        let keys: Vec<String> = results.iter().map(LookupResult::merge_key).collect();
        assert_eq!(keys, vec!["whois::whois", "dns::cloudflare", "dns::dns"]);
    }

    #[tokio::test]
    async fn test_single_type_request_tags_everything() {
        let api = ScriptedApi::new(vec![json!({"provider": "cloudflare"}), json!({"note": "no provider"})]);
        let executor = LookupExecutor::new(api.clone());
        let results = executor
            .execute_single("example.com", IndicatorType::Domain, LookupType::Dns, None, &metadata(), &ProviderSelection::defaults())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.lookup_type == LookupType::Dns));
        assert_eq!(results[1].merge_key(), "dns::unknown");
    }

    #[tokio::test]
    async fn test_single_provider_narrowing() {
        let api = ScriptedApi::new(vec![]);
        let executor = LookupExecutor::new(api.clone());
        executor
            .execute_single("example.com", IndicatorType::Domain, LookupType::Dns, Some("cloudflare"), &metadata(), &ProviderSelection::defaults())
            .await
            .unwrap();
        let sent = api.requests();
        assert_eq!(sent[0].providers_by_type["dns"], vec!["cloudflare".to_string()]);
    }
}
