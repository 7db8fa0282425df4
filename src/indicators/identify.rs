use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::client::HarvesterApi;
use crate::models::IndicatorType;

/// Types resolved by one identification round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identification {
    pub requested: Vec<String>,
    pub types: HashMap<String, IndicatorType>,
}

/// Debounced indicator-type identification.
///
/// Every `schedule` cancels the round still waiting (or in flight) and starts
/// a new one after the debounce window; only the latest round ever delivers.
pub struct TypeIdentifier {
    api: Arc<dyn HarvesterApi>,
    debounce: Duration,
    pending: Option<CancellationToken>,
    tx: mpsc::UnboundedSender<Identification>,
}

impl TypeIdentifier {
    pub fn new(api: Arc<dyn HarvesterApi>, debounce: Duration) -> (Self, mpsc::UnboundedReceiver<Identification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { api, debounce, pending: None, tx }, rx)
    }

    pub fn schedule(&mut self, values: Vec<String>) {
        self.cancel();
        if values.is_empty() {
            return;
        }

        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let api = self.api.clone();
        let debounce = self.debounce;
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let types = tokio::select! {
                _ = token.cancelled() => return,
                types = identify_now(api.as_ref(), &values) => types,
            };

            if token.is_cancelled() {
                return;
            }
            let _ = tx.send(Identification { requested: values, types });
            // marks the round as finished for `is_pending`
            token.cancel();
        });
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

impl Drop for TypeIdentifier {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Identify immediately. Failures are logged and resolve nothing.
pub async fn identify_now(api: &dyn HarvesterApi, values: &[String]) -> HashMap<String, IndicatorType> {
    match api.identify(values).await {
        Ok(identified) => {
            debug!(requested = values.len(), resolved = identified.len(), "Indicator types resolved");
            identified
                .into_iter()
                .map(|i| (i.value, i.indicator_type))
                .collect()
        }
        Err(e) => {
            warn!(error = %e, count = values.len(), "Indicator identification failed");
            HashMap::new()
        }
    }
}
