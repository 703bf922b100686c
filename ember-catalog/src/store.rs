use crate::experiments::ExperimentDefinition;
use crate::models::Offer;
use crate::segments::PlayerSegment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Serialized catalog snapshot exchanged with the persistence collaborator
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub offers: Vec<Value>,
    #[serde(default, rename = "playerSegments")]
    pub player_segments: Vec<Value>,
    #[serde(default, rename = "abTests")]
    pub ab_tests: Vec<Value>,
}

/// The offer catalog, in declaration order, plus segment and experiment
/// definitions. Declaration order matters: it is the ranking tie-breaker and
/// the segment priority order.
#[derive(Debug, Default)]
pub struct CatalogStore {
    offers: Vec<Offer>,
    segments: Vec<PlayerSegment>,
    experiments: Vec<ExperimentDefinition>,
}

impl CatalogStore {
    pub fn new(
        offers: Vec<Offer>,
        segments: Vec<PlayerSegment>,
        experiments: Vec<ExperimentDefinition>,
    ) -> Self {
        Self {
            offers,
            segments,
            experiments,
        }
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn offer(&self, offer_id: &str) -> Option<&Offer> {
        self.offers.iter().find(|o| o.id == offer_id)
    }

    pub fn offer_mut(&mut self, offer_id: &str) -> Option<&mut Offer> {
        self.offers.iter_mut().find(|o| o.id == offer_id)
    }

    pub fn offers_mut(&mut self) -> &mut [Offer] {
        &mut self.offers
    }

    pub fn add_offer(&mut self, offer: Offer) {
        self.offers.push(offer);
    }

    pub fn segments(&self) -> &[PlayerSegment] {
        &self.segments
    }

    pub fn experiment(&self, experiment_id: &str) -> Option<&ExperimentDefinition> {
        self.experiments.iter().find(|e| e.id == experiment_id)
    }

    pub fn experiments(&self) -> &[ExperimentDefinition] {
        &self.experiments
    }

    /// Serialize for the persistence collaborator
    pub fn to_document(&self) -> Value {
        let document = CatalogDocument {
            offers: self
                .offers
                .iter()
                .filter_map(|o| serde_json::to_value(o).ok())
                .collect(),
            player_segments: self
                .segments
                .iter()
                .filter_map(|s| serde_json::to_value(s).ok())
                .collect(),
            ab_tests: self
                .experiments
                .iter()
                .filter_map(|e| serde_json::to_value(e).ok())
                .collect(),
        };
        serde_json::to_value(document).unwrap_or(Value::Null)
    }

    /// Rebuild from a persisted document.
    ///
    /// A malformed document yields an empty catalog instead of failing
    /// startup; a corrupt individual entry is skipped with a warning rather
    /// than aborting the whole load.
    pub fn from_document(document: &Value) -> Self {
        let document: CatalogDocument = match serde_json::from_value(document.clone()) {
            Ok(d) => d,
            Err(e) => {
                warn!("malformed catalog document, starting empty: {e}");
                return Self::default();
            }
        };

        Self {
            offers: decode_entries(document.offers, "offer"),
            segments: decode_entries(document.player_segments, "segment"),
            experiments: decode_entries(document.ab_tests, "experiment"),
        }
    }
}

fn decode_entries<T: for<'de> Deserialize<'de>>(entries: Vec<Value>, kind: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping corrupt {kind} entry: {e}");
                None
            }
        })
        .collect()
}
