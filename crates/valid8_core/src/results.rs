//! Typed job result payload returned by the validation backend.
//!
//! Known fields are checked when the payload is parsed; keys this client
//! does not know about are kept in `extra` so a stored result can be shown
//! again exactly as the backend returned it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResults {
    #[serde(default)]
    pub cleaned_providers: Vec<CleanedProvider>,
    #[serde(default)]
    pub validated_providers: Vec<ValidatedProvider>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidationResults {
    /// Parses a raw `result` object, rejecting payloads whose known fields
    /// have the wrong shape.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Providers that passed validation without needing manual review.
    pub fn verified_count(&self) -> usize {
        self.validated_providers
            .iter()
            .filter(|p| !p.requires_manual_review)
            .count()
    }

    pub fn review_count(&self) -> usize {
        self.validated_providers.len() - self.verified_count()
    }
}

/// A provider row after AI cleaning and normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CleanedProvider {
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub npi_number: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    /// Per-field confidence, 0.0 to 1.0.
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
    #[serde(default)]
    pub ai_notes: Vec<String>,
    #[serde(default)]
    pub source_row: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Registry validation verdict for one provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidatedProvider {
    #[serde(default)]
    pub updated_fields: Map<String, Value>,
    #[serde(default)]
    pub discrepancies: Vec<String>,
    #[serde(default)]
    pub confidence_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub validation_notes: Vec<String>,
    #[serde(default)]
    pub requires_manual_review: bool,
}

impl ValidatedProvider {
    pub fn overall_confidence(&self) -> Option<f64> {
        self.confidence_scores.get("overall").copied()
    }
}
