//! Evidence snapshot: the immutable bundle of raw documents one run is judged on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{SubjectId, Timestamp, TypesError, VerificationId};

/// Well-known document names inside a snapshot.
pub mod doc {
    pub const PROFILE: &str = "profile";
    pub const INQUIRY_REFERENCE: &str = "inquiry_reference";
    pub const FRAUD_SIGNALS: &str = "fraud_signals";
    pub const ID_CHECK: &str = "id_check";
    pub const BANKING_HISTORY: &str = "banking_history";
    pub const LOGIN_HISTORY: &str = "login_history";
    pub const BUSINESS: &str = "business";
    pub const BENEFICIAL_OWNERS: &str = "beneficial_owners";
    pub const ADDITIONAL_DATA: &str = "additional_data";
}

/// A beneficial owner of a business, pointing at the owner's personal data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeneficialOwner {
    pub owner_id: SubjectId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ownership_percentage: Option<f64>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Raw evidence for one verification. Exactly one per run; never mutated once stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub verification_id: VerificationId,
    pub collected_at: Timestamp,
    #[serde(default)]
    pub documents: BTreeMap<String, serde_json::Value>,
}

impl EvidenceSnapshot {
    pub fn new(verification_id: VerificationId, collected_at: Timestamp) -> Self {
        Self {
            verification_id,
            collected_at,
            documents: BTreeMap::new(),
        }
    }

    /// Builder-style insert used while the snapshot is being assembled.
    pub fn with(mut self, name: &str, value: serde_json::Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: serde_json::Value) {
        self.documents.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.documents.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// Decode the beneficial owner list. An absent document means zero owners.
    pub fn beneficial_owners(&self) -> Result<Vec<BeneficialOwner>, TypesError> {
        match self.get(doc::BENEFICIAL_OWNERS) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                TypesError::MalformedDocument {
                    name: doc::BENEFICIAL_OWNERS.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_owner_list_is_empty() {
        let snap = EvidenceSnapshot::new(VerificationId::generate(), Timestamp::EPOCH);
        assert!(snap.beneficial_owners().unwrap().is_empty());
    }

    #[test]
    fn owners_decode_with_optional_fields() {
        let snap = EvidenceSnapshot::new(VerificationId::generate(), Timestamp::EPOCH).with(
            doc::BENEFICIAL_OWNERS,
            json!([
                {"owner_id": "P1", "ownership_percentage": 60.0, "role": "director"},
                {"owner_id": "P2"}
            ]),
        );
        let owners = snap.beneficial_owners().unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].role.as_deref(), Some("director"));
        assert!(owners[1].name.is_none());
    }

    #[test]
    fn malformed_owner_list_is_reported() {
        let snap = EvidenceSnapshot::new(VerificationId::generate(), Timestamp::EPOCH)
            .with(doc::BENEFICIAL_OWNERS, json!({"not": "a list"}));
        assert!(matches!(
            snap.beneficial_owners(),
            Err(TypesError::MalformedDocument { .. })
        ));
    }
}
