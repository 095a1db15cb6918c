//! Evidence acquisition: one read-only pass over the data source per run.
//!
//! Mandatory records abort the run when missing or unreachable. Optional records
//! are best effort: any failure is logged and the document is simply left out,
//! which the agents read as "no signal".

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn, Instrument};

use veriflow_integrations::{ExternalError, Integrations, RecordCategory, RetryPolicy};
use veriflow_types::evidence::doc;
use veriflow_types::{
    BeneficialOwner, Clock, EvidenceSnapshot, SubjectId, VerificationRequest, VerificationType,
};

use crate::tracing_spans;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Transient failures outlasted the retry budget.
    #[error("data source unavailable while fetching {category}: {source}")]
    Unavailable {
        category: &'static str,
        #[source]
        source: ExternalError,
    },

    /// A mandatory record does not exist.
    #[error("mandatory record {0} not found")]
    NotFound(&'static str),

    /// The source refused the request outright.
    #[error("data source rejected {category}: {source}")]
    Rejected {
        category: &'static str,
        #[source]
        source: ExternalError,
    },

    #[error("malformed {document}: {reason}")]
    Malformed { document: &'static str, reason: String },
}

impl AcquisitionError {
    /// Machine-readable failure reason written to the request.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "acquisition_unavailable",
            Self::NotFound(_) => "acquisition_not_found",
            Self::Rejected { .. } | Self::Malformed { .. } => "acquisition_rejected",
        }
    }

    fn from_external(category: RecordCategory, e: ExternalError) -> Self {
        match e {
            ExternalError::NotFound(_) => Self::NotFound(category.as_str()),
            e if e.is_transient() => Self::Unavailable {
                category: category.as_str(),
                source: e,
            },
            e => Self::Rejected {
                category: category.as_str(),
                source: e,
            },
        }
    }
}

/// Builds the evidence snapshot for one request.
pub struct Acquirer {
    integrations: Arc<Integrations>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Acquirer {
    pub fn new(integrations: Arc<Integrations>, retry: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            integrations,
            retry,
            clock,
        }
    }

    pub async fn acquire(
        &self,
        request: &VerificationRequest,
    ) -> Result<EvidenceSnapshot, AcquisitionError> {
        let span = tracing_spans::acquisition_span(request.subject_id.as_str());
        async {
            let mut snapshot = EvidenceSnapshot::new(request.id.clone(), self.clock.now());
            match request.verification_type {
                VerificationType::Kyc => self.acquire_kyc(&request.subject_id, &mut snapshot).await?,
                VerificationType::Kyb => self.acquire_kyb(&request.subject_id, &mut snapshot).await?,
            }
            if !request.additional_data.is_empty() {
                let data = serde_json::to_value(&request.additional_data).map_err(|e| {
                    AcquisitionError::Malformed {
                        document: doc::ADDITIONAL_DATA,
                        reason: e.to_string(),
                    }
                })?;
                snapshot.insert(doc::ADDITIONAL_DATA, data);
            }
            debug!(documents = snapshot.documents.len(), "evidence acquired");
            Ok(snapshot)
        }
        .instrument(span)
        .await
    }

    async fn fetch(
        &self,
        subject: &SubjectId,
        category: RecordCategory,
    ) -> Result<Option<Value>, ExternalError> {
        let source = &self.integrations.data_source;
        self.retry
            .run(category.as_str(), || source.lookup(subject, category))
            .await
    }

    async fn mandatory(
        &self,
        subject: &SubjectId,
        category: RecordCategory,
    ) -> Result<Value, AcquisitionError> {
        self.fetch(subject, category)
            .await
            .map_err(|e| AcquisitionError::from_external(category, e))?
            .ok_or(AcquisitionError::NotFound(category.as_str()))
    }

    async fn optional(&self, subject: &SubjectId, category: RecordCategory) -> Option<Value> {
        match self.fetch(subject, category).await {
            Ok(found) => found,
            Err(e) => {
                warn!(%subject, category = category.as_str(), error = %e, "optional evidence unavailable");
                None
            }
        }
    }

    async fn acquire_kyc(
        &self,
        subject: &SubjectId,
        snapshot: &mut EvidenceSnapshot,
    ) -> Result<(), AcquisitionError> {
        let profile = self.mandatory(subject, RecordCategory::Profile).await?;
        snapshot.insert(doc::PROFILE, profile);

        let optional = [
            (RecordCategory::FraudSignals, doc::FRAUD_SIGNALS),
            (RecordCategory::BankingHistory, doc::BANKING_HISTORY),
            (RecordCategory::LoginHistory, doc::LOGIN_HISTORY),
        ];
        for (category, name) in optional {
            if let Some(value) = self.optional(subject, category).await {
                snapshot.insert(name, value);
            }
        }

        let reference = self
            .optional(subject, RecordCategory::InquiryReference)
            .await
            .and_then(|v| inquiry_reference(&v));
        if let Some(reference) = reference {
            snapshot.insert(doc::INQUIRY_REFERENCE, Value::String(reference.clone()));
            let identity = &self.integrations.identity;
            let signals = self
                .retry
                .run("id_check", || identity.check_id(&reference))
                .await;
            match signals.map(serde_json::to_value) {
                Ok(Ok(value)) => snapshot.insert(doc::ID_CHECK, value),
                Ok(Err(e)) => warn!(%subject, error = %e, "identity signals not encodable"),
                Err(e) => warn!(%subject, %reference, error = %e, "identity signals unavailable"),
            }
        }
        Ok(())
    }

    async fn acquire_kyb(
        &self,
        subject: &SubjectId,
        snapshot: &mut EvidenceSnapshot,
    ) -> Result<(), AcquisitionError> {
        let business = self.mandatory(subject, RecordCategory::Business).await?;
        snapshot.insert(doc::BUSINESS, business);

        // An absent list means no owners; an unreachable one aborts.
        let raw = self
            .fetch(subject, RecordCategory::BeneficialOwners)
            .await
            .or_else(|e| match e {
                ExternalError::NotFound(_) => Ok(None),
                e => Err(AcquisitionError::from_external(RecordCategory::BeneficialOwners, e)),
            })?
            .unwrap_or(Value::Array(Vec::new()));
        let owners = pointed_owners(subject, raw)?;
        let value = serde_json::to_value(&owners).map_err(|e| AcquisitionError::Malformed {
            document: doc::BENEFICIAL_OWNERS,
            reason: e.to_string(),
        })?;
        snapshot.insert(doc::BENEFICIAL_OWNERS, value);
        Ok(())
    }
}

/// The inquiry reference may come as a bare string or as `{"reference": ...}`.
fn inquiry_reference(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("reference").and_then(Value::as_str),
        _ => None,
    }?;
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Keep only owners that point at personal data.
fn pointed_owners(business: &SubjectId, raw: Value) -> Result<Vec<BeneficialOwner>, AcquisitionError> {
    let Value::Array(entries) = raw else {
        return Err(AcquisitionError::Malformed {
            document: doc::BENEFICIAL_OWNERS,
            reason: "expected a list".into(),
        });
    };
    let mut owners = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<BeneficialOwner>(entry) {
            Ok(owner) if owner.owner_id.is_valid() => owners.push(owner),
            Ok(owner) => {
                warn!(%business, owner = ?owner.name, "owner has no personal data pointer, skipping");
            }
            Err(e) => {
                warn!(%business, error = %e, "owner has no personal data pointer, skipping");
            }
        }
    }
    Ok(owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use veriflow_nullables::{fixtures, NullClock, NullCollaborators};
    use veriflow_types::{AdditionalData, Timestamp};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    fn acquirer(nulls: &NullCollaborators) -> Acquirer {
        Acquirer::new(
            Arc::new(nulls.integrations()),
            fast_retry(),
            Arc::new(NullClock::new(fixtures::AS_OF)),
        )
    }

    fn request(vt: VerificationType, subject: &str) -> VerificationRequest {
        VerificationRequest::new(vt, SubjectId::new(subject), AdditionalData::new(), Timestamp::EPOCH)
    }

    #[tokio::test]
    async fn kyc_collects_every_document() {
        let nulls = NullCollaborators::new();
        nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
        let snap = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "U1"))
            .await
            .unwrap();
        for name in [
            doc::PROFILE,
            doc::INQUIRY_REFERENCE,
            doc::ID_CHECK,
            doc::FRAUD_SIGNALS,
            doc::BANKING_HISTORY,
            doc::LOGIN_HISTORY,
        ] {
            assert!(snap.has(name), "missing {name}");
        }
        assert_eq!(snap.collected_at, Timestamp::new(fixtures::AS_OF));
    }

    #[tokio::test]
    async fn no_inquiry_means_no_id_check() {
        let nulls = NullCollaborators::new();
        nulls
            .data_source
            .insert("U2", RecordCategory::Profile, fixtures::kyc_profile("Al"));
        let snap = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "U2"))
            .await
            .unwrap();
        assert!(snap.has(doc::PROFILE));
        assert!(!snap.has(doc::ID_CHECK));
        assert!(!snap.has(doc::BANKING_HISTORY));
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let nulls = NullCollaborators::new();
        let err = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "nobody"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "acquisition_not_found");
    }

    #[tokio::test]
    async fn outage_exhausts_retries() {
        let nulls = NullCollaborators::new();
        nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
        nulls.data_source.set_outage(true);
        let err = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "U1"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "acquisition_unavailable");
        assert_eq!(nulls.data_source.calls(), 3);
    }

    #[tokio::test]
    async fn transient_hiccup_is_retried() {
        let nulls = NullCollaborators::new();
        nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
        nulls.data_source.fail_next(2);
        let snap = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "U1"))
            .await
            .unwrap();
        assert!(snap.has(doc::PROFILE));
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let nulls = NullCollaborators::new();
        nulls.data_source.fail(
            "U1",
            RecordCategory::Profile,
            ExternalError::Permanent("forbidden".into()),
        );
        let err = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "U1"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "acquisition_rejected");
        assert_eq!(nulls.data_source.calls(), 1);
    }

    #[tokio::test]
    async fn broken_optional_record_degrades() {
        let nulls = NullCollaborators::new();
        nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
        nulls.data_source.fail(
            "U1",
            RecordCategory::BankingHistory,
            ExternalError::Permanent("bad request".into()),
        );
        let snap = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyc, "U1"))
            .await
            .unwrap();
        assert!(!snap.has(doc::BANKING_HISTORY));
        assert!(snap.has(doc::LOGIN_HISTORY));
    }

    #[tokio::test]
    async fn kyb_keeps_only_pointed_owners() {
        let nulls = NullCollaborators::new();
        nulls.business("B1", fixtures::DEFAULT_BUSINESS, &["P1"]);
        nulls.data_source.insert(
            "B1",
            RecordCategory::BeneficialOwners,
            json!([{"owner_id": "P1", "role": "director"}, {"name": "No Pointer"}, {"owner_id": ""}]),
        );
        let snap = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyb, "B1"))
            .await
            .unwrap();
        let owners = snap.beneficial_owners().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].owner_id.as_str(), "P1");
    }

    #[tokio::test]
    async fn kyb_without_owner_list_has_zero_owners() {
        let nulls = NullCollaborators::new();
        nulls
            .data_source
            .insert("B2", RecordCategory::Business, fixtures::business("Solo LLC"));
        let snap = acquirer(&nulls)
            .acquire(&request(VerificationType::Kyb, "B2"))
            .await
            .unwrap();
        assert!(snap.beneficial_owners().unwrap().is_empty());
    }

    #[tokio::test]
    async fn additional_data_is_recorded_verbatim() {
        let nulls = NullCollaborators::new();
        nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
        let mut data = AdditionalData::new();
        data.insert("channel".into(), json!("mobile"));
        let req = VerificationRequest::new(
            VerificationType::Kyc,
            SubjectId::new("U1"),
            data,
            Timestamp::EPOCH,
        );
        let snap = acquirer(&nulls).acquire(&req).await.unwrap();
        assert_eq!(snap.get(doc::ADDITIONAL_DATA), Some(&json!({"channel": "mobile"})));
    }

    #[test]
    fn inquiry_reference_shapes() {
        assert_eq!(inquiry_reference(&json!("inq-1")), Some("inq-1".into()));
        assert_eq!(
            inquiry_reference(&json!({"reference": "inq-2"})),
            Some("inq-2".into())
        );
        assert_eq!(inquiry_reference(&json!("  ")), None);
        assert_eq!(inquiry_reference(&json!(42)), None);
    }
}
