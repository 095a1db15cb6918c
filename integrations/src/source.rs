//! Read-only external data source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use veriflow_types::SubjectId;

use crate::ExternalError;

/// Categories of record the data source can be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    Profile,
    InquiryReference,
    FraudSignals,
    BankingHistory,
    LoginHistory,
    Business,
    BeneficialOwners,
}

impl RecordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::InquiryReference => "inquiry_reference",
            Self::FraudSignals => "fraud_signals",
            Self::BankingHistory => "banking_history",
            Self::LoginHistory => "login_history",
            Self::Business => "business",
            Self::BeneficialOwners => "beneficial_owners",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external source of subject data. Never written to.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Look up one category of record for a subject. `Ok(None)` means the source
    /// answered and holds no such record.
    async fn lookup(
        &self,
        subject: &SubjectId,
        category: RecordCategory,
    ) -> Result<Option<serde_json::Value>, ExternalError>;
}
