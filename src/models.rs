use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Institution block inside a raw account payload.
#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct RawInstitution {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Account payload as returned by the bank API. The remote `id` changes on
/// re-enrollment; local identity comes from the fingerprint instead.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAccount {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub institution: RawInstitution,
    #[serde(default)]
    pub last_four: String,
}

/// Transaction payload as returned by the bank API.
#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub id: String,
    pub account_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub description: String,
    pub status: String,
    #[serde(rename = "type")]
    pub txn_type: String,
    #[serde(default)]
    pub running_balance: Option<f64>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub fingerprint: String,
    pub institution_id: String,
    pub account_type: String,
    pub last_four: String,
    pub display_name: String,
}

/// Uncategorized transaction joined with account context; serialized into
/// the categorization prompt.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub account_name: String,
    pub account_type: String,
    pub account_last_four: String,
}

/// One categorization returned by the service (or synthesized as a fallback).
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryAssignment {
    pub transaction_id: String,
    pub category: String,
    pub confidence: f64,
}
