//! Value types exchanged with the server.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// A non-negative decimal amount, kept as the exact string the server uses.
///
/// Amounts are never parsed into floating point on the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(String);

impl Amount {
    /// Validates a decimal string such as `"10"` or `"10.00"`.
    pub fn new(raw: impl Into<String>) -> ProtocolResult<Self> {
        let raw = raw.into();
        let (int, frac) = match raw.split_once('.') {
            Some((int, frac)) => (int, Some(frac)),
            None => (raw.as_str(), None),
        };
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(int) || frac.is_some_and(|f| !digits(f)) {
            return Err(ProtocolError::InvalidAmount(raw));
        }
        Ok(Self(raw))
    }

    /// The decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if every digit is zero.
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0' || b == b'.')
    }
}

impl TryFrom<String> for Amount {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Side of the ledger an account normally carries its balance on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Assets and expenses.
    Debit,
    /// Liabilities, equity and income.
    Credit,
}

impl NormalBalance {
    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalBalance::Debit => "debit",
            NormalBalance::Credit => "credit",
        }
    }

    /// Parses the wire spelling.
    pub fn parse(raw: &str) -> ProtocolResult<Self> {
        match raw {
            "debit" => Ok(NormalBalance::Debit),
            "credit" => Ok(NormalBalance::Credit),
            other => Err(ProtocolError::invalid_field(
                "normal_balance",
                format!("expected debit or credit, got `{other}`"),
            )),
        }
    }
}

impl fmt::Display for NormalBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a single journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSide {
    /// Debit line.
    Debit,
    /// Credit line.
    Credit,
}

impl LineSide {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineSide::Debit => "debit",
            LineSide::Credit => "credit",
        }
    }
}

/// Value of a journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineValue {
    /// Debit or credit.
    #[serde(rename = "type")]
    pub side: LineSide,
    /// Amount moved.
    pub amount: Amount,
}

/// One line of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Account the line posts to.
    #[serde(rename = "account")]
    pub account_id: String,
    /// Side and amount.
    pub value: LineValue,
}

impl Line {
    /// A debit line.
    pub fn debit(account_id: impl Into<String>, amount: Amount) -> Self {
        Self::new(account_id, LineSide::Debit, amount)
    }

    /// A credit line.
    pub fn credit(account_id: impl Into<String>, amount: Amount) -> Self {
        Self::new(account_id, LineSide::Credit, amount)
    }

    /// The line as it appears in request and response bodies.
    pub fn to_json(&self) -> Value {
        json!({
            "account": self.account_id,
            "value": {"type": self.value.side.as_str(), "amount": self.value.amount.as_str()},
        })
    }

    fn new(account_id: impl Into<String>, side: LineSide, amount: Amount) -> Self {
        Self {
            account_id: account_id.into(),
            value: LineValue { side, amount },
        }
    }
}

/// Type of a reported balance value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Net debit.
    Debit,
    /// Net credit.
    Credit,
    /// Nothing posted, or fully offset.
    Zero,
}

/// A typed amount as reported in balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceValue {
    /// Debit, credit or zero.
    #[serde(rename = "type")]
    pub kind: ValueType,
    /// Magnitude.
    pub amount: Amount,
}

/// Balance of an account at an instant, as computed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Sum of debit lines.
    pub debit_value: BalanceValue,
    /// Sum of credit lines.
    pub credit_value: BalanceValue,
    /// Net value.
    pub value: BalanceValue,
}

/// An API identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity id.
    pub id: String,
    /// Contact email.
    pub email: String,
    /// Display string.
    pub description: String,
    /// External reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Optimistic-concurrency version.
    pub version: u64,
}

/// An API key belonging to an identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Key id, used as the Basic-auth user name.
    pub id: String,
    /// Owning identity id.
    pub identity: String,
    /// Key secret, used as the Basic-auth password.
    pub secret: String,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Formats an instant the way the server expects (`2024-01-31T12:00:00Z`).
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 instant.
pub fn parse_timestamp(field: &'static str, raw: &str) -> ProtocolResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| ProtocolError::invalid_field(field, e.to_string()))
}
