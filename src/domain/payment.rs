//! Local payment ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{CredentialId, PaymentId, UserId};
use super::role::Role;

/// Provider-side lifecycle of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::WaitingForCapture => "waiting_for_capture",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "waiting_for_capture" => Ok(Self::WaitingForCapture),
            "succeeded" => Ok(Self::Succeeded),
            "canceled" => Ok(Self::Canceled),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// A payment recorded before redirecting the user to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub credential_id: CredentialId,
    pub tariff: String,
    pub amount: Decimal,
    pub currency: String,
    pub provider_payment_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a pending payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: UserId,
    pub credential_id: CredentialId,
    pub tariff: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Result of starting a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub ok: bool,
    pub message: String,
    pub confirmation_url: Option<String>,
    pub payment_id: Option<PaymentId>,
}

impl PaymentOutcome {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            confirmation_url: None,
            payment_id: None,
        }
    }
}

/// Result of polling a payment and applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationOutcome {
    pub ok: bool,
    pub status: Option<PaymentStatus>,
    pub message: String,
    pub role: Option<Role>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl ActivationOutcome {
    #[must_use]
    pub fn failed(status: Option<PaymentStatus>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            message: message.into(),
            role: None,
            valid_until: None,
        }
    }
}
