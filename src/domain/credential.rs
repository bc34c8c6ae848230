//! Marketplace API credentials and subscription expiry arithmetic.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use super::id::CredentialId;
use super::role::Role;

/// Trial length granted when a credential is first submitted.
pub const TRIAL_DAYS: i64 = 30;

const MIN_CREDENTIAL_LEN: usize = 50;
const MIN_CREDENTIAL_DOTS: usize = 2;

/// A stored marketplace API credential ("token").
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: CredentialId,
    pub value: String,
    pub role: Role,
    pub subscription_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// True when the subscription ends within `window` from `now` and has
    /// not ended yet.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.subscription_until
            .is_some_and(|until| until > now && until <= now + window)
    }
}

// The raw value authorizes calls against the seller's account.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("value", &redact(&self.value))
            .field("role", &self.role)
            .field("subscription_until", &self.subscription_until)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Values for inserting a credential.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub value: String,
    pub role: Role,
    pub subscription_until: Option<DateTime<Utc>>,
}

impl NewCredential {
    /// A submitted seller credential on its trial.
    #[must_use]
    pub fn trial(value: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            role: Role::Test,
            subscription_until: Some(now + Duration::days(TRIAL_DAYS)),
        }
    }

    /// A placeholder minted for a user who pays before submitting a credential.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            value: uuid::Uuid::new_v4().simple().to_string(),
            role: Role::Free,
            subscription_until: None,
        }
    }
}

/// Why a submitted credential string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialRejection {
    TooShort,
    NotDotted,
}

impl fmt::Display for CredentialRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "token is shorter than {MIN_CREDENTIAL_LEN} characters"),
            Self::NotDotted => write!(f, "token does not look like a JWT"),
        }
    }
}

/// Cheap shape check for a seller API token (a JWT).
pub fn validate_credential_value(value: &str) -> Result<&str, CredentialRejection> {
    let value = value.trim();
    if value.matches('.').count() < MIN_CREDENTIAL_DOTS {
        return Err(CredentialRejection::NotDotted);
    }
    if value.len() < MIN_CREDENTIAL_LEN {
        return Err(CredentialRejection::TooShort);
    }
    Ok(value)
}

/// New expiry after adding `days`: stacks onto a future expiry, else starts now.
#[must_use]
pub fn extended_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    days: i64,
) -> DateTime<Utc> {
    let start = match current {
        Some(until) if until > now => until,
        _ => now,
    };
    start + Duration::days(days)
}

/// Mask a secret for logs, keeping a short prefix.
#[must_use]
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(6).collect();
    format!("{prefix}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_like() -> String {
        format!("{}.{}.{}", "a".repeat(20), "b".repeat(20), "c".repeat(20))
    }

    #[test]
    fn accepts_jwt_shaped_value() {
        let value = jwt_like();
        assert_eq!(validate_credential_value(&value), Ok(value.as_str()));
    }

    #[test]
    fn rejects_short_or_undotted_values() {
        assert_eq!(
            validate_credential_value("abc.def.ghi"),
            Err(CredentialRejection::TooShort)
        );
        assert_eq!(
            validate_credential_value(&"x".repeat(80)),
            Err(CredentialRejection::NotDotted)
        );
    }

    #[test]
    fn expiry_stacks_onto_future_subscription() {
        let now = Utc::now();
        let current = now + Duration::days(10);
        let until = extended_expiry(Some(current), now, 30);
        assert_eq!(until - now, Duration::days(40));
    }

    #[test]
    fn expiry_restarts_from_now_when_lapsed() {
        let now = Utc::now();
        let until = extended_expiry(Some(now - Duration::days(5)), now, 30);
        assert_eq!(until - now, Duration::days(30));
        assert_eq!(extended_expiry(None, now, 30) - now, Duration::days(30));
    }

    #[test]
    fn expires_within_window_excludes_lapsed() {
        let now = Utc::now();
        let mut credential = Credential {
            id: CredentialId::new(1),
            value: jwt_like(),
            role: Role::Base,
            subscription_until: Some(now + Duration::days(2)),
            is_active: true,
            created_at: now,
        };
        assert!(credential.expires_within(now, Duration::days(3)));

        credential.subscription_until = Some(now - Duration::hours(1));
        assert!(!credential.expires_within(now, Duration::days(3)));

        credential.subscription_until = Some(now + Duration::days(5));
        assert!(!credential.expires_within(now, Duration::days(3)));
    }

    #[test]
    fn debug_output_redacts_value() {
        let credential = Credential {
            id: CredentialId::new(1),
            value: jwt_like(),
            role: Role::Free,
            subscription_until: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let debug = format!("{credential:?}");
        assert!(!debug.contains(&jwt_like()));
    }

    #[test]
    fn trial_credential_is_test_role() {
        let now = Utc::now();
        let new = NewCredential::trial("abc", now);
        assert_eq!(new.role, Role::Test);
        assert_eq!(new.subscription_until, Some(now + Duration::days(30)));
    }
}
