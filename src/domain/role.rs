//! Subscription roles and the capability table every gated path reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription tier attached to a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Free,
    Base,
    Advanced,
    /// Trial granted on first credential submission.
    Test,
    /// Full access; bypasses every allow-list.
    Super,
}

/// Report history depths offered in the bot menus.
pub const HISTORY_PRESETS: [u32; 3] = [7, 30, 90];

const SHORT_HISTORY: &[u32] = &[7];
const FULL_HISTORY: &[u32] = &HISTORY_PRESETS;

/// Limits derived from a role.
///
/// `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// History depths (days) the role may request. `None` allows any depth.
    pub history_days: Option<&'static [u32]>,
    /// Warehouses the user may subscribe to for free-acceptance alerts.
    pub max_warehouses: Option<usize>,
    /// Cities available to position search.
    pub max_cities: Option<usize>,
}

impl Capabilities {
    #[must_use]
    pub fn allows_history(&self, days: u32) -> bool {
        self.history_days.map_or(true, |allowed| allowed.contains(&days))
    }

    #[must_use]
    pub fn allows_another_warehouse(&self, current: usize) -> bool {
        self.max_warehouses.map_or(true, |max| current < max)
    }
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Free,
        Role::Base,
        Role::Advanced,
        Role::Test,
        Role::Super,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Free => "free",
            Role::Base => "base",
            Role::Advanced => "advanced",
            Role::Test => "test",
            Role::Super => "super",
        }
    }

    /// Decode a stored role, falling back to `free` for anything unknown.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Role::Free => Capabilities {
                history_days: Some(&[]),
                max_warehouses: Some(1),
                max_cities: Some(1),
            },
            Role::Base => Capabilities {
                history_days: Some(SHORT_HISTORY),
                max_warehouses: Some(3),
                max_cities: None,
            },
            Role::Advanced | Role::Test => Capabilities {
                history_days: Some(FULL_HISTORY),
                max_warehouses: Some(9),
                max_cities: None,
            },
            Role::Super => Capabilities {
                history_days: None,
                max_warehouses: None,
                max_cities: None,
            },
        }
    }

    /// True when this role passes an allow-list. `super` always passes.
    #[must_use]
    pub fn is_allowed(self, allowed: &[Role]) -> bool {
        self == Role::Super || allowed.contains(&self)
    }
}

/// Roles permitted to request a report covering `days` of history.
#[must_use]
pub fn allowed_roles_for_history(days: u32) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|role| role.capabilities().allows_history(days))
        .collect()
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Role::Free),
            "base" => Ok(Role::Base),
            "advanced" => Ok(Role::Advanced),
            "test" => Ok(Role::Test),
            "super" => Ok(Role::Super),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------------

    #[test]
    fn parses_known_roles_case_insensitively() {
        assert_eq!("Advanced".parse::<Role>(), Ok(Role::Advanced));
        assert_eq!(" super ".parse::<Role>(), Ok(Role::Super));
        assert!("premium".parse::<Role>().is_err());
    }

    #[test]
    fn stored_role_defaults_to_free() {
        assert_eq!(Role::from_stored(None), Role::Free);
        assert_eq!(Role::from_stored(Some("enterprise")), Role::Free);
        assert_eq!(Role::from_stored(Some("base")), Role::Base);
    }

    // ------------------------------------------------------------------------
    // Capability table
    // ------------------------------------------------------------------------

    #[test]
    fn history_allow_lists_match_presets() {
        assert_eq!(
            allowed_roles_for_history(7),
            vec![Role::Base, Role::Advanced, Role::Test, Role::Super]
        );
        assert_eq!(
            allowed_roles_for_history(30),
            vec![Role::Advanced, Role::Test, Role::Super]
        );
        assert_eq!(
            allowed_roles_for_history(90),
            vec![Role::Advanced, Role::Test, Role::Super]
        );
        assert_eq!(allowed_roles_for_history(14), vec![Role::Super]);
    }

    #[test]
    fn warehouse_limits_per_role() {
        assert_eq!(Role::Free.capabilities().max_warehouses, Some(1));
        assert_eq!(Role::Base.capabilities().max_warehouses, Some(3));
        assert_eq!(Role::Test.capabilities().max_warehouses, Some(9));
        assert_eq!(Role::Advanced.capabilities().max_warehouses, Some(9));
        assert_eq!(Role::Super.capabilities().max_warehouses, None);
    }

    #[test]
    fn free_role_gets_one_city() {
        assert_eq!(Role::Free.capabilities().max_cities, Some(1));
        assert_eq!(Role::Base.capabilities().max_cities, None);
    }

    #[test]
    fn super_passes_any_allow_list() {
        assert!(Role::Super.is_allowed(&[]));
        assert!(Role::Base.is_allowed(&[Role::Base]));
        assert!(!Role::Free.is_allowed(&[Role::Base, Role::Advanced]));
    }

    #[test]
    fn warehouse_capacity_check() {
        let caps = Role::Base.capabilities();
        assert!(caps.allows_another_warehouse(2));
        assert!(!caps.allows_another_warehouse(3));
        assert!(Role::Super.capabilities().allows_another_warehouse(1000));
    }
}
