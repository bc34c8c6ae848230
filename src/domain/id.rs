//! Domain identifier types.
//!
//! Store-assigned row ids and marketplace ids are all integers; the
//! newtypes keep a credential id from being passed where a user id is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

integer_id!(
    /// Row id of a stored marketplace API credential.
    CredentialId(i32)
);

integer_id!(
    /// Row id of a stored bot user.
    UserId(i32)
);

integer_id!(
    /// Local payment ledger id.
    PaymentId(i32)
);

integer_id!(
    /// Telegram chat identity. Private chats share the user's id.
    TelegramId(i64)
);

integer_id!(
    /// Marketplace catalog article (`nmId`).
    NmId(i64)
);

integer_id!(
    /// Marketplace warehouse id (`warehouseID`).
    WarehouseId(i64)
);

impl NmId {
    /// Public catalog page for this article.
    #[must_use]
    pub fn catalog_url(self) -> String {
        format!("https://www.wildberries.ru/catalog/{}/detail.aspx", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(CredentialId::new(7).to_string(), "7");
        assert_eq!(TelegramId::new(-100123).to_string(), "-100123");
    }

    #[test]
    fn nm_id_builds_catalog_url() {
        assert_eq!(
            NmId::new(123456).catalog_url(),
            "https://www.wildberries.ru/catalog/123456/detail.aspx"
        );
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&NmId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: WarehouseId = serde_json::from_str("507").unwrap();
        assert_eq!(back, WarehouseId::new(507));
    }
}
