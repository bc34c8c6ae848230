//! Inline-button payloads.
//!
//! Every button carries a short string; it is decoded once into a
//! [`CallbackAction`] and never matched as a string further in.

use std::fmt;
use std::str::FromStr;

use crate::domain::{NotificationKind, PaymentId, WarehouseId};

/// Telegram caps callback data at 64 bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Order summary; `None` asks for the period.
    Orders { days: Option<u32> },
    MyProducts { days: Option<u32> },
    Help,
    Cabinet,
    Settings,
    NotificationMenu,
    Toggle(NotificationKind),
    WarehouseMenu { page: usize },
    AddWarehouse(WarehouseId),
    RemoveWarehouse(WarehouseId),
    AddBoxType(String),
    RemoveBoxType(String),
    Tariffs,
    Pay { tariff: String },
    CheckPayment(PaymentId),
    IsSafe,
    ReplaceToken,
    ReplaceTokenCancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallback(pub String);

impl fmt::Display for UnknownCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown callback `{}`", self.0)
    }
}

impl std::error::Error for UnknownCallback {}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(data.to_string());

        let action = match data {
            "orders" => Self::Orders { days: None },
            "my_products" => Self::MyProducts { days: None },
            "help" => Self::Help,
            "cabinet" => Self::Cabinet,
            "settings" => Self::Settings,
            "notif_menu" => Self::NotificationMenu,
            "track_free_accept_menu" => Self::WarehouseMenu { page: 0 },
            "tariffs" => Self::Tariffs,
            "is_safe" => Self::IsSafe,
            "replace_token" => Self::ReplaceToken,
            "replace_token_cancel" => Self::ReplaceTokenCancel,
            _ => {
                if let Some(days) = data.strip_prefix("orders ") {
                    Self::Orders {
                        days: Some(days.parse().map_err(|_| unknown())?),
                    }
                } else if let Some(days) = data.strip_prefix("my_products_") {
                    Self::MyProducts {
                        days: Some(days.parse().map_err(|_| unknown())?),
                    }
                } else if let Some(key) = data.strip_prefix("toggle_") {
                    Self::Toggle(NotificationKind::from_key(key).ok_or_else(unknown)?)
                } else if let Some(page) = data.strip_prefix("wh_page_") {
                    Self::WarehouseMenu {
                        page: page.parse().map_err(|_| unknown())?,
                    }
                } else if let Some(id) = data.strip_prefix("add_wh_") {
                    Self::AddWarehouse(WarehouseId::new(id.parse().map_err(|_| unknown())?))
                } else if let Some(id) = data.strip_prefix("del_wh_") {
                    Self::RemoveWarehouse(WarehouseId::new(id.parse().map_err(|_| unknown())?))
                } else if let Some(name) = data.strip_prefix("add_box_") {
                    Self::AddBoxType(non_empty(name).ok_or_else(unknown)?)
                } else if let Some(name) = data.strip_prefix("del_box_") {
                    Self::RemoveBoxType(non_empty(name).ok_or_else(unknown)?)
                } else if let Some(id) = data.strip_prefix("checkpay_") {
                    Self::CheckPayment(PaymentId::new(id.parse().map_err(|_| unknown())?))
                } else if let Some(tariff) = data.strip_prefix("pay_") {
                    Self::Pay {
                        tariff: non_empty(tariff).ok_or_else(unknown)?,
                    }
                } else {
                    return Err(unknown());
                }
            }
        };
        Ok(action)
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orders { days: None } => f.write_str("orders"),
            Self::Orders { days: Some(days) } => write!(f, "orders {days}"),
            Self::MyProducts { days: None } => f.write_str("my_products"),
            Self::MyProducts { days: Some(days) } => write!(f, "my_products_{days}"),
            Self::Help => f.write_str("help"),
            Self::Cabinet => f.write_str("cabinet"),
            Self::Settings => f.write_str("settings"),
            Self::NotificationMenu => f.write_str("notif_menu"),
            Self::Toggle(kind) => write!(f, "toggle_{}", kind.key()),
            Self::WarehouseMenu { page: 0 } => f.write_str("track_free_accept_menu"),
            Self::WarehouseMenu { page } => write!(f, "wh_page_{page}"),
            Self::AddWarehouse(id) => write!(f, "add_wh_{id}"),
            Self::RemoveWarehouse(id) => write!(f, "del_wh_{id}"),
            Self::AddBoxType(name) => write!(f, "add_box_{name}"),
            Self::RemoveBoxType(name) => write!(f, "del_box_{name}"),
            Self::Tariffs => f.write_str("tariffs"),
            Self::Pay { tariff } => write!(f, "pay_{tariff}"),
            Self::CheckPayment(id) => write!(f, "checkpay_{id}"),
            Self::IsSafe => f.write_str("is_safe"),
            Self::ReplaceToken => f.write_str("replace_token"),
            Self::ReplaceTokenCancel => f.write_str("replace_token_cancel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_existing_button_payloads() {
        assert_eq!(
            "orders 30".parse(),
            Ok(CallbackAction::Orders { days: Some(30) })
        );
        assert_eq!(
            "my_products_90".parse(),
            Ok(CallbackAction::MyProducts { days: Some(90) })
        );
        assert_eq!(
            "toggle_cancel".parse(),
            Ok(CallbackAction::Toggle(NotificationKind::Cancellations))
        );
        assert_eq!(
            "add_wh_507".parse(),
            Ok(CallbackAction::AddWarehouse(WarehouseId::new(507)))
        );
        assert_eq!(
            "checkpay_12".parse(),
            Ok(CallbackAction::CheckPayment(PaymentId::new(12)))
        );
        assert_eq!(
            "pay_advanced".parse(),
            Ok(CallbackAction::Pay {
                tariff: "advanced".into()
            })
        );
        assert_eq!(
            "track_free_accept_menu".parse(),
            Ok(CallbackAction::WarehouseMenu { page: 0 })
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        for data in ["", "orders week", "toggle_positions", "add_wh_x", "pay_", "del_box_", "pos_menu"] {
            assert!(data.parse::<CallbackAction>().is_err(), "{data}");
        }
    }

    #[test]
    fn encoding_round_trips_and_fits_telegram_limit() {
        let actions = [
            CallbackAction::Orders { days: None },
            CallbackAction::Orders { days: Some(7) },
            CallbackAction::MyProducts { days: Some(30) },
            CallbackAction::Toggle(NotificationKind::DailyReport),
            CallbackAction::WarehouseMenu { page: 3 },
            CallbackAction::RemoveWarehouse(WarehouseId::new(120_762)),
            CallbackAction::AddBoxType("Монопаллеты".into()),
            CallbackAction::CheckPayment(PaymentId::new(99_999)),
            CallbackAction::ReplaceTokenCancel,
        ];
        for action in actions {
            let data = action.to_string();
            assert!(data.len() <= MAX_CALLBACK_BYTES, "{data}");
            assert_eq!(data.parse::<CallbackAction>(), Ok(action));
        }
    }
}
