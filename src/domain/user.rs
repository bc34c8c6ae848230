//! Bot users and their notification preferences.

use std::fmt;

use chrono::{DateTime, Utc};

use super::id::{CredentialId, TelegramId, UserId};

/// A chat identity known to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub telegram_id: TelegramId,
    pub credential_id: Option<CredentialId>,
    pub subscription_until: Option<DateTime<Utc>>,
    pub store_link: Option<String>,
    pub notify: NotificationSettings,
}

/// Per-user notification switches. New users receive everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub orders: bool,
    pub sales: bool,
    pub daily_report: bool,
    pub incomes: bool,
    pub cancellations: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            orders: true,
            sales: true,
            daily_report: true,
            incomes: true,
            cancellations: true,
        }
    }
}

/// A notification channel that users may switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Orders,
    Sales,
    DailyReport,
    Incomes,
    Cancellations,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::Orders,
        NotificationKind::Sales,
        NotificationKind::Incomes,
        NotificationKind::DailyReport,
        NotificationKind::Cancellations,
    ];

    /// Short key used in callback payloads (`toggle_<key>`).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Sales => "sales",
            Self::DailyReport => "daily_report",
            Self::Incomes => "incomes",
            Self::Cancellations => "cancel",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Orders => "Заказы",
            Self::Sales => "Выкупы",
            Self::DailyReport => "Ежедневный отчёт",
            Self::Incomes => "Поставки",
            Self::Cancellations => "Отмены",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl NotificationSettings {
    #[must_use]
    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Orders => self.orders,
            NotificationKind::Sales => self.sales,
            NotificationKind::DailyReport => self.daily_report,
            NotificationKind::Incomes => self.incomes,
            NotificationKind::Cancellations => self.cancellations,
        }
    }

    /// Flip a switch, returning its new value.
    pub fn toggle(&mut self, kind: NotificationKind) -> bool {
        let flag = match kind {
            NotificationKind::Orders => &mut self.orders,
            NotificationKind::Sales => &mut self.sales,
            NotificationKind::DailyReport => &mut self.daily_report,
            NotificationKind::Incomes => &mut self.incomes,
            NotificationKind::Cancellations => &mut self.cancellations,
        };
        *flag = !*flag;
        *flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let settings = NotificationSettings::default();
        assert!(NotificationKind::ALL
            .into_iter()
            .all(|kind| settings.is_enabled(kind)));
    }

    #[test]
    fn toggle_flips_only_target_flag() {
        let mut settings = NotificationSettings::default();
        assert!(!settings.toggle(NotificationKind::Sales));
        assert!(!settings.sales);
        assert!(settings.orders);
        assert!(settings.toggle(NotificationKind::Sales));
    }

    #[test]
    fn keys_round_trip() {
        for kind in NotificationKind::ALL {
            assert_eq!(NotificationKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(NotificationKind::from_key("positions"), None);
    }
}
