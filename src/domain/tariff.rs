//! Paid plans.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::role::Role;

/// A purchasable subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tariff {
    pub code: &'static str,
    pub title: &'static str,
    pub amount: Decimal,
    pub currency: &'static str,
    pub days: i64,
    pub role: Role,
}

pub const TARIFFS: [Tariff; 2] = [
    Tariff {
        code: "base",
        title: "Base 30d",
        amount: dec!(349.00),
        currency: "RUB",
        days: 30,
        role: Role::Base,
    },
    Tariff {
        code: "advanced",
        title: "Advanced 30d",
        amount: dec!(949.00),
        currency: "RUB",
        days: 30,
        role: Role::Advanced,
    },
];

impl Tariff {
    #[must_use]
    pub fn find(code: &str) -> Option<&'static Tariff> {
        TARIFFS.iter().find(|tariff| tariff.code == code)
    }

    /// Amount as the provider expects it: two decimal places.
    #[must_use]
    pub fn amount_string(&self) -> String {
        format!("{:.2}", self.amount)
    }
}
