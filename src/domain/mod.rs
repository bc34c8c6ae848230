//! Marketplace domain types and pure rules.

pub mod credential;
pub mod id;
pub mod metrics;
pub mod payment;
pub mod product;
pub mod record;
pub mod report;
pub mod role;
pub mod session;
pub mod tariff;
pub mod time;
pub mod user;
pub mod watermark;

pub use credential::{Credential, NewCredential};
pub use id::{CredentialId, NmId, PaymentId, TelegramId, UserId, WarehouseId};
pub use product::{Product, ProductDetails, ProductSeed};
pub use record::{
    AcceptanceCoefficient, ChangedRecord, Income, Order, Reconciled, ReportLine, Sale, StockLevel,
    Tracked,
};
pub use role::{Capabilities, Role};
pub use user::{NotificationKind, NotificationSettings, User};
pub use watermark::Watermark;
