//! Application services (use cases).
//!
//! Services are generic over the storage ports and hold external
//! collaborators as trait objects.

pub mod daily_report;
pub mod expiry;
pub mod gate;
pub mod notify;
pub mod onboarding;
pub mod products;
pub mod retention;
pub mod scheduler;
pub mod settings;
pub mod subscription;
pub mod summary;
pub mod sync;
