//! Change notifications.

mod dispatcher;
pub mod format;

pub use dispatcher::{DispatchReport, Dispatcher};
