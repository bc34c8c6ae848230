//! Per-user notification switches and free-acceptance subscriptions.

use std::sync::Arc;

use tracing::debug;

use crate::application::gate::RoleGate;
use crate::domain::{NotificationKind, Role, TelegramId, WarehouseId};
use crate::error::Result;
use crate::port::outbound::store::{CredentialStore, RecordStore, UserStore};

/// Result of asking to track another warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseSubscription {
    Added,
    AlreadyTracked,
    /// The role's warehouse allowance is used up.
    LimitReached { role: Role, max: usize },
}

impl WarehouseSubscription {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Added => "Склад добавлен в отслеживание.".to_string(),
            Self::AlreadyTracked => "Этот склад уже отслеживается.".to_string(),
            Self::LimitReached { role, max } => format!(
                "Для тарифа <b>{role}</b> можно отслеживать не больше {max} складов. \
                 Расширить лимит: /tariffs"
            ),
        }
    }
}

pub struct SettingsService<S> {
    store: Arc<S>,
    gate: RoleGate<S>,
}

impl<S> SettingsService<S>
where
    S: UserStore + CredentialStore + RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            gate: RoleGate::new(Arc::clone(&store)),
            store,
        }
    }

    /// Flip one notification switch, returning its new value.
    pub async fn toggle_notification(
        &self,
        telegram_id: TelegramId,
        kind: NotificationKind,
    ) -> Result<bool> {
        let user = self.store.ensure_user(telegram_id).await?;
        let mut settings = user.notify;
        let enabled = settings.toggle(kind);
        self.store.set_notification(user.id, kind, enabled).await?;
        debug!(chat = telegram_id.get(), kind = %kind, enabled, "notification toggled");
        Ok(enabled)
    }

    pub async fn subscribe_warehouse(
        &self,
        telegram_id: TelegramId,
        warehouse_id: WarehouseId,
    ) -> Result<WarehouseSubscription> {
        let user = self.store.ensure_user(telegram_id).await?;
        let current = self.store.warehouse_subscriptions(user.id).await?;
        if current.contains(&warehouse_id) {
            return Ok(WarehouseSubscription::AlreadyTracked);
        }

        let role = self.gate.get_role(telegram_id).await?;
        let caps = role.capabilities();
        if !caps.allows_another_warehouse(current.len()) {
            return Ok(WarehouseSubscription::LimitReached {
                role,
                max: caps.max_warehouses.unwrap_or_default(),
            });
        }

        if self.store.subscribe_warehouse(user.id, warehouse_id).await? {
            Ok(WarehouseSubscription::Added)
        } else {
            Ok(WarehouseSubscription::AlreadyTracked)
        }
    }

    pub async fn unsubscribe_warehouse(
        &self,
        telegram_id: TelegramId,
        warehouse_id: WarehouseId,
    ) -> Result<bool> {
        let user = self.store.ensure_user(telegram_id).await?;
        self.store.unsubscribe_warehouse(user.id, warehouse_id).await
    }

    pub async fn warehouses(&self, telegram_id: TelegramId) -> Result<Vec<WarehouseId>> {
        let user = self.store.ensure_user(telegram_id).await?;
        self.store.warehouse_subscriptions(user.id).await
    }

    /// Every known warehouse with whether the chat tracks it.
    pub async fn warehouse_menu(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Vec<(WarehouseId, String, bool)>> {
        let tracked = self.warehouses(telegram_id).await?;
        Ok(self
            .store
            .known_warehouses()
            .await?
            .into_iter()
            .map(|(id, name)| (id, name, tracked.contains(&id)))
            .collect())
    }

    /// Returns false when the box type was already tracked.
    pub async fn subscribe_box_type(&self, telegram_id: TelegramId, box_type: &str) -> Result<bool> {
        let user = self.store.ensure_user(telegram_id).await?;
        self.store.subscribe_box_type(user.id, box_type.trim()).await
    }

    pub async fn unsubscribe_box_type(
        &self,
        telegram_id: TelegramId,
        box_type: &str,
    ) -> Result<bool> {
        let user = self.store.ensure_user(telegram_id).await?;
        self.store.unsubscribe_box_type(user.id, box_type.trim()).await
    }

    pub async fn box_types(&self, telegram_id: TelegramId) -> Result<Vec<String>> {
        let user = self.store.ensure_user(telegram_id).await?;
        self.store.box_type_subscriptions(user.id).await
    }
}
