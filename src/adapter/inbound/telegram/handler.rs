//! Routes decoded commands, callbacks and free text to the application
//! services and turns their results into replies.
//!
//! Nothing here depends on the bot library, so the whole conversation
//! surface is testable against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use url::Url;

use super::callback::CallbackAction;
use super::command::{command_help, parse_command, BotCommand, CommandParseError, PaidLink};
use super::menu::{self, Reply};
use super::session::Sessions;
use crate::application::onboarding::{Onboarding, Submission};
use crate::application::settings::{SettingsService, WarehouseSubscription};
use crate::application::subscription::SubscriptionService;
use crate::application::summary::SummaryService;
use crate::domain::payment::{ActivationOutcome, PaymentStatus};
use crate::domain::session::{ConversationEvent, Prompt, Step};
use crate::domain::tariff::Tariff;
use crate::domain::{PaymentId, TelegramId, WarehouseId};
use crate::error::Result;
use crate::port::outbound::billing::PaymentProvider;
use crate::port::outbound::report::ReportRenderer;
use crate::port::outbound::store::Store;
use crate::port::outbound::transport::ChatTransport;

const CATALOG_SEARCH_URL: &str = "https://www.wildberries.ru/catalog/0/search.aspx";

/// What the bot sends back for one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub replies: Vec<Reply>,
    /// Short toast shown when answering a button press.
    pub notice: Option<String>,
}

impl Response {
    fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            notice: None,
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self::reply(Reply::text(text))
    }

    fn none() -> Self {
        Self::default()
    }

    #[must_use]
    fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// How long a multi-step flow waits for input.
    pub session_timeout: Duration,
    /// Deep link the payment provider redirects to after checkout.
    pub return_url: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            session_timeout: Duration::minutes(10),
            return_url: None,
        }
    }
}

/// Services shared by every update handler.
pub struct BotContext<S> {
    store: Arc<S>,
    onboarding: Onboarding<S>,
    settings: SettingsService<S>,
    subscriptions: SubscriptionService<S>,
    summaries: SummaryService<S>,
    sessions: Sessions,
}

impl<S: Store> BotContext<S> {
    pub fn new(
        store: Arc<S>,
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn ReportRenderer>,
        provider: Arc<dyn PaymentProvider>,
        settings: BotSettings,
    ) -> Self {
        Self {
            onboarding: Onboarding::new(Arc::clone(&store)),
            settings: SettingsService::new(Arc::clone(&store)),
            subscriptions: SubscriptionService::new(
                Arc::clone(&store),
                provider,
                settings.return_url,
            ),
            summaries: SummaryService::new(Arc::clone(&store), transport, renderer),
            sessions: Sessions::new(settings.session_timeout),
            store,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Handle a text message: a command, or input to the chat's open flow.
    pub async fn handle_message(
        &self,
        chat: TelegramId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Response> {
        match parse_command(text) {
            Ok(command) => self.handle_command(chat, command, now).await,
            Err(CommandParseError::NotACommand) => self.handle_text(chat, text, now).await,
            Err(CommandParseError::InvalidDays(_)) => Ok(Response::text(
                "Количество дней должно быть положительным числом, например: /orders 7",
            )),
            Err(e @ CommandParseError::UnknownCommand(_)) => {
                debug!(chat = chat.get(), error = %e, "unknown command");
                Ok(Response::text("Неизвестная команда. Список команд: /help"))
            }
        }
    }

    pub async fn handle_command(
        &self,
        chat: TelegramId,
        command: BotCommand,
        now: DateTime<Utc>,
    ) -> Result<Response> {
        match command {
            BotCommand::Start { paid: Some(link) } => self.paid_link(link, now).await,
            BotCommand::Start { paid: None } => self.start(chat, now).await,
            BotCommand::Help => Ok(Response::text(command_help())),
            BotCommand::Cabinet => self.cabinet(chat, now).await,
            BotCommand::Settings => Ok(Response::reply(menu::settings())),
            BotCommand::Tariffs => Ok(Response::reply(menu::tariffs())),
            BotCommand::Orders { days: None } => Ok(Response::reply(menu::period_picker(true))),
            BotCommand::MyProducts { days: None } => {
                Ok(Response::reply(menu::period_picker(false)))
            }
            BotCommand::Orders { days: Some(days) }
            | BotCommand::MyProducts { days: Some(days) } => self.summary(chat, days, now).await,
            BotCommand::Token => {
                self.sessions
                    .handle(chat, ConversationEvent::BeginCredentialEntry, now);
                Ok(Response::reply(menu::replace_prompt()))
            }
            BotCommand::Position => {
                let step = self
                    .sessions
                    .handle(chat, ConversationEvent::BeginPositionSearch, now);
                self.step_reply(chat, step, now).await
            }
            BotCommand::Cancel => {
                let step = self.sessions.handle(chat, ConversationEvent::Cancel, now);
                self.step_reply(chat, step, now).await
            }
        }
    }

    pub async fn handle_text(
        &self,
        chat: TelegramId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Response> {
        let step = self
            .sessions
            .handle(chat, ConversationEvent::Text(text.to_string()), now);
        self.step_reply(chat, step, now).await
    }

    /// Handle a button press. Unknown payloads are answered silently.
    pub async fn handle_callback(
        &self,
        chat: TelegramId,
        data: &str,
        now: DateTime<Utc>,
    ) -> Result<Response> {
        let action = match data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(e) => {
                warn!(chat = chat.get(), error = %e, "callback ignored");
                return Ok(Response::none());
            }
        };

        match action {
            CallbackAction::Orders { days: None } => {
                Ok(Response::reply(menu::period_picker(true)))
            }
            CallbackAction::MyProducts { days: None } => {
                Ok(Response::reply(menu::period_picker(false)))
            }
            CallbackAction::Orders { days: Some(days) }
            | CallbackAction::MyProducts { days: Some(days) } => {
                self.summary(chat, days, now).await
            }
            CallbackAction::Help => Ok(Response::text(command_help())),
            CallbackAction::Cabinet => self.cabinet(chat, now).await,
            CallbackAction::Settings => Ok(Response::reply(menu::settings())),
            CallbackAction::NotificationMenu => {
                let user = self.store.ensure_user(chat).await?;
                Ok(Response::reply(menu::notification_menu(&user.notify)))
            }
            CallbackAction::Toggle(kind) => {
                self.settings.toggle_notification(chat, kind).await?;
                let user = self.store.ensure_user(chat).await?;
                Ok(Response::reply(menu::notification_menu(&user.notify))
                    .with_notice("Изменения сохранены!"))
            }
            CallbackAction::WarehouseMenu { page } => self.warehouse_page(chat, page).await,
            CallbackAction::AddWarehouse(id) => {
                let outcome = self.settings.subscribe_warehouse(chat, id).await?;
                let notice = match outcome {
                    WarehouseSubscription::Added => "Склад добавлен.".to_string(),
                    other => other.message(),
                };
                Ok(self.warehouse_page_of(chat, id).await?.with_notice(notice))
            }
            CallbackAction::RemoveWarehouse(id) => {
                let removed = self.settings.unsubscribe_warehouse(chat, id).await?;
                let notice = if removed {
                    "Склад удалён."
                } else {
                    "У вас нет подписки на этот склад."
                };
                Ok(self.warehouse_page_of(chat, id).await?.with_notice(notice))
            }
            CallbackAction::AddBoxType(name) => {
                let added = self.settings.subscribe_box_type(chat, &name).await?;
                let notice = if added {
                    "Тип поставки добавлен."
                } else {
                    "Этот тип поставки уже отслеживается."
                };
                self.box_types(chat).await.map(|r| r.with_notice(notice))
            }
            CallbackAction::RemoveBoxType(name) => {
                let removed = self.settings.unsubscribe_box_type(chat, &name).await?;
                let notice = if removed {
                    "Тип поставки удалён."
                } else {
                    "Этот тип поставки не отслеживается."
                };
                self.box_types(chat).await.map(|r| r.with_notice(notice))
            }
            CallbackAction::Tariffs => Ok(Response::reply(menu::tariffs())),
            CallbackAction::Pay { tariff } => self.checkout(chat, &tariff).await,
            CallbackAction::CheckPayment(id) => self.check_payment(id, now).await,
            CallbackAction::IsSafe => Ok(Response::text(menu::SAFETY_TEXT)),
            CallbackAction::ReplaceToken => {
                self.sessions
                    .handle(chat, ConversationEvent::BeginCredentialEntry, now);
                Ok(Response::reply(menu::replace_prompt()))
            }
            CallbackAction::ReplaceTokenCancel => {
                self.sessions.handle(chat, ConversationEvent::Cancel, now);
                Ok(Response::text("Ок, замена токена отменена."))
            }
        }
    }

    async fn start(&self, chat: TelegramId, now: DateTime<Utc>) -> Result<Response> {
        let bound = self
            .store
            .user_by_telegram(chat)
            .await?
            .and_then(|user| user.credential_id)
            .is_some();
        if bound {
            return Ok(Response::reply(menu::welcome_back()));
        }
        self.store.ensure_user(chat).await?;
        self.sessions
            .handle(chat, ConversationEvent::BeginCredentialEntry, now);
        Ok(Response::reply(menu::credential_request(false)))
    }

    async fn paid_link(&self, link: PaidLink, now: DateTime<Utc>) -> Result<Response> {
        match link.payment_id {
            Some(id) => self.check_payment(id, now).await,
            None => Ok(Response::text(
                "Платёж ещё обрабатывается. Нажмите «Проверить оплату» через минуту.",
            )),
        }
    }

    async fn check_payment(&self, id: PaymentId, now: DateTime<Utc>) -> Result<Response> {
        let outcome = self.subscriptions.refresh_and_activate_at(id, now).await?;
        Ok(Response::text(activation_text(&outcome)))
    }

    async fn checkout(&self, chat: TelegramId, code: &str) -> Result<Response> {
        let outcome = self.subscriptions.create_payment(chat, code).await?;
        let (true, Some(url), Some(payment_id)) =
            (outcome.ok, outcome.confirmation_url.as_deref(), outcome.payment_id)
        else {
            return Ok(Response::text(outcome.message));
        };
        let title = Tariff::find(code).map_or(code, |tariff| tariff.title);
        Ok(Response::reply(menu::checkout(title, url, payment_id)))
    }

    async fn cabinet(&self, chat: TelegramId, now: DateTime<Utc>) -> Result<Response> {
        let user = self.store.ensure_user(chat).await?;
        let credential = match user.credential_id {
            Some(id) => self.store.credential(id).await?,
            None => None,
        };
        let Some(credential) = credential else {
            self.sessions
                .handle(chat, ConversationEvent::BeginCredentialEntry, now);
            return Ok(Response::reply(menu::credential_request(true)));
        };
        Ok(Response::reply(menu::cabinet(
            credential.role,
            credential.subscription_until,
            user.store_link.as_deref(),
        )))
    }

    async fn summary(&self, chat: TelegramId, days: u32, now: DateTime<Utc>) -> Result<Response> {
        let outcome = self.summaries.send_at(chat, days, now).await?;
        Ok(outcome
            .message(days)
            .map_or_else(Response::none, Response::text))
    }

    async fn warehouse_page(&self, chat: TelegramId, page: usize) -> Result<Response> {
        let warehouses = self.settings.warehouse_menu(chat).await?;
        Ok(Response::reply(menu::warehouse_menu(&warehouses, page)))
    }

    /// Redraw the page that holds `id`.
    async fn warehouse_page_of(&self, chat: TelegramId, id: WarehouseId) -> Result<Response> {
        let warehouses = self.settings.warehouse_menu(chat).await?;
        let page = warehouses
            .iter()
            .position(|(known, _, _)| *known == id)
            .map_or(0, |index| index / menu::WAREHOUSES_PER_PAGE);
        Ok(Response::reply(menu::warehouse_menu(&warehouses, page)))
    }

    async fn box_types(&self, chat: TelegramId) -> Result<Response> {
        let tracked = self.settings.box_types(chat).await?;
        let text = if tracked.is_empty() {
            "Типы поставки не выбраны: уведомления приходят по всем.".to_string()
        } else {
            format!("Отслеживаемые типы поставки: {}", tracked.join(", "))
        };
        Ok(Response::text(text))
    }

    async fn step_reply(&self, chat: TelegramId, step: Step, now: DateTime<Utc>) -> Result<Response> {
        let response = match step {
            Step::Prompt(Prompt::Credential) => Response::reply(menu::replace_prompt()),
            Step::Prompt(Prompt::Article) => {
                Response::text("Пришлите артикул товара (только цифры).\nОтмена: /cancel")
            }
            Step::Prompt(Prompt::Query) => {
                Response::text("Теперь пришлите поисковый запрос, например: платье летнее")
            }
            Step::InvalidArticle => {
                Response::text("Артикул должен быть положительным числом. Попробуйте ещё раз.")
            }
            Step::SearchRequested { article, query } => {
                let link = Url::parse_with_params(CATALOG_SEARCH_URL, &[("search", &query)])?;
                Response::reply(Reply::text(format!(
                    "Проверьте позицию артикула <code>{article}</code> по запросу «{query}» в выдаче:"
                ))
                .with_keyboard(vec![vec![menu::Button::url("Открыть выдачу", link.as_str())]]))
            }
            Step::CredentialSubmitted(value) => {
                let submission = self.onboarding.submit_at(chat, &value, now).await?;
                if let Submission::Rejected(_) = submission {
                    self.sessions
                        .handle(chat, ConversationEvent::BeginCredentialEntry, now);
                }
                Response::text(submission.message())
            }
            Step::Cancelled => Response::text("Действие отменено."),
            Step::TimedOut => Response::text("Время ожидания истекло. Начните заново."),
            Step::Ignored => Response::text("Не понял сообщение. Список команд: /help"),
        };
        Ok(response)
    }
}

/// Chat text for a payment check.
#[must_use]
pub fn activation_text(outcome: &ActivationOutcome) -> String {
    match (outcome.status, outcome.role) {
        (Some(PaymentStatus::Succeeded), Some(role)) => {
            let until = outcome
                .valid_until
                .map_or_else(|| "—".to_string(), |until| until.format("%Y-%m-%d").to_string());
            format!(
                "✅ Оплата подтверждена!\nТариф: <b>{role}</b>\nДействует до: <code>{until}</code>\n\nКоманды: /help /tariffs"
            )
        }
        (Some(PaymentStatus::Canceled), _) => {
            "🚫 Оплата отменена. Попробуйте снова: /tariffs".to_string()
        }
        (Some(PaymentStatus::Pending | PaymentStatus::WaitingForCapture), _) if outcome.ok => {
            "Платёж ещё обрабатывается. Нажмите «Проверить оплату» через минуту.".to_string()
        }
        _ => outcome.message.clone(),
    }
}
