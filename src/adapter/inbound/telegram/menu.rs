//! Replies and inline keyboards, independent of the bot library.

use chrono::{DateTime, Duration, Utc};

use super::callback::CallbackAction;
use crate::domain::role::HISTORY_PRESETS;
use crate::domain::tariff::TARIFFS;
use crate::domain::{NotificationKind, NotificationSettings, PaymentId, Role, WarehouseId};

/// Warehouses shown per page of the free-acceptance menu.
pub const WAREHOUSES_PER_PAGE: usize = 10;

/// Seller API key page in the marketplace cabinet.
pub const API_KEYS_URL: &str = "https://seller.wildberries.ru/supplier-settings/access-to-api";

pub const SAFETY_TEXT: &str = "<b>🔒 Безопасность</b>\n\n\
    1️⃣ Бот использует ваш API-ключ только для чтения статистики: заказов, остатков, поставок.\n\
    2️⃣ Он не умеет изменять цены, карточки товаров или доступ к личному кабинету.\n\
    3️⃣ Ключ можно отозвать в личном кабинете Wildberries в любой момент.\n\
    4️⃣ Данные не передаются третьим лицам.\n\n\
    Если остались вопросы, напишите /help.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    Callback { text: String, action: CallbackAction },
    Url { text: String, url: String },
}

impl Button {
    pub fn callback(text: impl Into<String>, action: CallbackAction) -> Self {
        Self::Callback {
            text: text.into(),
            action,
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Rows of inline buttons.
pub type Keyboard = Vec<Vec<Button>>;

/// One outgoing HTML message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

fn single_column(buttons: impl IntoIterator<Item = Button>) -> Keyboard {
    buttons.into_iter().map(|button| vec![button]).collect()
}

pub fn credential_request(returning: bool) -> Reply {
    let text = if returning {
        "У вас не найден действующий ключ. Создайте новый API-ключ и пришлите его сюда."
    } else {
        "Привет! Чтобы начать, нужно создать API-ключ 🔑\n\n\
         1️⃣ Откройте личный кабинет Wildberries\n\
         2️⃣ Перейдите в раздел «Доступ к API»\n\
         3️⃣ Выберите разделы: Контент, Аналитика, Статистика, Финансы, Поставки\n\
         4️⃣ Создайте ключ только на чтение и отправьте его сюда"
    };
    Reply::text(text).with_keyboard(single_column([
        Button::url("Создать API-ключ 🔑", API_KEYS_URL),
        Button::callback("Это безопасно?", CallbackAction::IsSafe),
    ]))
}

pub fn welcome_back() -> Reply {
    Reply::text(
        "Рад снова видеть! Начните с /cabinet или настройте уведомления в /settings.",
    )
    .with_keyboard(single_column([
        Button::url("Создать новый API-ключ 🔑", API_KEYS_URL),
        Button::callback("Заменить ключ", CallbackAction::ReplaceToken),
    ]))
}

pub fn replace_prompt() -> Reply {
    Reply::text("Пришлите новый API-ключ одним сообщением.").with_keyboard(single_column([
        Button::callback("Отмена", CallbackAction::ReplaceTokenCancel),
    ]))
}

/// Moscow time, which is what sellers read in the marketplace cabinet.
fn moscow(at: DateTime<Utc>) -> String {
    (at + Duration::hours(3))
        .format("%d.%m.%Y %H:%M МСК")
        .to_string()
}

pub fn cabinet(role: Role, until: Option<DateTime<Utc>>, store_link: Option<&str>) -> Reply {
    let store = store_link.map_or_else(
        || "не указан".to_string(),
        |link| format!("<a href='{link}'>открыть</a>"),
    );
    let until = until.map_or_else(|| "—".to_string(), moscow);
    Reply::text(format!(
        "👤 <b>Личный кабинет</b>\nМагазин: {store}\nТариф: {role}\nДоступ до {until}"
    ))
    .with_keyboard(vec![
        vec![
            Button::callback("Заказы", CallbackAction::Orders { days: None }),
            Button::callback("Сводный отчёт", CallbackAction::MyProducts { days: None }),
        ],
        vec![
            Button::callback("Тарифы", CallbackAction::Tariffs),
            Button::callback("Настройки", CallbackAction::Settings),
        ],
        vec![Button::callback("Поддержка", CallbackAction::Help)],
    ])
}

/// Period picker for a summary report.
pub fn period_picker(orders: bool) -> Reply {
    let title = if orders {
        "За какой период вывести заказы?"
    } else {
        "За какой период вывести отчёт?"
    };
    Reply::text(title).with_keyboard(single_column(HISTORY_PRESETS.into_iter().map(|days| {
        let action = if orders {
            CallbackAction::Orders { days: Some(days) }
        } else {
            CallbackAction::MyProducts { days: Some(days) }
        };
        Button::callback(format!("{days} дней"), action)
    })))
}

pub fn settings() -> Reply {
    Reply::text("Раздел Настройки: выберите пункт").with_keyboard(single_column([
        Button::callback("Оповещения 🔔", CallbackAction::NotificationMenu),
        Button::callback(
            "Трекинг бесплатной приёмки 🆓🚚",
            CallbackAction::WarehouseMenu { page: 0 },
        ),
        Button::callback("⬅️ Назад", CallbackAction::Cabinet),
    ]))
}

pub fn notification_menu(settings: &NotificationSettings) -> Reply {
    let mut rows: Keyboard = NotificationKind::ALL
        .into_iter()
        .map(|kind| {
            let mark = if settings.is_enabled(kind) { "✅" } else { "❌" };
            vec![Button::callback(
                format!("{}: {mark}", kind.label()),
                CallbackAction::Toggle(kind),
            )]
        })
        .collect();
    rows.push(vec![Button::callback("⬅️ Назад", CallbackAction::Settings)]);
    Reply::text("Выберите, какие уведомления получать:").with_keyboard(rows)
}

/// One page of warehouses with tracked ones checked.
pub fn warehouse_menu(warehouses: &[(WarehouseId, String, bool)], page: usize) -> Reply {
    let pages = warehouses.len().div_ceil(WAREHOUSES_PER_PAGE).max(1);
    let page = page.min(pages - 1);

    let mut rows: Keyboard = warehouses
        .iter()
        .skip(page * WAREHOUSES_PER_PAGE)
        .take(WAREHOUSES_PER_PAGE)
        .map(|(id, name, tracked)| {
            let button = if *tracked {
                Button::callback(format!("✅ {name}"), CallbackAction::RemoveWarehouse(*id))
            } else {
                Button::callback(format!("🚫 {name}"), CallbackAction::AddWarehouse(*id))
            };
            vec![button]
        })
        .collect();

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(Button::callback(
            "⬅️ Назад",
            CallbackAction::WarehouseMenu { page: page - 1 },
        ));
    }
    if page + 1 < pages {
        nav.push(Button::callback(
            "Вперёд ➡️",
            CallbackAction::WarehouseMenu { page: page + 1 },
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(vec![Button::callback("Выход", CallbackAction::Cabinet)]);

    let text = if warehouses.is_empty() {
        "Список складов ещё не загружен. Попробуйте позже.".to_string()
    } else {
        format!(
            "Отметьте склады для уведомлений о бесплатной приёмке (стр. {}/{pages}):",
            page + 1
        )
    };
    Reply::text(text).with_keyboard(rows)
}

pub fn tariffs() -> Reply {
    let mut text = String::from("<b>💳 Тарифы</b>\n\n");
    let mut rows = Vec::new();
    for tariff in &TARIFFS {
        text.push_str(&format!(
            "• <b>{}</b>: {} ₽ за {} дней\n",
            tariff.role, tariff.amount, tariff.days
        ));
        rows.push(vec![Button::callback(
            format!("{} — {} ₽", tariff.title, tariff.amount),
            CallbackAction::Pay {
                tariff: tariff.code.to_string(),
            },
        )]);
    }
    Reply::text(text).with_keyboard(rows)
}

pub fn checkout(title: &str, url: &str, payment_id: PaymentId) -> Reply {
    Reply::text(format!(
        "Перейдите по ссылке для оплаты тарифа «{title}»:"
    ))
    .with_keyboard(single_column([
        Button::url(format!("Оплатить {title}"), url),
        Button::callback("Проверить оплату", CallbackAction::CheckPayment(payment_id)),
    ]))
}
