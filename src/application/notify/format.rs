//! HTML message templates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::metrics::{days_of_coverage, discounted_price, ActivityCounts, TRAILING_DAYS};
use crate::domain::time::to_marketplace_local;
use crate::domain::{AcceptanceCoefficient, Income, NmId, Order, Product, Role, Sale};

/// Figures looked up for one article before composing a message.
#[derive(Debug, Clone, Default)]
pub struct ArticleFigures {
    pub product: Option<Product>,
    pub activity: ActivityCounts,
    pub total_stock: i64,
    pub delivery_cost: Option<Decimal>,
    pub commission: Option<Decimal>,
}

impl ArticleFigures {
    fn rating(&self) -> String {
        self.product
            .as_ref()
            .and_then(|p| p.rating)
            .map_or_else(|| "—".to_string(), |r| format!("{r:.1}"))
    }

    fn reviews(&self) -> String {
        self.product
            .as_ref()
            .and_then(|p| p.reviews)
            .map_or_else(|| "—".to_string(), |r| r.to_string())
    }

    fn coverage_days(&self) -> f64 {
        days_of_coverage(self.total_stock, self.activity.trailing, TRAILING_DAYS)
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.product.as_ref().and_then(|p| p.image_url.as_deref())
    }
}

/// Escape text for Telegram HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn local(dt: DateTime<Utc>) -> String {
    to_marketplace_local(dt).format("%d.%m.%Y %H:%M").to_string()
}

fn field(value: Option<&str>) -> String {
    value.map_or_else(|| "—".to_string(), escape_html)
}

fn article_link(nm_id: Option<NmId>) -> String {
    match nm_id {
        Some(id) => format!("<a href=\"{}\">{id}</a>", id.catalog_url()),
        None => "—".to_string(),
    }
}

fn item_name(subject: Option<&str>, figures: &ArticleFigures) -> String {
    let from_product = figures
        .product
        .as_ref()
        .and_then(|p| p.subject_name.as_deref());
    field(subject.or(from_product))
}

fn stock_line(figures: &ArticleFigures) -> String {
    format!(
        "📦 <b>Остаток:</b> {} шт. ⏳ <b>Хватит примерно на:</b> {:.0} дн.",
        figures.total_stock,
        figures.coverage_days()
    )
}

fn delivery(figures: &ArticleFigures) -> String {
    figures
        .delivery_cost
        .map_or_else(|| "—".to_string(), |cost| format!("{:.2}", cost))
}

pub fn order_message(order: &Order, figures: &ArticleFigures) -> String {
    let final_price = discounted_price(order.price_with_disc, order.spp);
    format!(
        "🆕🛍 <b>Новый заказ!</b>\n\
         📅 <b>Дата:</b> {date}\n\
         📦 <b>Товар:</b> {item}\n\
         🔖 <b>Артикул:</b> {article}\n\
         ⭐ <b>Рейтинг:</b> {rating}\n\
         💬 <b>Отзывы:</b> {reviews}\n\
         🚚 <b>Отгрузка:</b> {warehouse}\n\
         💰 <b>Логистика:</b> {delivery}\n\
         🏙 <b>Доставка:</b> {region}\n\
         💲 <b>Сумма:</b> {price:.2}  |  🔽 <b>Цена с СПП:</b> {final_price:.2}\n\
         📆 <b>Сегодня:</b> {today}\n\
         📊 <b>Заказов за 3 месяца:</b> {trailing}\n\
         \n\
         {stock}",
        date = local(order.date.unwrap_or(order.last_change_date)),
        item = item_name(order.subject.as_deref(), figures),
        article = article_link(order.nm_id),
        rating = figures.rating(),
        reviews = figures.reviews(),
        warehouse = field(order.warehouse_name.as_deref()),
        delivery = delivery(figures),
        region = field(order.region_name.as_deref()),
        price = order.price_with_disc,
        today = figures.activity.today,
        trailing = figures.activity.trailing,
        stock = stock_line(figures),
    )
}

pub fn cancellation_message(order: &Order, figures: &ArticleFigures) -> String {
    format!(
        "❌ <b>Отмена заказа</b>\n\
         📅 <b>Дата заказа:</b> {date}\n\
         🕓 <b>Отменён:</b> {changed}\n\
         📦 <b>Товар:</b> {item}\n\
         🔖 <b>Артикул:</b> {article}\n\
         🚚 <b>Склад:</b> {warehouse}\n\
         🏙 <b>Регион:</b> {region}\n\
         💲 <b>Сумма:</b> {price:.2}\n\
         \n\
         {stock}",
        date = order.date.map_or_else(|| "—".to_string(), local),
        changed = local(order.last_change_date),
        item = item_name(order.subject.as_deref(), figures),
        article = article_link(order.nm_id),
        warehouse = field(order.warehouse_name.as_deref()),
        region = field(order.region_name.as_deref()),
        price = order.price_with_disc,
        stock = stock_line(figures),
    )
}

pub fn sale_message(sale: &Sale, figures: &ArticleFigures) -> String {
    let final_price = discounted_price(sale.price_with_disc, sale.spp);
    let commission = figures
        .commission
        .map_or_else(|| "—".to_string(), |c| c.normalize().to_string());
    format!(
        "🆕🔔 <b>Новый выкуп!</b>\n\
         📅 <b>Дата:</b> {date}\n\
         📦 <b>Товар:</b> {item}\n\
         🔖 <b>Артикул:</b> {article}\n\
         ⭐ <b>Рейтинг:</b> {rating}\n\
         💬 <b>Отзывы:</b> {reviews}\n\
         🚚 <b>Отгрузка:</b> {warehouse}\n\
         💰 <b>Логистика:</b> {delivery}\n\
         🏙 <b>Доставка:</b> {region}\n\
         🛒 <b>Сегодня выкупов:</b> {today}\n\
         💲 <b>Сумма:</b> {price:.2}  |  💸 <b>Комиссия:</b> {commission}%\n\
         🔽 <b>Цена с СПП:</b> {final_price:.2}\n\
         📊 <b>Выкупов за 3 месяца:</b> {trailing}\n\
         \n\
         {stock}",
        date = local(sale.date.unwrap_or(sale.last_change_date)),
        item = item_name(sale.subject.as_deref(), figures),
        article = article_link(sale.nm_id),
        rating = figures.rating(),
        reviews = figures.reviews(),
        warehouse = field(sale.warehouse_name.as_deref()),
        delivery = delivery(figures),
        region = field(sale.region_name.as_deref()),
        today = figures.activity.today,
        price = sale.price_with_disc,
        trailing = figures.activity.trailing,
        stock = stock_line(figures),
    )
}

/// One message for a whole free supply. `lines` share an `income_id`.
pub fn free_supply_message(lines: &[Income]) -> String {
    let first = lines.first();
    let date = first
        .and_then(|l| l.date)
        .map_or_else(|| "—".to_string(), local);
    let warehouse = field(first.and_then(|l| l.warehouse_name.as_deref()));

    let mut text = format!(
        "🎁 <b>Обнаружена бесплатная поставка!</b>\n\
         📅 <b>Дата:</b> {date}\n\
         🏬 <b>Склад:</b> {warehouse}\n\
         \n\
         <b>Товары:</b>"
    );
    let mut total = 0i64;
    for line in lines {
        let name = line
            .supplier_article
            .as_deref()
            .map_or_else(|| line.nm_id.to_string(), escape_html);
        text.push_str(&format!("\n  • {name} × {}", line.quantity));
        total += i64::from(line.quantity);
    }
    text.push_str(&format!("\n\n<b>Всего товаров:</b> {total}"));
    text
}

pub fn free_acceptance_message(coefficient: &AcceptanceCoefficient) -> String {
    format!(
        "🟢 <b>Бесплатная приёмка!</b>\n\
         📅 <b>Дата:</b> {date}\n\
         🏬 <b>Склад:</b> {warehouse}\n\
         📦 <b>Тип коробки:</b> {box_type}",
        date = coefficient.date.format("%d.%m.%Y"),
        warehouse = coefficient
            .warehouse_name
            .as_deref()
            .map_or_else(|| coefficient.warehouse_id.to_string(), escape_html),
        box_type = field(coefficient.box_type_name.as_deref()),
    )
}

pub fn expiry_warning(role: Role, days_left: i64, until: DateTime<Utc>) -> String {
    format!(
        "⚠️ Ваша подписка (<b>{role}</b>) истекает через <b>{days_left} дн.</b>\n\
         Дата окончания: {until}\n\
         Продлите подписку в разделе «Кабинет», чтобы не потерять доступ.",
        until = local(until),
    )
}

/// Text sent when a photo could not be delivered.
pub fn photo_fallback(photo_url: &str, caption: &str) -> String {
    format!("{}\n{caption}", escape_html(photo_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time::parse_timestamp;
    use crate::domain::CredentialId;
    use crate::testkit::builders;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn figures() -> ArticleFigures {
        ArticleFigures {
            product: Some(builders::product(100, Some(4.8), Utc::now())),
            activity: ActivityCounts {
                today: 3,
                trailing: 90,
            },
            total_stock: 45,
            delivery_cost: Some(dec!(55.5)),
            commission: Some(dec!(12.5)),
        }
    }

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape_html("<b>&\"x\"</b>"), "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;");
    }

    #[test]
    fn order_message_carries_contract_fields() {
        let at = Utc.with_ymd_and_hms(2025, 3, 12, 7, 30, 0).unwrap();
        let order = builders::order(CredentialId::new(1), "S100", at);
        let text = order_message(&order, &figures());

        assert!(text.contains("Новый заказ"));
        assert!(text.contains("12.03.2025 10:30"));
        assert!(text.contains("catalog/100/detail.aspx"));
        assert!(text.contains("4.8"));
        assert!(text.contains("Коледино"));
        assert!(text.contains("55.50"));
        assert!(text.contains("1000.00"));
        // 20% SPP off 1000
        assert!(text.contains("800.00"));
        assert!(text.contains("<b>Сегодня:</b> 3"));
        assert!(text.contains("<b>Заказов за 3 месяца:</b> 90"));
        assert!(text.contains("45 шт."));
        assert!(text.contains("45 дн."));
    }

    #[test]
    fn marketplace_dates_render_as_sent() {
        let mut order = builders::order(CredentialId::new(1), "S7", Utc::now());
        order.date = parse_timestamp("2025-03-10T10:00:00");
        let text = order_message(&order, &figures());
        assert!(text.contains("10.03.2025 10:00"));
    }

    #[test]
    fn missing_figures_render_placeholders() {
        let order = builders::order(CredentialId::new(1), "S1", Utc::now());
        let text = order_message(&order, &ArticleFigures::default());
        assert!(text.contains("<b>Рейтинг:</b> —"));
        assert!(text.contains("<b>Логистика:</b> —"));
        assert!(text.contains("0 дн."));
    }

    #[test]
    fn sale_message_shows_commission() {
        let sale = builders::sale(CredentialId::new(1), "R1", Utc::now());
        let text = sale_message(&sale, &figures());
        assert!(text.contains("Новый выкуп"));
        assert!(text.contains("12.5%"));
    }

    #[test]
    fn supply_message_lists_lines_and_total() {
        let now = Utc::now();
        let lines = vec![
            builders::income(CredentialId::new(1), 9, 100, 5, now),
            builders::income(CredentialId::new(1), 9, 101, 7, now),
        ];
        let text = free_supply_message(&lines);
        assert!(text.contains("ART-1 × 5"));
        assert!(text.contains("ART-1 × 7"));
        assert!(text.contains("<b>Всего товаров:</b> 12"));
    }

    #[test]
    fn user_text_is_escaped() {
        let mut order = builders::order(CredentialId::new(1), "S1", Utc::now());
        order.warehouse_name = Some("<script>".into());
        let text = cancellation_message(&order, &ArticleFigures::default());
        assert!(text.contains("&lt;script&gt;"));
        assert!(text.starts_with("❌"));
    }
}
