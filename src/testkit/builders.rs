//! Builders for records and catalog entries.
//!
//! Defaults describe one article (`nm_id` 100) sold from Коледино.

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;

use crate::domain::{
    AcceptanceCoefficient, CredentialId, Income, NmId, Order, Product, ReportLine, Sale,
    StockLevel, WarehouseId,
};

/// An order placed and last changed at `changed`.
pub fn order(credential_id: CredentialId, srid: &str, changed: DateTime<Utc>) -> Order {
    Order {
        credential_id,
        srid: srid.to_string(),
        last_change_date: changed,
        date: Some(changed),
        warehouse_name: Some("Коледино".into()),
        region_name: Some("Московская область".into()),
        subject: Some("Футболки".into()),
        supplier_article: Some("ART-1".into()),
        tech_size: Some("M".into()),
        nm_id: Some(NmId::new(100)),
        brand: Some("Brand".into()),
        price_with_disc: dec!(1000),
        total_price: dec!(1500),
        spp: dec!(20),
        is_cancel: false,
    }
}

pub fn sale(credential_id: CredentialId, sale_id: &str, changed: DateTime<Utc>) -> Sale {
    Sale {
        credential_id,
        sale_id: sale_id.to_string(),
        last_change_date: changed,
        date: Some(changed),
        warehouse_name: Some("Коледино".into()),
        region_name: Some("Московская область".into()),
        subject: Some("Футболки".into()),
        supplier_article: Some("ART-1".into()),
        tech_size: Some("M".into()),
        nm_id: Some(NmId::new(100)),
        brand: Some("Brand".into()),
        price_with_disc: dec!(1000),
        total_price: dec!(1500),
        spp: dec!(20),
    }
}

pub fn stock(
    credential_id: CredentialId,
    nm_id: i64,
    warehouse: &str,
    quantity: i32,
    changed: DateTime<Utc>,
) -> StockLevel {
    StockLevel {
        credential_id,
        nm_id: NmId::new(nm_id),
        warehouse_name: warehouse.to_string(),
        last_change_date: changed,
        quantity,
        quantity_full: Some(quantity),
        in_way_to_client: Some(0),
        subject: Some("Футболки".into()),
    }
}

/// One line of a free supply (zero price) unless the caller edits it.
pub fn income(
    credential_id: CredentialId,
    income_id: i64,
    nm_id: i64,
    quantity: i32,
    changed: DateTime<Utc>,
) -> Income {
    Income {
        credential_id,
        income_id,
        nm_id: NmId::new(nm_id),
        number: None,
        date: Some(changed),
        last_change_date: changed,
        supplier_article: Some("ART-1".into()),
        tech_size: Some("M".into()),
        barcode: None,
        quantity,
        total_price: dec!(0),
        date_close: None,
        warehouse_name: Some("Коледино".into()),
        status: Some("Принято".into()),
    }
}

pub fn coefficient(
    credential_id: CredentialId,
    warehouse_id: i64,
    box_type: &str,
    value: f64,
    date: DateTime<Utc>,
) -> AcceptanceCoefficient {
    AcceptanceCoefficient {
        credential_id,
        warehouse_id: WarehouseId::new(warehouse_id),
        warehouse_name: Some(format!("Склад {warehouse_id}")),
        box_type_id: 2,
        box_type_name: Some(box_type.to_string()),
        date,
        coefficient: value,
        allow_unload: true,
        storage_coef: None,
        delivery_coef: None,
        is_sorting_center: false,
        observed_at: date,
    }
}

/// A report row with 55.5 ₽ logistics and a 12.5% commission.
pub fn report_line(credential_id: CredentialId, rrd_id: i64, nm_id: i64, office: &str) -> ReportLine {
    ReportLine {
        credential_id,
        rrd_id,
        create_dt: Some(Utc::now()),
        order_dt: Some(Utc::now()),
        subject_name: "Футболки".into(),
        nm_id: NmId::new(nm_id),
        brand_name: Some("Brand".into()),
        quantity: 1,
        retail_price: dec!(1500),
        retail_amount: dec!(1000),
        office_name: Some(office.to_string()),
        delivery_amount: 1,
        return_amount: 0,
        delivery_rub: dec!(55.5),
        commission_percent: dec!(12.5),
    }
}

pub fn product(nm_id: i64, rating: Option<f64>, updated: DateTime<Utc>) -> Product {
    Product {
        nm_id: NmId::new(nm_id),
        owner_credential_id: CredentialId::new(1),
        subject_name: Some("Футболки".into()),
        brand_name: Some("Brand".into()),
        supplier_article: Some("ART-1".into()),
        tech_size: Some("M".into()),
        image_url: None,
        rating,
        reviews: rating.map(|_| 12),
        thumbnail: None,
        last_update: updated,
    }
}

/// A string that passes credential shape validation.
pub fn credential_value(seed: &str) -> String {
    format!("eyJhbGciOiJFUzI1NiJ9.{}.{}", seed.repeat(8), "s".repeat(24))
}
