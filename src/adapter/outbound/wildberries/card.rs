//! Public catalog card lookup with thumbnail rendering.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{NmId, ProductDetails};
use crate::error::{Error, Result};
use crate::port::outbound::enrichment::ProductEnricher;

pub const DEFAULT_CARD_URL: &str = "https://card.wb.ru/cards/v2/detail";

const THUMBNAIL_SIZE: u32 = 200;

/// Upper `vol` bound of each image host shard, in order.
const BASKET_VOL_BOUNDS: [i64; 17] = [
    143, 287, 431, 719, 1007, 1061, 1115, 1169, 1313, 1601, 1655, 1919, 2045, 2189, 2405, 2621,
    2837,
];

/// Image URL for the first photo of an article on the static image hosts.
#[must_use]
pub fn image_url(nm_id: NmId) -> String {
    let nm = nm_id.get();
    let vol = nm / 100_000;
    let part = nm / 1_000;
    let basket = BASKET_VOL_BOUNDS
        .iter()
        .position(|bound| vol <= *bound)
        .map_or(BASKET_VOL_BOUNDS.len() + 1, |index| index + 1);
    format!("https://basket-{basket:02}.wbbasket.ru/vol{vol}/part{part}/{nm}/images/big/1.webp")
}

#[derive(Debug, Deserialize)]
struct CardResponse {
    data: Option<CardData>,
}

#[derive(Debug, Deserialize)]
struct CardData {
    #[serde(default)]
    products: Vec<CardProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardProduct {
    id: i64,
    name: Option<String>,
    review_rating: Option<f64>,
    feedbacks: Option<i32>,
}

/// Enriches products from the public card-detail JSON endpoint.
#[derive(Debug, Clone)]
pub struct CardEnricher {
    client: Client,
    card_url: String,
}

impl CardEnricher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(card_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            card_url: card_url.into(),
        })
    }

    async fn thumbnail(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        render_thumbnail(&bytes)
    }
}

/// Downscale an image to fit the thumbnail box and encode it as JPEG.
pub fn render_thumbnail(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).map_err(|e| Error::Parse(e.to_string()))?;
    let resized = decoded.resize(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);
    let mut out = Cursor::new(Vec::new());
    resized
        .to_rgb8()
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| Error::Parse(e.to_string()))?;
    Ok(out.into_inner())
}

#[async_trait]
impl ProductEnricher for CardEnricher {
    async fn details(&self, nm_id: NmId) -> Result<ProductDetails> {
        let response: CardResponse = self
            .client
            .get(&self.card_url)
            .query(&[
                ("appType", "1".to_string()),
                ("curr", "rub".to_string()),
                ("dest", "-1257786".to_string()),
                ("nm", nm_id.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let card = response
            .data
            .and_then(|data| data.products.into_iter().find(|p| p.id == nm_id.get()))
            .ok_or_else(|| Error::NotFound(format!("catalog card {nm_id}")))?;

        let image_url = image_url(nm_id);
        let thumbnail = match self.thumbnail(&image_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(nm_id = %nm_id, error = %e, "thumbnail unavailable");
                None
            }
        };

        Ok(ProductDetails {
            title: card.name,
            rating: card.review_rating,
            reviews: card.feedbacks,
            image_url: Some(image_url),
            thumbnail,
        })
    }
}
