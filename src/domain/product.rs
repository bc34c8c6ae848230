//! Catalog product cache.

use chrono::{DateTime, Duration, Utc};

use super::id::{CredentialId, NmId};

/// Cached catalog details for one article.
///
/// Keyed globally by [`NmId`]; `owner_credential_id` only records which
/// credential first brought the article in.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub nm_id: NmId,
    pub owner_credential_id: CredentialId,
    pub subject_name: Option<String>,
    pub brand_name: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub thumbnail: Option<Vec<u8>>,
    pub last_update: DateTime<Utc>,
}

impl Product {
    /// Stale when older than `max_age` or never rated.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.rating.is_none() || now - self.last_update > max_age
    }
}

/// Descriptive fields known from the statistics payload at first sighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSeed {
    pub subject_name: Option<String>,
    pub brand_name: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
}

/// Details scraped from the public catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDetails {
    pub title: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub image_url: Option<String>,
    pub thumbnail: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(rating: Option<f64>, age_days: i64) -> Product {
        Product {
            nm_id: NmId::new(1),
            owner_credential_id: CredentialId::new(1),
            subject_name: None,
            brand_name: None,
            supplier_article: None,
            tech_size: None,
            image_url: None,
            rating,
            reviews: None,
            thumbnail: None,
            last_update: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn staleness_rules() {
        let now = Utc::now();
        let max_age = Duration::days(30);
        assert!(!product(Some(4.8), 1).is_stale(now, max_age));
        assert!(product(None, 1).is_stale(now, max_age));
        assert!(product(Some(4.8), 31).is_stale(now, max_age));
    }
}
