use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::business::Business;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsFilter {
    pub require_phone: bool,
    pub require_website: bool,
    pub min_rating: f64,
}

impl StatsFilter {
    /// Unrated records (rating 0) are never dropped by the rating floor.
    pub fn accepts(&self, business: &Business) -> bool {
        if self.require_phone && business.phone.is_none() {
            return false;
        }
        if self.require_website && business.website.is_none() {
            return false;
        }
        !(business.rating != 0.0 && business.rating < self.min_rating)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub total: usize,
    pub with_phone: usize,
    pub with_website: usize,
    pub filtered_total: usize,
    pub average_rating: f64,
    /// Filtered records per rounded star rating, one through five.
    pub rating_distribution: [usize; 5],
}

impl MarketStats {
    pub fn compute(businesses: &[Business], filter: &StatsFilter) -> Option<Self> {
        if businesses.is_empty() {
            return None;
        }

        let filtered: Vec<&Business> = businesses
            .iter()
            .filter(|business| filter.accepts(business))
            .collect();

        let average_rating = if filtered.is_empty() {
            0.0
        } else {
            filtered.iter().map(|b| b.rating).sum::<f64>() / filtered.len() as f64
        };

        let mut rating_distribution = [0_usize; 5];
        for business in &filtered {
            let stars = business.rating.round();
            if (1.0..=5.0).contains(&stars) {
                rating_distribution[stars as usize - 1] += 1;
            }
        }

        Some(Self {
            total: businesses.len(),
            with_phone: businesses.iter().filter(|b| b.phone.is_some()).count(),
            with_website: businesses.iter().filter(|b| b.website.is_some()).count(),
            filtered_total: filtered.len(),
            average_rating,
            rating_distribution,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOption {
    RatingDesc,
    ReviewsDesc,
    NameAsc,
}

impl SortOption {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rating" | "rating_desc" => Some(SortOption::RatingDesc),
            "reviews" | "reviews_desc" => Some(SortOption::ReviewsDesc),
            "name" | "name_asc" => Some(SortOption::NameAsc),
            _ => None,
        }
    }
}

/// Stable sort, so ties keep their source order.
pub fn sort_businesses(businesses: &mut [Business], option: SortOption) {
    match option {
        SortOption::RatingDesc => businesses.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
        }),
        SortOption::ReviewsDesc => {
            businesses.sort_by(|a, b| b.review_count.cmp(&a.review_count))
        }
        SortOption::NameAsc => {
            businesses.sort_by_cached_key(|business| business.name.to_lowercase())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ingestion::normalize;

    fn sample() -> Vec<Business> {
        let raw = json!([
            { "name": "beta", "rating": 4.6, "reviewCount": 12, "phone": "1" },
            { "name": "Alpha", "rating": 3.2, "reviewCount": 400, "website": "https://a" },
            { "name": "gamma", "reviewCount": 3 },
            { "name": "Delta", "rating": 1.4, "phone": "2", "website": "https://d" }
        ])
        .to_string();
        normalize(&raw, "gym", "D1", &[])
    }

    #[test]
    fn computes_totals_and_distribution() {
        let stats = MarketStats::compute(&sample(), &StatsFilter::default()).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.with_phone, 2);
        assert_eq!(stats.with_website, 2);
        assert_eq!(stats.filtered_total, 4);
        assert_eq!(stats.rating_distribution, [1, 0, 1, 0, 1]);
        assert!((stats.average_rating - 2.3).abs() < 1e-9);
    }

    #[test]
    fn filter_keeps_unrated_records() {
        let filter = StatsFilter {
            min_rating: 4.0,
            ..StatsFilter::default()
        };
        let stats = MarketStats::compute(&sample(), &filter).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.filtered_total, 2);
    }

    #[test]
    fn filter_requires_contact_fields() {
        let filter = StatsFilter {
            require_phone: true,
            require_website: true,
            min_rating: 0.0,
        };
        let stats = MarketStats::compute(&sample(), &filter).unwrap();
        assert_eq!(stats.filtered_total, 1);
    }

    #[test]
    fn empty_input_has_no_stats() {
        assert!(MarketStats::compute(&[], &StatsFilter::default()).is_none());
    }

    #[test]
    fn sorts_by_each_option() {
        let mut records = sample();
        sort_businesses(&mut records, SortOption::NameAsc);
        let names: Vec<_> = records.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Delta", "gamma"]);

        sort_businesses(&mut records, SortOption::ReviewsDesc);
        assert_eq!(records[0].name, "Alpha");

        sort_businesses(&mut records, SortOption::RatingDesc);
        assert_eq!(records[0].name, "beta");
        assert_eq!(records[3].name, "gamma");
    }
}
