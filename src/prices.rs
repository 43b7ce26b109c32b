use crate::assets::split_pair;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

/// Prices older than this many days are not used to value a trade
pub const MAX_PRICE_AGE_DAYS: i64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("no {product} price found for {at}")]
    NotFound { product: String, at: DateTime<Utc> },
    #[error("latest {product} price before {at} is from {last}, more than {} days earlier", MAX_PRICE_AGE_DAYS)]
    Stale {
        product: String,
        at: DateTime<Utc>,
        last: DateTime<Utc>,
    },
    #[error("{product} price at {date_time} must be positive, got {rate}")]
    NonPositive {
        product: String,
        date_time: DateTime<Utc>,
        rate: Decimal,
    },
    #[error("invalid price pair '{0}', expected BASE-QUOTE")]
    InvalidPair(String),
    #[error("invalid price date_time '{0}'")]
    InvalidDate(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Historical price lookup for a trading pair at a point in time
pub trait PriceSource {
    fn price(&self, at: DateTime<Utc>, product: &str) -> Result<Decimal, PriceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub date_time: DateTime<Utc>,
    pub rate: Decimal,
}

/// Historical prices keyed by canonical pair, e.g. `BTC-USD`
#[derive(Debug, Default, Clone)]
pub struct Prices {
    prices: HashMap<String, Vec<Price>>,
}

#[derive(Debug, Deserialize)]
struct Record {
    date_time: String,
    product: String,
    price: Decimal,
}

impl Prices {
    pub fn read_csv<R: Read>(reader: R) -> Result<Prices, PriceError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut prices = Prices::default();
        for record in rdr.deserialize::<Record>() {
            let record = record?;
            let date_time = parse_date_time(&record.date_time)?;
            prices.insert(&record.product, date_time, record.price)?;
        }
        log::info!(
            "Read {} prices for {} pairs",
            prices.prices.values().map(Vec::len).sum::<usize>(),
            prices.prices.len()
        );
        Ok(prices)
    }

    pub fn insert(
        &mut self,
        product: &str,
        date_time: DateTime<Utc>,
        rate: Decimal,
    ) -> Result<(), PriceError> {
        let key = canonical_pair(product)?;
        if rate <= Decimal::ZERO {
            return Err(PriceError::NonPositive {
                product: key,
                date_time,
                rate,
            });
        }
        let pair_prices = self.prices.entry(key).or_default();
        let idx = pair_prices.partition_point(|p| p.date_time <= date_time);
        pair_prices.insert(idx, Price { date_time, rate });
        Ok(())
    }

    /// The most recent price at or before `at`. When nothing precedes `at`, the
    /// earliest price on the same calendar day is used.
    pub fn get(&self, product: &str, at: DateTime<Utc>) -> Result<&Price, PriceError> {
        let key = canonical_pair(product)?;
        let not_found = || PriceError::NotFound {
            product: key.clone(),
            at,
        };
        let pair_prices = self.prices.get(&key).ok_or_else(not_found)?;

        let idx = pair_prices.partition_point(|p| p.date_time <= at);
        if idx == 0 {
            return pair_prices
                .first()
                .filter(|p| p.date_time.date_naive() == at.date_naive())
                .ok_or_else(not_found);
        }

        let price = &pair_prices[idx - 1];
        if at - price.date_time > Duration::days(MAX_PRICE_AGE_DAYS) {
            return Err(PriceError::Stale {
                product: key,
                at,
                last: price.date_time,
            });
        }
        Ok(price)
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceSource for Prices {
    fn price(&self, at: DateTime<Utc>, product: &str) -> Result<Decimal, PriceError> {
        self.get(product, at).map(|p| p.rate)
    }
}

fn canonical_pair(product: &str) -> Result<String, PriceError> {
    split_pair(product)
        .map(|(base, quote)| format!("{}-{}", base, quote))
        .ok_or_else(|| PriceError::InvalidPair(product.to_string()))
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DD HH:MM:SS` (UTC) or a date (midnight UTC)
fn parse_date_time(s: &str) -> Result<DateTime<Utc>, PriceError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| PriceError::InvalidDate(s.to_string()))
}
