pub mod bittrex;
pub mod coinbase;
pub mod gdax;
pub mod poloniex;

use crate::config::ExchangeConfig;
use crate::csv_schema::{clean_header, CsvSchema};
use crate::orders::{OrderError, RawOrder};
use crate::prices::{PriceError, PriceSource, Prices};
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{exchange} export is missing required columns: {columns}")]
    MissingColumns {
        exchange: &'static str,
        columns: String,
    },
    #[error("invalid date '{value}'")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid number '{0}'")]
    InvalidDecimal(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Source of orders and historical prices for a single exchange account
pub trait ExchangeAdapter: PriceSource {
    fn name(&self) -> &'static str;

    /// All orders from the account, split by buy/sell indicator
    fn buys_sells(&self) -> anyhow::Result<(Vec<RawOrder>, Vec<RawOrder>)>;
}

/// A row of an exchange export
pub trait ExchangeRecord: DeserializeOwned + CsvSchema {
    const EXCHANGE: &'static str;

    /// Convert to an order, or `None` for rows that are not trades
    fn into_order(self) -> Result<Option<RawOrder>, ExchangeError>;
}

pub type Constructor = fn(&ExchangeConfig) -> anyhow::Result<Box<dyn ExchangeAdapter>>;

/// Supported exchanges, by the identifier used as their config key
pub const REGISTRY: &[(&str, Constructor)] = &[
    ("gdax", gdax::Gdax::open as Constructor),
    ("coinbase", coinbase::Coinbase::open as Constructor),
    ("bittrex", bittrex::Bittrex::open as Constructor),
    ("poloniex", poloniex::Poloniex::open as Constructor),
];

pub fn lookup(name: &str) -> Option<Constructor> {
    REGISTRY
        .iter()
        .find(|(id, _)| *id == name)
        .map(|(_, constructor)| *constructor)
}

pub fn supported() -> Vec<&'static str> {
    REGISTRY.iter().map(|(id, _)| *id).collect()
}

/// Adapter over an exchange CSV export and a price file
pub struct CsvExchange<R> {
    file: std::path::PathBuf,
    prices: Prices,
    _record: std::marker::PhantomData<fn() -> R>,
}

impl<R: ExchangeRecord + 'static> CsvExchange<R> {
    pub fn open(config: &ExchangeConfig) -> anyhow::Result<Box<dyn ExchangeAdapter>> {
        let prices = match &config.prices {
            Some(path) => read_prices(path)?,
            None => {
                log::debug!("No price file configured for {}", R::EXCHANGE);
                Prices::default()
            }
        };
        Ok(Box::new(CsvExchange::<R> {
            file: config.file.clone(),
            prices,
            _record: std::marker::PhantomData,
        }))
    }
}

impl<R: ExchangeRecord> PriceSource for CsvExchange<R> {
    fn price(&self, at: DateTime<Utc>, product: &str) -> Result<Decimal, PriceError> {
        self.prices.price(at, product)
    }
}

impl<R: ExchangeRecord> ExchangeAdapter for CsvExchange<R> {
    fn name(&self) -> &'static str {
        R::EXCHANGE
    }

    fn buys_sells(&self) -> anyhow::Result<(Vec<RawOrder>, Vec<RawOrder>)> {
        let file = File::open(&self.file)
            .with_context(|| format!("opening {} export {}", R::EXCHANGE, self.file.display()))?;
        let orders = csv_to_orders::<R, _>(file)
            .with_context(|| format!("reading {} export {}", R::EXCHANGE, self.file.display()))?;
        if self.prices.is_empty() && orders.iter().any(|o| !crate::assets::is_fiat(&o.currency)) {
            log::warn!(
                "{} has coin-coin orders but no price file is configured",
                R::EXCHANGE
            );
        }
        Ok(orders.into_iter().partition(RawOrder::is_buy))
    }
}

fn read_prices(path: &Path) -> anyhow::Result<Prices> {
    let file =
        File::open(path).with_context(|| format!("opening price file {}", path.display()))?;
    Prices::read_csv(file).with_context(|| format!("reading price file {}", path.display()))
}

/// Read an exchange export, checking its header row before deserializing records
pub fn csv_to_orders<R, Rd>(reader: Rd) -> Result<Vec<RawOrder>, ExchangeError>
where
    R: ExchangeRecord,
    Rd: Read,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers: csv::StringRecord = rdr.headers()?.iter().map(clean_header).collect();
    let missing = R::missing_columns(&headers);
    if !missing.is_empty() {
        let columns = missing
            .iter()
            .map(|field| field.describe())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ExchangeError::MissingColumns {
            exchange: R::EXCHANGE,
            columns,
        });
    }
    rdr.set_headers(headers);

    let records: Result<Vec<R>, _> = rdr.deserialize().collect();
    let records = records?;
    log::info!("Read {} {} csv records", records.len(), R::EXCHANGE);

    let mut orders = Vec::new();
    for record in records {
        if let Some(order) = record.into_order()? {
            orders.push(order.validated()?);
        }
    }
    orders.sort_by_key(|o| o.time);
    Ok(orders)
}

/// Parse an exchange timestamp as UTC, trying RFC 3339 before each naive format
pub(crate) fn parse_time(value: &str, formats: &[&str]) -> Result<DateTime<Utc>, ExchangeError> {
    let value = value.trim();
    let rfc3339 = DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc));
    let mut result = rfc3339;
    for format in formats {
        if result.is_ok() {
            break;
        }
        result = NaiveDateTime::parse_from_str(value, format).map(|dt| dt.and_utc());
    }
    result.map_err(|source| ExchangeError::DateParse {
        value: value.to_string(),
        source,
    })
}

/// Parse an exported number, ignoring currency symbols and thousands separators
pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, ExchangeError> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| ExchangeError::InvalidDecimal(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn registry_lookup() {
        assert!(lookup("gdax").is_some());
        assert!(lookup("poloniex").is_some());
        assert!(lookup("mtgox").is_none());
        assert_eq!(supported(), vec!["gdax", "coinbase", "bittrex", "poloniex"]);
    }

    #[test]
    fn parse_time_formats() {
        let rfc = parse_time("2018-11-20T21:39:45.667Z", &[]).unwrap();
        assert_eq!(rfc.to_rfc3339(), "2018-11-20T21:39:45.667+00:00");

        let naive = parse_time("2018-05-01 12:00:00", &["%Y-%m-%d %H:%M:%S"]).unwrap();
        assert_eq!(naive.to_rfc3339(), "2018-05-01T12:00:00+00:00");

        assert!(matches!(
            parse_time("May 1st", &["%Y-%m-%d %H:%M:%S"]),
            Err(ExchangeError::DateParse { .. })
        ));
    }

    #[test]
    fn parse_decimal_strips_formatting() {
        assert_eq!(parse_decimal("$1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal(" -0.5 ").unwrap(), dec!(-0.5));
        assert_eq!(parse_decimal("1e-3").unwrap(), dec!(0.001));
        assert!(parse_decimal("n/a").is_err());
    }
}
