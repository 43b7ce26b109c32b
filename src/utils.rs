use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records.into_iter() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Round half away from zero to whole cents
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_usd(amount: Decimal) -> String {
    format!("{:.2}", round_cents(amount))
}

pub fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty.round_dp(8));
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

/// `MM/DD/YYYY`, as used on Form 8949 and in TXF records
pub fn format_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}
