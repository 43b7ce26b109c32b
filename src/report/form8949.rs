//! Form 8949, Sales and Other Dispositions of Capital Assets

use super::pdf::{Document, Font, Page, PAGE_WIDTH};
use crate::basis::{BasisReport, MatchedLot, Term, Totals};
use crate::utils::{format_date, format_quantity, format_usd, round_cents};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use tabled::Tabled;

pub const ROWS_PER_PAGE: usize = 14;

/// One line of Form 8949, columns (a) to (e) and (h)
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct Form8949Row {
    #[tabled(rename = "Term")]
    pub term: &'static str,
    #[tabled(rename = "(a) Description")]
    pub description: String,
    #[tabled(rename = "(b) Acquired")]
    pub date_acquired: String,
    #[tabled(rename = "(c) Sold")]
    pub date_sold: String,
    #[tabled(rename = "(d) Proceeds")]
    pub proceeds: String,
    #[tabled(rename = "(e) Cost Basis")]
    pub cost_basis: String,
    #[tabled(rename = "(h) Gain/Loss")]
    pub gain: String,
}

impl From<&MatchedLot> for Form8949Row {
    fn from(lot: &MatchedLot) -> Self {
        let (proceeds, basis) = rounded(lot);
        Form8949Row {
            term: lot.term().display(),
            description: description(lot),
            date_acquired: lot
                .acquired
                .map_or_else(|| "VARIOUS".to_string(), format_date),
            date_sold: format_date(lot.disposed),
            proceeds: format_usd(proceeds),
            cost_basis: format_usd(basis),
            gain: format_usd(proceeds - basis),
        }
    }
}

/// Proceeds and basis in whole cents, so a row's gain is exactly their difference
fn rounded(lot: &MatchedLot) -> (Decimal, Decimal) {
    (round_cents(lot.proceeds), round_cents(lot.basis))
}

/// Totals of the rounded row amounts, matching what the form shows
pub fn form_totals<'a, I>(lots: I) -> Totals
where
    I: IntoIterator<Item = &'a MatchedLot>,
{
    lots.into_iter().fold(Totals::default(), |acc, lot| {
        let (proceeds, basis) = rounded(lot);
        Totals {
            proceeds: acc.proceeds + proceeds,
            basis: acc.basis + basis,
            gain: acc.gain + proceeds - basis,
        }
    })
}

/// Form totals for one holding term, or every lot when `term` is `None`
pub fn report_totals(report: &BasisReport, term: Option<Term>) -> Totals {
    form_totals(
        report
            .lots
            .iter()
            .filter(|lot| term.map_or(true, |t| lot.term() == t)),
    )
}

pub fn description(lot: &MatchedLot) -> String {
    format!("{} {}", format_quantity(lot.quantity), lot.product)
}

pub fn rows(report: &BasisReport) -> Vec<Form8949Row> {
    [Term::Short, Term::Long]
        .into_iter()
        .flat_map(|term| report.lots_for(term).map(Form8949Row::from))
        .collect()
}

pub fn write_csv<W: Write>(report: &BasisReport, writer: W) -> anyhow::Result<()> {
    crate::utils::write_csv(rows(report), writer)
}

const MARGIN: f32 = 36.0;
const TABLE_TOP: f32 = 470.0;
const ROW_HEIGHT: f32 = 22.0;
const SSN_X: f32 = 576.0;

fn ssn_label(ssn: &str) -> String {
    format!("SSN or TIN: {}", ssn)
}

/// Left edge of each printed column
const COLUMNS: [(f32, &str, &str); 8] = [
    (36.0, "(a)", "Description of property"),
    (226.0, "(b)", "Date acquired"),
    (306.0, "(c)", "Date sold"),
    (386.0, "(d)", "Proceeds"),
    (476.0, "(e)", "Cost or other basis"),
    (576.0, "(f)", "Code"),
    (616.0, "(g)", "Adjustment"),
    (686.0, "(h)", "Gain or (loss)"),
];

/// Render the report as Form 8949 pages, short-term lots (Part I) first.
///
/// A report with no lots still produces a single, empty Part I page.
pub fn render_pdf(report: &BasisReport, filer_name: &str, ssn: &str) -> Vec<u8> {
    let mut parts: Vec<(Term, Vec<&MatchedLot>)> = [Term::Short, Term::Long]
        .into_iter()
        .map(|term| (term, report.lots_for(term).collect::<Vec<_>>()))
        .filter(|(_, lots)| !lots.is_empty())
        .collect();
    if parts.is_empty() {
        parts.push((Term::Short, Vec::new()));
    }

    let pages: Vec<(Term, &[&MatchedLot])> = parts
        .iter()
        .flat_map(|(term, lots)| {
            let chunks: Vec<&[&MatchedLot]> = if lots.is_empty() {
                vec![&lots[..]]
            } else {
                lots.chunks(ROWS_PER_PAGE).collect()
            };
            chunks.into_iter().map(move |chunk| (*term, chunk))
        })
        .collect();

    let mut doc = Document::default();
    let count = pages.len();
    for (i, (term, lots)) in pages.into_iter().enumerate() {
        let page = doc.add_page();
        page_header(page, report.year, term, filer_name, ssn);
        page_rows(page, lots);
        page.text(
            MARGIN,
            MARGIN,
            Font::Regular,
            8.0,
            &format!("Page {} of {}", i + 1, count),
        );
    }
    log::debug!("Rendered Form 8949 with {} pages", doc.page_count());
    doc.to_bytes()
}

fn page_header(page: &mut Page, year: i32, term: Term, filer_name: &str, ssn: &str) {
    let right = PAGE_WIDTH - MARGIN;
    page.text(
        MARGIN,
        570.0,
        Font::Bold,
        14.0,
        &format!("Form 8949 ({})  Sales and Other Dispositions of Capital Assets", year),
    );
    page.text(
        MARGIN,
        548.0,
        Font::Regular,
        9.0,
        &format!("Name(s) shown on return: {}", filer_name),
    );
    page.text(SSN_X, 548.0, Font::Regular, 9.0, &ssn_label(ssn));
    page.line(MARGIN, 540.0, right, 540.0);

    let (part, title, checkbox) = match term {
        Term::Short => (
            "Part I",
            "Short-Term. Transactions involving capital assets you held 1 year or less",
            "(C) Short-term transactions not reported to you on Form 1099-B",
        ),
        Term::Long => (
            "Part II",
            "Long-Term. Transactions involving capital assets you held more than 1 year",
            "(F) Long-term transactions not reported to you on Form 1099-B",
        ),
    };
    page.text(MARGIN, 522.0, Font::Bold, 11.0, &format!("{}  {}", part, title));
    page.text(MARGIN, 506.0, Font::Regular, 9.0, &format!("[X] {}", checkbox));

    for (x, letter, heading) in COLUMNS {
        page.text(x, 488.0, Font::Bold, 8.0, letter);
        page.text(x, 478.0, Font::Regular, 7.0, heading);
    }
    page.line(MARGIN, TABLE_TOP + 2.0, right, TABLE_TOP + 2.0);
}

fn page_rows(page: &mut Page, lots: &[&MatchedLot]) {
    for (i, lot) in lots.iter().enumerate() {
        let row = Form8949Row::from(*lot);

        let y = TABLE_TOP - ROW_HEIGHT * (i as f32 + 1.0) + 6.0;
        let cells = [
            row.description.as_str(),
            row.date_acquired.as_str(),
            row.date_sold.as_str(),
            row.proceeds.as_str(),
            row.cost_basis.as_str(),
            "",
            "",
            row.gain.as_str(),
        ];
        for ((x, _, _), cell) in COLUMNS.iter().zip(cells) {
            page.text(*x, y, Font::Regular, 9.0, cell);
        }
        let rule = TABLE_TOP - ROW_HEIGHT * (i as f32 + 1.0);
        page.line(MARGIN, rule, PAGE_WIDTH - MARGIN, rule);
    }

    let totals = form_totals(lots.iter().copied());
    let y = TABLE_TOP - ROW_HEIGHT * (ROWS_PER_PAGE as f32 + 1.0);
    page.line(MARGIN, y + ROW_HEIGHT - 4.0, PAGE_WIDTH - MARGIN, y + ROW_HEIGHT - 4.0);
    page.text(COLUMNS[0].0, y, Font::Bold, 9.0, "Totals");
    page.text(COLUMNS[3].0, y, Font::Bold, 9.0, &format_usd(totals.proceeds));
    page.text(COLUMNS[4].0, y, Font::Bold, 9.0, &format_usd(totals.basis));
    page.text(COLUMNS[7].0, y, Font::Bold, 9.0, &format_usd(totals.gain));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisPolicy;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(acquired: Option<NaiveDate>, proceeds: Decimal, basis: Decimal) -> MatchedLot {
        MatchedLot {
            product: "BTC".to_string(),
            quantity: dec!(0.50000000),
            acquired,
            disposed: date(2018, 6, 1),
            proceeds,
            basis,
        }
    }

    fn report(lots: Vec<MatchedLot>) -> BasisReport {
        BasisReport {
            year: 2018,
            policy: BasisPolicy::Highest,
            lots,
            warnings: vec![],
        }
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn row_formatting() {
        let row = Form8949Row::from(&lot(
            Some(date(2017, 1, 2)),
            dec!(4000.005),
            dec!(2500.004),
        ));
        assert_eq!(row.term, "Long-term");
        assert_eq!(row.description, "0.5 BTC");
        assert_eq!(row.date_acquired, "01/02/2017");
        assert_eq!(row.date_sold, "06/01/2018");
        assert_eq!(row.proceeds, "4000.01");
        assert_eq!(row.cost_basis, "2500.00");
        assert_eq!(row.gain, "1500.01");
    }

    #[test]
    fn unknown_acquisition_is_various() {
        let row = Form8949Row::from(&lot(None, dec!(100), dec!(0)));
        assert_eq!(row.date_acquired, "VARIOUS");
        assert_eq!(row.term, "Short-term");
    }

    #[test]
    fn rows_short_term_first() {
        let report = report(vec![
            lot(Some(date(2016, 1, 1)), dec!(10), dec!(5)),
            lot(Some(date(2018, 1, 1)), dec!(20), dec!(5)),
        ]);
        let rows = rows(&report);
        assert_eq!(rows[0].term, "Short-term");
        assert_eq!(rows[1].term, "Long-term");
    }

    #[test]
    fn csv_has_header_and_one_line_per_lot() {
        let report = report(vec![lot(Some(date(2018, 1, 1)), dec!(20), dec!(5))]);
        let mut out = Vec::new();
        write_csv(&report, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("term,description,date_acquired,date_sold,proceeds,cost_basis,gain")
        );
        assert_eq!(
            lines.next(),
            Some("Short-term,0.5 BTC,01/01/2018,06/01/2018,20.00,5.00,15.00")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn paginates_fourteen_rows_per_page() {
        let mut lots: Vec<MatchedLot> = (0..15)
            .map(|_| lot(Some(date(2018, 1, 1)), dec!(20), dec!(5)))
            .collect();
        lots.push(lot(Some(date(2016, 1, 1)), dec!(20), dec!(5)));
        let pdf = String::from_utf8(render_pdf(&report(lots), "Satoshi", "123-45-6789")).unwrap();

        assert!(pdf.contains("/Count 3"));
        assert_eq!(count(&pdf, "Part I  Short-Term"), 2);
        assert_eq!(count(&pdf, "Part II  Long-Term"), 1);
        assert!(pdf.contains("(Page 3 of 3)"));
        assert_eq!(count(&pdf, "(Name\\(s\\) shown on return: Satoshi)"), 3);
        // first short-term page totals 14 rows, the second only one
        assert!(pdf.contains("(280.00)"));
        assert_eq!(count(&pdf, "(210.00)"), 1);
    }

    #[test]
    fn form_totals_sum_rounded_rows() {
        let report = report(vec![
            lot(Some(date(2018, 1, 1)), dec!(10.005), dec!(1.004)),
            lot(Some(date(2018, 1, 1)), dec!(10.005), dec!(1.004)),
            lot(Some(date(2016, 1, 1)), dec!(5), dec!(1)),
        ]);
        // exact amounts would total 20.01 proceeds and 2.01 basis
        let short = report_totals(&report, Some(Term::Short));
        assert_eq!(short.proceeds, dec!(20.02));
        assert_eq!(short.basis, dec!(2.00));
        assert_eq!(short.gain, dec!(18.02));

        let all = report_totals(&report, None);
        assert_eq!(all.proceeds, dec!(25.02));
        assert_eq!(all.gain, dec!(22.02));
    }

    #[test]
    fn ssn_label_fits_inside_right_margin() {
        // Helvetica glyphs are at most 0.6em wide for digits, capitals and punctuation
        let label = ssn_label("123-45-6789");
        let width = label.len() as f32 * 9.0 * 0.6;
        assert!(SSN_X + width <= PAGE_WIDTH - MARGIN, "{} ends at {}", label, SSN_X + width);

        let pdf = String::from_utf8(render_pdf(&report(vec![]), "Satoshi", "123-45-6789")).unwrap();
        assert!(pdf.contains("(SSN or TIN: 123-45-6789) Tj"));
    }

    #[test]
    fn empty_report_renders_one_page() {
        let pdf = String::from_utf8(render_pdf(&report(vec![]), "Satoshi", "-")).unwrap();
        assert!(pdf.contains("/Count 1"));
        assert!(pdf.contains("Part I  Short-Term"));
        assert!(pdf.contains("(0.00) Tj"));
    }
}
