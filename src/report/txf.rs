//! TurboTax import in Tax Exchange Format (TXF) v042

use super::form8949::description;
use crate::basis::{MatchedLot, Term};
use crate::utils::{format_date, format_usd};
use chrono::NaiveDate;
use std::io::{self, Write};

/// TXF reference number for a capital gain record of the given term
fn reference_number(term: Term) -> u32 {
    match term {
        Term::Short => 712,
        Term::Long => 714,
    }
}

pub fn write_txf<W: Write>(lots: &[MatchedLot], exported_on: NaiveDate, mut writer: W) -> io::Result<()> {
    writeln!(writer, "V042")?;
    writeln!(writer, "A{}", env!("CARGO_PKG_NAME"))?;
    writeln!(writer, "D {}", format_date(exported_on))?;
    writeln!(writer, "^")?;

    for lot in lots {
        writeln!(writer, "TD")?;
        writeln!(writer, "N{}", reference_number(lot.term()))?;
        writeln!(writer, "C1")?;
        writeln!(writer, "L1")?;
        writeln!(writer, "P{}", description(lot))?;
        match lot.acquired {
            Some(acquired) => writeln!(writer, "D{}", format_date(acquired))?,
            None => writeln!(writer, "DVARIOUS")?,
        }
        writeln!(writer, "D{}", format_date(lot.disposed))?;
        writeln!(writer, "${}", format_usd(lot.basis))?;
        writeln!(writer, "${}", format_usd(lot.proceeds))?;
        writeln!(writer, "^")?;
    }
    writer.flush()
}
