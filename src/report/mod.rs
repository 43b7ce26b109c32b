pub mod form8949;
pub mod pdf;
pub mod txf;

use crate::basis::BasisReport;
use anyhow::Context;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Write `<output_name>_8949.pdf` and `<output_name>_8949.csv` into `dir`
pub fn write_form8949(
    report: &BasisReport,
    output_name: &str,
    filer_name: &str,
    ssn: &str,
    dir: &Path,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let pdf_path = dir.join(format!("{}_8949.pdf", output_name));
    fs::write(&pdf_path, form8949::render_pdf(report, filer_name, ssn))
        .with_context(|| format!("writing {}", pdf_path.display()))?;

    let csv_path = dir.join(format!("{}_8949.csv", output_name));
    let file =
        File::create(&csv_path).with_context(|| format!("creating {}", csv_path.display()))?;
    form8949::write_csv(report, BufWriter::new(file))
        .with_context(|| format!("writing {}", csv_path.display()))?;

    log::info!(
        "Wrote Form 8949 to {} and {}",
        pdf_path.display(),
        csv_path.display()
    );
    Ok((pdf_path, csv_path))
}

/// Write `turbotax_<year>.txf` into `dir`
pub fn write_turbotax(report: &BasisReport, exported_on: NaiveDate, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("turbotax_{}.txf", report.year));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    txf::write_txf(&report.lots, exported_on, BufWriter::new(file))
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote TurboTax import to {}", path.display());
    Ok(path)
}
