//! Run command - collect exchange orders, match cost basis and write the tax forms

use crate::basis::{self, BasisReport, Term};
use crate::config::Config;
use crate::exchanges;
use crate::normalize::normalize;
use crate::orders::{self, Order};
use crate::report;
use crate::utils::format_usd;
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table,
};

#[derive(Args, Debug)]
pub struct RunCommand {
    /// YAML configuration file
    #[arg(long, default_value = "config.yml")]
    input: PathBuf,
}

impl RunCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let config = Config::load(&self.input)?;
        log::info!(
            "Preparing {} tax year for {} using {} cost basis",
            config.year,
            config.name,
            config.basis
        );

        let (buys, sells) = collect_orders(&config)?;
        let report = basis::cost_basis(&sells, &buys, config.basis, config.year);

        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;
        report::write_form8949(
            &report,
            &config.output_name,
            &config.name,
            &config.ssn,
            &config.output_dir,
        )?;
        if config.txf {
            let today = chrono::Local::now().date_naive();
            report::write_turbotax(&report, today, &config.output_dir)?;
        }

        print_summary(&report);
        Ok(())
    }
}

/// Buys and sells from every configured exchange, USD settled and in time order
fn collect_orders(config: &Config) -> anyhow::Result<(Vec<Order>, Vec<Order>)> {
    let mut buys = Vec::new();
    let mut sells = Vec::new();
    for (name, exchange_config) in config.exchanges()? {
        let open = exchanges::lookup(name)
            .ok_or_else(|| anyhow::anyhow!("exchange '{}' is not registered", name))?;
        let exchange = open(&exchange_config)?;
        log::info!("Getting orders from {}", exchange.name());
        let (raw_buys, raw_sells) = exchange.buys_sells()?;
        let normalized = normalize(exchange.as_ref(), raw_buys, raw_sells)
            .with_context(|| format!("normalizing {} orders", exchange.name()))?;
        if normalized.dropped > 0 {
            log::warn!(
                "Dropped {} {} orders with an unknown buy/sell type",
                normalized.dropped,
                exchange.name()
            );
        }
        buys.extend(normalized.buys);
        sells.extend(normalized.sells);
    }

    log::info!("Sorting {} buys and {} sells", buys.len(), sells.len());
    orders::sort_by_time(&mut buys);
    orders::sort_by_time(&mut sells);
    Ok((buys, sells))
}

fn print_summary(report: &BasisReport) {
    let rows = report::form8949::rows(report);
    if rows.is_empty() {
        println!("No disposals in {}", report.year);
    } else {
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    println!();
    println!("TAX YEAR {} ({} cost basis)", report.year, report.policy);
    for (label, term) in [
        ("Short-term", Some(Term::Short)),
        ("Long-term", Some(Term::Long)),
        ("Total", None),
    ] {
        let totals = report::form8949::report_totals(report, term);
        println!(
            "  {:<12} proceeds ${:>14}  basis ${:>14}  gain ${:>14}",
            label,
            format_usd(totals.proceeds),
            format_usd(totals.basis),
            format_usd(totals.gain)
        );
    }
    if !report.warnings.is_empty() {
        println!("  {} warnings, see log output", report.warnings.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        run: RunCommand,
    }

    #[test]
    fn input_is_the_only_flag() {
        let cli = Cli::try_parse_from(["cointaxes", "--input", "taxes.yml"]).unwrap();
        assert_eq!(cli.run.input, PathBuf::from("taxes.yml"));

        let cli = Cli::try_parse_from(["cointaxes"]).unwrap();
        assert_eq!(cli.run.input, PathBuf::from("config.yml"));

        assert!(Cli::try_parse_from(["cointaxes", "-i", "taxes.yml"]).is_err());
    }
}
