//! Profit aggregation over closed-trade statements.
//!
//! A statement is a CSV export from a trading account. Only the `Close Date`,
//! `Symbol` and `Profit` columns are read.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::{Error, Result};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// One closed trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub close_time: NaiveDateTime,
    pub symbol: String,
    pub profit: f64,
}

/// Total profit for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolTotal {
    pub symbol: String,
    pub profit: f64,
}

/// Which headline total a profit series reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Cumulative,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitPoint {
    pub close_time: NaiveDateTime,
    pub profit: f64,
    pub cumulative_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitSeries {
    pub symbol: String,
    pub mode: ViewMode,
    pub total: f64,
    pub points: Vec<ProfitPoint>,
}

impl ProfitSeries {
    pub fn summary(&self) -> String {
        match self.mode {
            ViewMode::Cumulative => format!("Total Cumulative Profit: ${:.2}", self.total),
            ViewMode::Daily => format!("Total Daily Profit: ${:.2}", self.total),
        }
    }
}

/// Result of filtering a ledger down to one symbol and date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProfitSelection {
    Series(ProfitSeries),
    NoData { message: String },
}

impl ProfitSelection {
    fn empty() -> Self {
        ProfitSelection::NoData {
            message: "No data for selected range.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let ledger = Self::from_reader(file)?;
        info!(path = %path.display(), entries = ledger.entries.len(), "Ledger loaded");
        Ok(ledger)
    }

    /// Parse a statement. Rows with an unparseable date, an empty symbol or
    /// a non-numeric profit are dropped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers().map_err(csv_err)?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| Error::Csv(format!("statement has no '{name}' column")))
        };
        let (date_col, symbol_col, profit_col) =
            (column("Close Date")?, column("Symbol")?, column("Profit")?);

        let mut entries = Vec::new();
        let mut dropped = 0usize;
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");

            let close_time = parse_close_date(field(date_col));
            let symbol = field(symbol_col);
            let profit = field(profit_col).parse::<f64>().ok().filter(|p| p.is_finite());
            match (close_time, profit) {
                (Some(close_time), Some(profit)) if !symbol.is_empty() => {
                    entries.push(LedgerEntry {
                        close_time,
                        symbol: symbol.to_string(),
                        profit,
                    });
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(dropped, "Dropped unusable statement rows");
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Sorted unique symbols.
    pub fn symbols(&self) -> Vec<String> {
        self.totals().into_keys().map(str::to_string).collect()
    }

    /// Total profit per symbol, ordered by symbol.
    pub fn totals_by_symbol(&self) -> Vec<SymbolTotal> {
        self.totals()
            .into_iter()
            .map(|(symbol, profit)| SymbolTotal {
                symbol: symbol.to_string(),
                profit,
            })
            .collect()
    }

    /// Best `n` symbols by total profit.
    pub fn top(&self, n: usize) -> Vec<SymbolTotal> {
        let mut totals = self.totals_by_symbol();
        totals.sort_by(|a, b| b.profit.total_cmp(&a.profit).then_with(|| a.symbol.cmp(&b.symbol)));
        totals.truncate(n);
        totals
    }

    /// Worst `n` symbols by total profit.
    pub fn bottom(&self, n: usize) -> Vec<SymbolTotal> {
        let mut totals = self.totals_by_symbol();
        totals.sort_by(|a, b| a.profit.total_cmp(&b.profit).then_with(|| a.symbol.cmp(&b.symbol)));
        totals.truncate(n);
        totals
    }

    /// Profit for `symbol` grouped by close time within `[from, to]`.
    /// Open bounds select everything on that side.
    pub fn profit_series(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        mode: ViewMode,
    ) -> ProfitSelection {
        let mut grouped: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for entry in &self.entries {
            let day = entry.close_time.date();
            if entry.symbol != symbol
                || from.is_some_and(|f| day < f)
                || to.is_some_and(|t| day > t)
            {
                continue;
            }
            *grouped.entry(entry.close_time).or_default() += entry.profit;
        }
        if grouped.is_empty() {
            return ProfitSelection::empty();
        }

        let mut running = 0.0;
        let points: Vec<ProfitPoint> = grouped
            .into_iter()
            .map(|(close_time, profit)| {
                running += profit;
                ProfitPoint {
                    close_time,
                    profit,
                    cumulative_profit: running,
                }
            })
            .collect();
        let total = match mode {
            ViewMode::Cumulative => points.last().map_or(0.0, |p| p.cumulative_profit),
            ViewMode::Daily => points.iter().map(|p| p.profit).sum(),
        };

        ProfitSelection::Series(ProfitSeries {
            symbol: symbol.to_string(),
            mode,
            total,
            points,
        })
    }

    fn totals(&self) -> BTreeMap<&str, f64> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for entry in &self.entries {
            *totals.entry(entry.symbol.as_str()).or_default() += entry.profit;
        }
        totals
    }
}

/// Export a filtered series as `Close Date, Profit, Cumulative Profit`.
pub fn write_csv<W: Write>(series: &ProfitSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Close Date", "Profit", "Cumulative Profit"])
        .map_err(csv_err)?;
    for point in &series.points {
        wtr.write_record([
            point.close_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            point.profit.to_string(),
            point.cumulative_profit.to_string(),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn parse_close_date(raw: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn csv_err(e: csv::Error) -> Error {
    Error::Csv(e.to_string())
}
