//! Ticker catalog
//!
//! Loads the ticker metadata file into an insertion-ordered index keyed by
//! symbol and answers pagination, lookup and grouping queries against it.
//! The catalog is built once and is read-only afterwards.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::models::TickerRecord;

mod page;
pub use page::TickerPage;

pub(crate) const REQUIRED_COLUMNS: [&str; 6] =
    ["Symbol", "Name", "Sector", "Industry", "Country", "Market Cap"];

/// Raw catalog row as it appears in the file
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Sector")]
    sector: String,
    #[serde(rename = "Industry")]
    industry: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Market Cap")]
    market_cap: String,
}

/// Ordered symbol -> record index with sector and industry groupings
#[derive(Debug, Clone, PartialEq)]
pub struct TickerCatalog {
    records: Vec<TickerRecord>,
    positions: HashMap<String, usize>,
    by_sector: HashMap<String, Vec<usize>>,
    by_industry: HashMap<String, Vec<usize>>,
}

impl TickerCatalog {
    /// Load the catalog from a CSV file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        info!("📋 Loading ticker catalog from {}", path.display());
        let file = File::open(path)?;
        let catalog = Self::from_reader(file)?;
        info!(
            "✅ Loaded {} tickers across {} sectors",
            catalog.len(),
            catalog.by_sector.len()
        );
        Ok(catalog)
    }

    /// Parse a catalog from any CSV source. Fails on the first row whose
    /// market cap is not a number.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(CatalogError::MalformedRecord {
                    line: 1,
                    reason: format!("missing required column '{}'", column),
                });
            }
        }

        let mut records: Vec<TickerRecord> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in reader.records() {
            let row = row.map_err(|e| malformed(&e))?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let parsed: CatalogRow = row.deserialize(Some(&headers)).map_err(|e| malformed(&e))?;

            let market_cap_billions = parse_market_cap(&parsed.market_cap).ok_or_else(|| {
                CatalogError::MalformedRecord {
                    line,
                    reason: format!(
                        "market cap '{}' for {} is not a number",
                        parsed.market_cap, parsed.symbol
                    ),
                }
            })?;

            let record = TickerRecord {
                symbol: parsed.symbol,
                name: parsed.name,
                sector: parsed.sector,
                industry: parsed.industry,
                country: parsed.country,
                market_cap_billions,
            };

            // Last occurrence wins but keeps the slot of the first one.
            match positions.get(&record.symbol) {
                Some(&index) => {
                    debug!("Duplicate symbol {} at line {}, overwriting", record.symbol, line);
                    records[index] = record;
                }
                None => {
                    positions.insert(record.symbol.clone(), records.len());
                    records.push(record);
                }
            }
        }

        let mut by_sector: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_industry: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            by_sector.entry(record.sector.clone()).or_default().push(index);
            by_industry.entry(record.industry.clone()).or_default().push(index);
        }

        Ok(Self {
            records,
            positions,
            by_sector,
            by_industry,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All symbols in file order
    pub fn list_symbols(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.symbol.as_str()).collect()
    }

    /// Records in file order
    pub fn records(&self) -> &[TickerRecord] {
        &self.records
    }

    pub fn get(&self, symbol: &str) -> Result<&TickerRecord, CatalogError> {
        self.positions
            .get(symbol)
            .map(|&index| &self.records[index])
            .ok_or_else(|| CatalogError::NotFound(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// One page of the catalog. Pages are 1-indexed; a page past the end is
    /// empty but still reports the catalog totals.
    pub fn page(&self, page_number: i64, page_size: i64) -> Result<TickerPage, CatalogError> {
        if page_number < 1 || page_size < 1 {
            return Err(CatalogError::InvalidPage {
                page: page_number,
                size: page_size,
            });
        }
        Ok(TickerPage::slice(&self.records, page_number as usize, page_size as usize))
    }

    /// Records whose sector equals `sector` exactly
    pub fn group_by_sector(&self, sector: &str) -> TickerGroup {
        self.group(self.by_sector.get(sector))
    }

    /// Records whose industry equals `industry` exactly
    pub fn group_by_industry(&self, industry: &str) -> TickerGroup {
        self.group(self.by_industry.get(industry))
    }

    /// Distinct sector labels, sorted
    pub fn sectors(&self) -> Vec<&str> {
        sorted_labels(&self.by_sector)
    }

    /// Distinct industry labels, sorted
    pub fn industries(&self) -> Vec<&str> {
        sorted_labels(&self.by_industry)
    }

    /// Fuzzy lookup on symbol and company name. Best matches first; equal
    /// scores keep file order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&TickerRecord> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default().ignore_case();
        let mut scored: Vec<(i64, usize)> = self
            .records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let by_symbol = matcher.fuzzy_match(&record.symbol, query);
                let by_name = matcher.fuzzy_match(&record.name, query);
                // Exact symbol hits always rank first
                let exact = record.symbol.eq_ignore_ascii_case(query).then_some(i64::MAX);
                exact.or(by_symbol.max(by_name)).map(|score| (score, index))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, index)| &self.records[index])
            .collect()
    }

    fn group(&self, indices: Option<&Vec<usize>>) -> TickerGroup {
        let records = indices
            .map(|indices| indices.iter().map(|&i| self.records[i].clone()).collect())
            .unwrap_or_default();
        TickerGroup { records }
    }
}

fn sorted_labels(index: &HashMap<String, Vec<usize>>) -> Vec<&str> {
    let mut labels: Vec<&str> = index.keys().map(String::as_str).collect();
    labels.sort_unstable();
    labels
}

/// Parse a raw market cap and convert it to billions. The raw value is
/// truncated to a whole number first, matching how the source data is
/// produced.
pub(crate) fn parse_market_cap(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() / 1_000_000_000.0)
}

fn malformed(error: &csv::Error) -> CatalogError {
    CatalogError::MalformedRecord {
        line: error.position().map(|p| p.line()).unwrap_or_default(),
        reason: error.to_string(),
    }
}

/// Ordered symbol -> record mapping returned by grouping queries.
/// Serializes as a JSON object whose keys keep catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerGroup {
    records: Vec<TickerRecord>,
}

impl TickerGroup {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.symbol.as_str()).collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&TickerRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickerRecord> {
        self.records.iter()
    }
}

impl From<Vec<TickerRecord>> for TickerGroup {
    fn from(records: Vec<TickerRecord>) -> Self {
        Self { records }
    }
}

impl Serialize for TickerGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.symbol, record)?;
        }
        map.end()
    }
}
