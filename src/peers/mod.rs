//! Peer groups built from the company file.
//!
//! Groups are computed once at load time. Peers come back in file order;
//! the market cap column is carried but never used for ranking.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::error::CatalogError;
use crate::models::{PeerCompany, PeerKind};

pub const DEFAULT_PEER_COUNT: usize = 5;

const REQUIRED_COLUMNS: [&str; 6] = [
    "Sector",
    "Industry",
    "Symbol",
    "Shortname",
    "Marketcap",
    "Currentprice",
];

#[derive(Debug, Deserialize)]
struct CompanyRow {
    #[serde(rename = "Sector")]
    sector: String,
    #[serde(rename = "Industry")]
    industry: String,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Shortname")]
    short_name: String,
    #[serde(rename = "Marketcap")]
    market_cap: String,
    #[serde(rename = "Currentprice")]
    current_price: String,
}

#[derive(Debug, Clone, Default)]
pub struct PeerGrouper {
    companies: Vec<PeerCompany>,
    by_sector: HashMap<String, Vec<usize>>,
    by_industry: HashMap<String, Vec<usize>>,
}

impl PeerGrouper {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        info!("📋 Loading peer companies from {}", path.display());
        let grouper = Self::from_reader(File::open(path)?)?;
        info!(
            "✅ Grouped {} companies into {} sectors and {} industries",
            grouper.companies.len(),
            grouper.by_sector.len(),
            grouper.by_industry.len()
        );
        Ok(grouper)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h == **column))
        {
            return Err(CatalogError::MalformedRecord {
                line: 1,
                reason: format!("missing required column '{}'", missing),
            });
        }

        let mut grouper = Self::default();
        for row in reader.records() {
            let row = row.map_err(|e| CatalogError::MalformedRecord {
                line: e.position().map(|p| p.line()).unwrap_or_default(),
                reason: e.to_string(),
            })?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let parsed: CompanyRow = row
                .deserialize(Some(&headers))
                .map_err(|e| CatalogError::MalformedRecord {
                    line,
                    reason: e.to_string(),
                })?;

            grouper.push(PeerCompany {
                sector: parsed.sector,
                industry: parsed.industry,
                symbol: parsed.symbol,
                short_name: parsed.short_name,
                market_cap: parse_optional(&parsed.market_cap),
                current_price: parse_optional(&parsed.current_price),
            });
        }

        Ok(grouper)
    }

    /// Rows with a blank sector or industry stay out of that grouping
    fn push(&mut self, company: PeerCompany) {
        let index = self.companies.len();
        if !company.sector.is_empty() {
            self.by_sector
                .entry(company.sector.clone())
                .or_default()
                .push(index);
        }
        if !company.industry.is_empty() {
            self.by_industry
                .entry(company.industry.clone())
                .or_default()
                .push(index);
        }
        self.companies.push(company);
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Symbols of the first `n` companies in the group, in file order with
    /// repeats dropped. Dedup runs over those `n` rows only, so fewer than
    /// `n` symbols may come back. Unknown labels give an empty list.
    pub fn top_peers(&self, label: &str, kind: PeerKind, n: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        self.group(label, kind)
            .iter()
            .take(n)
            .map(|&index| &self.companies[index].symbol)
            .filter(|symbol| seen.insert(symbol.as_str()))
            .cloned()
            .collect()
    }

    /// Every company in the group, in file order
    pub fn companies(&self, label: &str, kind: PeerKind) -> Vec<&PeerCompany> {
        self.group(label, kind)
            .iter()
            .map(|&index| &self.companies[index])
            .collect()
    }

    fn group(&self, label: &str, kind: PeerKind) -> &[usize] {
        let index = match kind {
            PeerKind::Sector => &self.by_sector,
            PeerKind::Industry => &self.by_industry,
        };
        index.get(label).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn parse_optional(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
