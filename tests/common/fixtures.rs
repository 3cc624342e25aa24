//! CSV fixtures written to temporary directories

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use rust_stocks_api::{catalog::TickerCatalog, peers::PeerGrouper};

pub const CATALOG_CSV: &str = "\
Symbol,Name,Last Sale,Net Change,% Change,Market Cap,Country,IPO Year,Volume,Sector,Industry
AAPL,Apple Inc. Common Stock,$189.84,0.92,0.487%,2935200000000.00,United States,1980,53029011,Technology,Computer Manufacturing
MSFT,Microsoft Corporation Common Stock,$415.10,-1.32,-0.317%,3085000000000.00,United States,1986,16571418,Technology,Computer Software: Prepackaged Software
JPM,JP Morgan Chase & Co. Common Stock,$198.00,1.10,0.559%,568000000000.00,United States,,8120000,Finance,Major Banks
XOM,Exxon Mobil Corporation Common Stock,$118.30,-0.40,-0.337%,470000000000.00,United States,,14300000,Energy,Integrated oil Companies
NVDA,NVIDIA Corporation Common Stock,$924.79,15.32,1.684%,2311975000000.00,United States,1999,43710550,Technology,Semiconductors
";

pub const PEERS_CSV: &str = "\
Exchange,Symbol,Shortname,Longname,Sector,Industry,Currentprice,Marketcap,Ebitda
NMS,AAPL,Apple Inc.,Apple Inc.,Technology,Consumer Electronics,189.84,2935200000000,129629003776
NMS,MSFT,Microsoft Corporation,Microsoft Corporation,Technology,Software - Infrastructure,415.10,3085000000000,125981999104
NMS,NVDA,NVIDIA Corporation,NVIDIA Corporation,Technology,Semiconductors,924.79,2311975000000,49274998784
NMS,AVGO,Broadcom Inc.,Broadcom Inc.,Technology,Semiconductors,1311.01,608000000000,23879999488
NMS,AMD,\"Advanced Micro Devices, Inc.\",\"Advanced Micro Devices, Inc.\",Technology,Semiconductors,158.24,255000000000,
NMS,QCOM,QUALCOMM Incorporated,QUALCOMM Incorporated,Technology,Semiconductors,,189000000000,12000000000
NMS,INTC,Intel Corporation,Intel Corporation,Technology,Semiconductors,30.12,,
NYQ,JPM,JP Morgan Chase & Co.,JPMorgan Chase & Co.,Financial Services,Banks - Diversified,198.00,568000000000,
";

fn write(contents: &str, name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    (dir, path)
}

/// Write `contents` to a temp file; the directory lives as long as the guard
pub fn write_catalog(contents: &str) -> (TempDir, PathBuf) {
    write(contents, "nasdaq.csv")
}

pub fn write_peers(contents: &str) -> (TempDir, PathBuf) {
    write(contents, "sp500_companies.csv")
}

pub fn catalog_on_disk(contents: &str) -> (TempDir, TickerCatalog) {
    let (dir, path) = write_catalog(contents);
    let catalog = TickerCatalog::load(&path).expect("Failed to load catalog fixture");
    (dir, catalog)
}

pub fn peers_on_disk(contents: &str) -> (TempDir, PeerGrouper) {
    let (dir, path) = write_peers(contents);
    let peers = PeerGrouper::load(&path).expect("Failed to load peers fixture");
    (dir, peers)
}
