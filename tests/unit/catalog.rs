//! Ticker catalog tests against files on disk

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::fixtures::{self, CATALOG_CSV};
use crate::common::logging::{log_test_data, log_test_step};
use rust_stocks_api::{catalog::TickerCatalog, error::CatalogError};

const TWO_TICKERS: &str = "\
Symbol,Name,Sector,Industry,Country,Market Cap
AAPL,Apple,Technology,Consumer Electronics,USA,3000000000000
MSFT,Microsoft,Technology,Software,USA,2500000000000
";

#[test]
fn test_two_ticker_scenario() {
    log_test_step("Loading two technology tickers");
    let (_dir, catalog) = fixtures::catalog_on_disk(TWO_TICKERS);

    let tech = catalog.group_by_sector("Technology");
    assert_eq!(tech.symbols(), vec!["AAPL", "MSFT"]);

    let page = catalog.page(1, 1).unwrap();
    assert_eq!(page.items.symbols(), vec!["AAPL"]);
    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.next_page, Some(2));
    assert_eq!(page.prev_page, None);

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["items"]["AAPL"]["marketCapBillions"], 3000.0);
    assert_eq!(json["next_page"], 2);
    assert!(json["prev_page"].is_null());
}

#[test]
fn test_reloading_same_file_is_identical() {
    let (_dir, path) = fixtures::write_catalog(CATALOG_CSV);

    let first = TickerCatalog::load(&path).unwrap();
    let second = TickerCatalog::load(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.list_symbols(), second.list_symbols());
}

#[test]
fn test_pagination_covers_every_symbol_once() {
    let (_dir, catalog) = fixtures::catalog_on_disk(CATALOG_CSV);
    let total = catalog.len();

    for size in 1..=total + 1 {
        let first = catalog.page(1, size as i64).unwrap();
        let pages = first.total_pages;
        assert_eq!(pages, total.div_ceil(size));

        let mut seen = Vec::new();
        for number in 1..=pages {
            let page = catalog.page(number as i64, size as i64).unwrap();
            assert_eq!(page.total, total);
            assert_eq!(page.total_pages, pages);
            seen.extend(page.items.symbols().into_iter().map(str::to_string));
        }
        assert_eq!(seen, catalog.list_symbols());

        let last = catalog.page(pages as i64, size as i64).unwrap();
        let expected_last = if total % size == 0 { size } else { total % size };
        assert_eq!(last.items.len(), expected_last);
        assert_eq!(last.next_page, None);
    }
}

#[test]
fn test_page_beyond_range_is_empty() {
    let (_dir, catalog) = fixtures::catalog_on_disk(CATALOG_CSV);

    let page = catalog.page(99, 2).unwrap();
    log_test_data("Out of range page", &page);

    assert!(page.items.is_empty());
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.next_page, None);
    assert_eq!(page.prev_page, Some(98));
}

#[test]
fn test_invalid_page_arguments() {
    let (_dir, catalog) = fixtures::catalog_on_disk(CATALOG_CSV);

    assert_matches!(catalog.page(0, 10), Err(CatalogError::InvalidPage { page: 0, size: 10 }));
    assert_matches!(catalog.page(1, 0), Err(CatalogError::InvalidPage { .. }));
    assert_matches!(catalog.page(-3, 5), Err(CatalogError::InvalidPage { .. }));
}

#[test]
fn test_duplicate_symbol_last_write_wins_in_first_slot() {
    let csv = "\
Symbol,Name,Sector,Industry,Country,Market Cap
AAPL,Apple Old,Technology,Hardware,USA,1000000000
MSFT,Microsoft,Technology,Software,USA,2000000000
AAPL,Apple New,Technology,Consumer Electronics,USA,3000000000
";
    let (_dir, catalog) = fixtures::catalog_on_disk(csv);

    assert_eq!(catalog.list_symbols(), vec!["AAPL", "MSFT"]);
    let apple = catalog.get("AAPL").unwrap();
    assert_eq!(apple.name, "Apple New");
    assert_eq!(apple.market_cap_billions, 3.0);

    // Grouping reflects the surviving row only
    assert!(catalog.group_by_industry("Hardware").is_empty());
    assert_eq!(catalog.group_by_industry("Consumer Electronics").symbols(), vec!["AAPL"]);
}

#[test]
fn test_grouping_is_exact_and_case_sensitive() {
    let (_dir, catalog) = fixtures::catalog_on_disk(CATALOG_CSV);

    assert_eq!(
        catalog.group_by_sector("Technology").symbols(),
        vec!["AAPL", "MSFT", "NVDA"]
    );
    assert!(catalog.group_by_sector("technology").is_empty());
    assert!(catalog.group_by_sector("Tech").is_empty());
    assert_eq!(catalog.group_by_industry("Major Banks").symbols(), vec!["JPM"]);

    for sector in catalog.sectors() {
        for record in catalog.group_by_sector(sector).iter() {
            assert!(catalog.contains(&record.symbol));
            assert_eq!(record.sector, sector);
        }
    }
}

#[test]
fn test_unknown_symbol_is_not_found() {
    let (_dir, catalog) = fixtures::catalog_on_disk(CATALOG_CSV);
    assert_matches!(catalog.get("ZZZZ"), Err(CatalogError::NotFound(symbol)) if symbol == "ZZZZ");
}

#[test]
fn test_unparsable_market_cap_fails_whole_load() {
    let csv = "\
Symbol,Name,Sector,Industry,Country,Market Cap
AAPL,Apple,Technology,Consumer Electronics,USA,3000000000000
BAD,Broken,Technology,Software,USA,n/a
";
    let (_dir, path) = fixtures::write_catalog(csv);

    assert_matches!(
        TickerCatalog::load(&path),
        Err(CatalogError::MalformedRecord { line: 3, .. })
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert_matches!(
        TickerCatalog::load(dir.path().join("missing.csv")),
        Err(CatalogError::Io(_))
    );
}

#[test]
fn test_search_finds_by_symbol_and_name() {
    let (_dir, catalog) = fixtures::catalog_on_disk(CATALOG_CSV);

    let by_symbol = catalog.search("NVDA", 3);
    assert_eq!(by_symbol.first().map(|r| r.symbol.as_str()), Some("NVDA"));

    let by_name = catalog.search("microsoft", 3);
    assert_eq!(by_name.first().map(|r| r.symbol.as_str()), Some("MSFT"));

    assert!(catalog.search("AAPL", 0).is_empty());
}
