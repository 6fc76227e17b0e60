//! Integration tests for exporting a parsed filing set.

use chrono::Utc;
use fxo_data::{ApiRequest, FilingSet, FilingsPage, ScopeFlags, TimeAccuracy};
use fxo_output::{
    OutputError, SqliteExportOptions, filing_set_to_sqlite, save_csv, to_dataframe,
};
use rusqlite::Connection;
use serde_json::json;
use url::Url;

fn filings() -> FilingSet {
    let body = json!({
        "data": [
            {
                "type": "filing",
                "id": "4261",
                "attributes": {
                    "country": "FI",
                    "fxo_id": "743700XJC24THUPK0S03-2022-12-31-ESEF-FI-0",
                    "period_end": "2022-12-31",
                    "error_count": 0,
                    "warning_count": 2,
                    "date_added": "2023-03-06T14:41:14Z",
                    "processed": "2023-03-08T09:12:00Z",
                    "package_url": "/743700XJC24THUPK0S03/2022-12-31/ESEF/FI/0/743700XJC24THUPK0S03-2022-12-31-fi.zip",
                    "sha256": "abc"
                },
                "relationships": {"entity": {"data": {"type": "entity", "id": "529"}}}
            },
            {
                "type": "filing",
                "id": "4262",
                "attributes": {
                    "country": "FI",
                    "period_end": "2022-12-31",
                    "package_url": "/743700XJC24THUPK0S03/2022-12-31/ESEF/FI/1/743700XJC24THUPK0S03-2022-12-31-en.zip"
                },
                "relationships": {"entity": {"data": {"type": "entity", "id": "529"}}}
            }
        ],
        "included": [
            {"type": "entity", "id": "529", "attributes": {"name": "Kesko Oyj", "identifier": "743700XJC24THUPK0S03"}}
        ],
        "meta": {"count": 2},
        "jsonapi": {"version": "1.0"}
    });
    let request = ApiRequest::new(
        "https://filings.xbrl.org/api/filings?include=entity",
        Utc::now().fixed_offset(),
    );
    let entry = Url::parse("https://filings.xbrl.org/api/filings").unwrap();
    let page = FilingsPage::parse(&body, &request, &entry, ScopeFlags::GET_ENTITY);
    let mut set = FilingSet::with_flags(ScopeFlags::GET_ENTITY);
    set.extend(page.filing_list);
    set
}

#[test]
fn test_filing_set_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").join("filings.db");
    let set = filings();

    filing_set_to_sqlite(&set, ScopeFlags::everything(), &path, false, &SqliteExportOptions::default())
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let (name, languages): (String, String) = conn
        .query_row(
            "SELECT entity_name, languages FROM ViewEnclosure",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "Kesko Oyj");
    let mut languages: Vec<&str> = languages.split(", ").collect();
    languages.sort_unstable();
    assert_eq!(languages, ["en", "fi"]);

    let days: i64 = conn
        .query_row(
            "SELECT addedToProcessedDays FROM ViewFilingAge WHERE filing_api_id = '4261'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(days, 2);

    let missing: i64 = conn
        .query_row(
            "SELECT count(*) FROM sqlite_schema WHERE name = 'ValidationMessage'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(missing, 0);

    let err = filing_set_to_sqlite(&set, ScopeFlags::everything(), &path, false, &SqliteExportOptions::default())
        .unwrap_err();
    assert!(matches!(err, OutputError::DatabaseFileExists { .. }));
}

#[test]
fn test_csv_and_dataframe_from_entities() {
    let set = filings();
    let entities = set.entities().get_data(Some(&["api_id", "name"])).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.csv");
    save_csv(&path, &entities, TimeAccuracy::Min).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "api_id,name\n529,Kesko Oyj\n");

    let df = to_dataframe(&set.get_data(None).unwrap()).unwrap();
    assert_eq!(df.height(), 2);
    assert!(df.column("entity_api_id").is_ok());
    assert!(df.column("json_download_path").is_err());
}
