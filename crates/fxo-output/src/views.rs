//! Analysis views created in exported databases.
//!
//! A view is created only when every table it reads exists in the
//! database, and never over an existing view of the same name.

/// An SQL view together with the tables it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteView {
    /// View name
    pub name: String,
    /// Tables that must exist before the view is created
    pub required_tables: Vec<String>,
    /// `SELECT` statement of the view
    pub sql: String,
}

impl SqliteView {
    /// Create a view definition.
    pub fn new<I, S>(name: impl Into<String>, required_tables: I, sql: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            required_tables: required_tables.into_iter().map(Into::into).collect(),
            sql: sql.into(),
        }
    }

    /// `CREATE VIEW` statement.
    pub fn create_sql(&self) -> String {
        format!("CREATE VIEW {}\nAS\n{}", self.name, self.sql.trim())
    }

    /// All required tables are in `tables`.
    pub fn is_supported_by(&self, tables: &[&str]) -> bool {
        self.required_tables
            .iter()
            .all(|required| tables.contains(&required.as_str()))
    }
}

/// Summation and duplicate errors, most severe first.
///
/// Only one language version of each enclosure is kept: filings with the
/// same entity and reporting date are treated as one enclosure. Each
/// pair of duplicated values is listed once.
///
/// Columns: `entity_name`, `reporting_date`, `problem` (`calc` or
/// `duplicate`), `reportedK`, `computedOrDuplicateK`, `reportedErrorK`,
/// `errorPercent`, `calc_line_item`, `calc_short_role`,
/// `calc_context_id`, `language`, `filing_api_id`, `entity_api_id` and
/// `validation_message_api_id`.
pub const VIEW_NUMERIC_ERRORS_SQL: &str = "
WITH fs AS (
  SELECT
    name AS entity_name,
    reporting_date,
    language,
    Filing.api_id,
    entity_api_id,
    row_number() OVER (
      PARTITION BY entity_api_id, reporting_date ORDER BY language
    ) AS lan_order
  FROM Filing
    JOIN Entity ON Entity.api_id = entity_api_id
),
v AS (
  SELECT
    filing_api_id,
    duplicate_lesser AS lesser,
    duplicate_greater AS greater,
    code,
    api_id AS validation_message_api_id,
    row_number() OVER (
      PARTITION BY duplicate_greater, duplicate_lesser
    ) AS dup_occur
  FROM ValidationMessage
)
SELECT * FROM (
  SELECT
    entity_name,
    reporting_date,
    'duplicate' AS problem,
    lesser/1000 AS reportedK,
    greater/1000 AS computedOrDuplicateK,
    (greater-lesser)/1000 AS reportedErrorK,
    round(100*abs((greater-lesser)/lesser), 2) AS errorPercent,
    NULL AS calc_line_item,
    NULL AS calc_short_role,
    NULL AS calc_context_id,
    language,
    filing_api_id,
    entity_api_id,
    validation_message_api_id
  FROM fs INNER JOIN v ON filing_api_id = fs.api_id
  WHERE
    dup_occur = 1
    AND lan_order = 1
    AND code = 'message:tech_duplicated_facts1'

  UNION ALL

  SELECT
    entity_name,
    reporting_date,
    'calc' AS problem,
    calc_reported_sum/1000 AS reportedK,
    calc_computed_sum/1000 AS computedOrDuplicateK,
    abs(calc_reported_sum-calc_computed_sum)/1000 AS reportedErrorK,
    round(
      100*abs((calc_reported_sum-calc_computed_sum)/calc_reported_sum), 2
    ) AS errorPercent,
    calc_line_item,
    calc_short_role,
    calc_context_id,
    language,
    filing_api_id,
    entity_api_id,
    ValidationMessage.api_id AS validation_message_api_id
  FROM fs
    JOIN ValidationMessage ON filing_api_id = fs.api_id
  WHERE lan_order = 1 AND code = 'xbrl.5.2.5.2:calcInconsistency'
)
ORDER BY errorPercent DESC NULLS FIRST
";

/// Language versions of each enclosure on one row, by entity name and
/// reporting date.
///
/// Count columns are averages over the language versions.
pub const VIEW_ENCLOSURE_SQL: &str = "
SELECT
  name AS entity_name,
  reporting_date,
  country,
  group_concat(language, ', ') AS languages,
  group_concat(f.api_id, ', ') AS filing_api_ids,
  avg(error_count) AS error_count,
  avg(inconsistency_count) AS inconsistency_count,
  avg(warning_count) AS warning_count,
  added_time,
  processed_time,
  identifier,
  e.api_id AS entity_api_id
FROM Filing AS f
  JOIN Entity AS e ON f.entity_api_id = e.api_id
GROUP BY e.api_id, reporting_date
ORDER BY name, reporting_date
";

/// Age of the filings in months of 29.53 days, oldest first, and the
/// days from adding to processing.
pub const VIEW_FILING_AGE_SQL: &str = "
SELECT
  name AS entity_name,
  reporting_date,
  cast(round(
    (julianday(date('now'))-julianday(reporting_date))/29.53
  ) AS INTEGER) AS ageNowMonths,
  country,
  language,
  added_time,
  processed_time,
  cast(round(
    julianday(date(processed_time))-julianday(date(added_time))
  ) AS INTEGER) AS addedToProcessedDays,
  f.api_id AS filing_api_id,
  e.api_id AS entity_api_id
FROM Filing AS f
  JOIN Entity AS e ON f.entity_api_id=e.api_id
ORDER BY ageNowMonths DESC
";

/// `ViewNumericErrors`, `ViewEnclosure` and `ViewFilingAge`.
pub fn default_views() -> Vec<SqliteView> {
    vec![
        SqliteView::new(
            "ViewNumericErrors",
            ["ValidationMessage", "Entity"],
            VIEW_NUMERIC_ERRORS_SQL,
        ),
        SqliteView::new("ViewEnclosure", ["Entity"], VIEW_ENCLOSURE_SQL),
        SqliteView::new("ViewFilingAge", ["Entity"], VIEW_FILING_AGE_SQL),
    ]
}
