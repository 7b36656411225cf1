//! Incident count and select queries.
//!
//! Both statements take the `WHERE` clause from a compiled [`Predicate`], so
//! the total reported alongside a page of results always matches the rows
//! that page was drawn from.

use chrono::NaiveDateTime;
use incident_map_database_models::{IncidentRow, parse_timestamp};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;
use crate::filter::Predicate;

/// Columns projected by [`select_incidents`], in storage naming.
const INCIDENT_COLUMNS: &str = "id, dr_no, area_name, crime_desc, premise_desc, weapon_desc, \
                                status_desc, location, lat, lon, crime_type, occur_time";

/// Builds the `COUNT(*)` statement for a predicate.
#[must_use]
pub fn count_sql(predicate: &Predicate) -> String {
    format!(
        "SELECT COUNT(*) AS total FROM incidents WHERE {}",
        predicate.clause()
    )
}

/// Builds the bounded select statement for a predicate.
///
/// The row limit is bound as the placeholder following the predicate's own
/// bindings.
#[must_use]
pub fn select_sql(predicate: &Predicate) -> String {
    format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE {} ORDER BY occur_time DESC LIMIT ${}",
        predicate.clause(),
        predicate.next_placeholder(),
    )
}

/// Counts incidents matching a predicate.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or the count column
/// cannot be read.
pub async fn count_incidents(db: &dyn Database, predicate: &Predicate) -> Result<u64, DbError> {
    let rows = db
        .query_raw_params(&count_sql(predicate), &predicate.values())
        .await?;

    let Some(row) = rows.first() else {
        return Ok(0);
    };

    let total: i64 = row.to_value("total").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse incident count: {e}"),
    })?;

    Ok(u64::try_from(total).unwrap_or(0))
}

/// Selects up to `limit` incidents matching a predicate, most recent first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a row has no
/// readable `id`.
pub async fn select_incidents(
    db: &dyn Database,
    predicate: &Predicate,
    limit: u32,
) -> Result<Vec<IncidentRow>, DbError> {
    let mut params = predicate.values();
    params.push(DatabaseValue::Int64(i64::from(limit)));

    let rows = db.query_raw_params(&select_sql(predicate), &params).await?;

    rows.iter().map(row_to_incident).collect()
}

/// Converts a database row into an [`IncidentRow`].
///
/// SQL `NULL` maps to `None`. A non-null value that cannot be read as the
/// expected type is an error rather than a silent `None`.
fn row_to_incident(row: &switchy_database::Row) -> Result<IncidentRow, DbError> {
    let id: i64 = row.to_value("id").map_err(conversion_error("id"))?;

    Ok(IncidentRow {
        id,
        dr_no: row_opt_text(row, "dr_no")?,
        area_name: row.to_value("area_name").map_err(conversion_error("area_name"))?,
        crime_desc: row.to_value("crime_desc").map_err(conversion_error("crime_desc"))?,
        premise_desc: row.to_value("premise_desc").map_err(conversion_error("premise_desc"))?,
        weapon_desc: row.to_value("weapon_desc").map_err(conversion_error("weapon_desc"))?,
        status_desc: row.to_value("status_desc").map_err(conversion_error("status_desc"))?,
        location: row.to_value("location").map_err(conversion_error("location"))?,
        lat: row.to_value("lat").map_err(conversion_error("lat"))?,
        lon: row.to_value("lon").map_err(conversion_error("lon"))?,
        crime_type: row.to_value("crime_type").map_err(conversion_error("crime_type"))?,
        occur_time: row_opt_timestamp(row, "occur_time")?,
    })
}

fn conversion_error<E: std::fmt::Display>(col: &'static str) -> impl FnOnce(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("Failed to parse incident {col}: {e}"),
    }
}

/// Reads a column that may be stored as either text or an integer.
///
/// Report numbers are text in some imports and `BIGINT` in others.
fn row_opt_text(row: &switchy_database::Row, col: &'static str) -> Result<Option<String>, DbError> {
    row.to_value::<Option<String>>(col).or_else(|_| {
        row.to_value::<Option<i64>>(col)
            .map(|n| n.map(|n| n.to_string()))
            .map_err(conversion_error(col))
    })
}

/// Reads a timestamp column stored natively or, as `SQLite` does, as text.
fn row_opt_timestamp(
    row: &switchy_database::Row,
    col: &'static str,
) -> Result<Option<NaiveDateTime>, DbError> {
    if let Ok(value) = row.to_value::<Option<NaiveDateTime>>(col) {
        return Ok(value);
    }

    let text: Option<String> = row.to_value(col).map_err(conversion_error(col))?;
    text.map(|s| parse_timestamp(&s).ok_or_else(|| conversion_error(col)(format!("{s:?}"))))
        .transpose()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use incident_map_database_models::IncidentFilterParams;

    use super::*;
    use crate::filter::compile;

    fn predicate(crime_type: Option<&str>) -> Predicate {
        compile(&IncidentFilterParams {
            from: Some("2020-01-01".to_string()),
            to: Some("2020-01-02".to_string()),
            crime_type: crime_type.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn count_uses_predicate_clause() {
        assert_eq!(
            count_sql(&predicate(None)),
            "SELECT COUNT(*) AS total FROM incidents \
             WHERE occur_time >= $1 AND occur_time < $2"
        );
    }

    #[test]
    fn select_orders_newest_first_and_binds_limit_last() {
        let sql = select_sql(&predicate(Some("Theft")));
        assert!(sql.starts_with("SELECT id, dr_no, area_name, crime_desc"));
        assert!(sql.contains("WHERE occur_time >= $1 AND occur_time < $2 AND crime_type = $3"));
        assert!(sql.ends_with("ORDER BY occur_time DESC LIMIT $4"));
    }

    #[test]
    fn count_and_select_share_where_clause() {
        let p = predicate(Some("Theft"));
        let count = count_sql(&p);
        let select = select_sql(&p);
        let where_clause = format!("WHERE {}", p.clause());
        assert!(count.ends_with(&where_clause));
        assert!(select.contains(&format!("{where_clause} ORDER BY")));
    }

    #[test]
    fn projects_every_incident_column() {
        for col in [
            "id",
            "dr_no",
            "area_name",
            "crime_desc",
            "premise_desc",
            "weapon_desc",
            "status_desc",
            "location",
            "lat",
            "lon",
            "crime_type",
            "occur_time",
        ] {
            assert!(
                INCIDENT_COLUMNS.split(", ").any(|c| c.trim() == col),
                "missing column {col}"
            );
        }
    }

    fn at(day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .and_then(|d| d.and_hms_opt(hour, min, sec))
            .unwrap()
    }

    async fn open(dir: &tempfile::TempDir) -> Box<dyn Database> {
        let url = format!("sqlite://{}", dir.path().join("incidents.db").display());
        let db = crate::db::connect(&url).await.unwrap();
        db.exec_raw(
            "CREATE TABLE incidents (
                id           INTEGER PRIMARY KEY,
                dr_no        TEXT,
                area_name    TEXT,
                crime_desc   TEXT,
                premise_desc TEXT,
                weapon_desc  TEXT,
                status_desc  TEXT,
                location     TEXT,
                lat          REAL,
                lon          REAL,
                crime_type   TEXT,
                occur_time   TIMESTAMP
            )",
        )
        .await
        .unwrap();
        db
    }

    async fn insert(
        db: &dyn Database,
        id: i64,
        crime_type: &str,
        (lat, lon): (f64, f64),
        occur_time: NaiveDateTime,
    ) {
        db.exec_raw_params(
            "INSERT INTO incidents (id, dr_no, area_name, lat, lon, crime_type, occur_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                DatabaseValue::Int64(id),
                DatabaseValue::String(format!("2001{id:05}")),
                DatabaseValue::String("Central".to_string()),
                DatabaseValue::Real64(lat),
                DatabaseValue::Real64(lon),
                DatabaseValue::String(crime_type.to_string()),
                DatabaseValue::DateTime(occur_time),
            ],
        )
        .await
        .unwrap();
    }

    /// Seven matching Theft incidents (ids 1..=7, oldest first) and four rows
    /// that each fail exactly one condition. Id 1 sits on `from`, id 2 on the
    /// southern edge, id 3 on the eastern edge and id 8 on `to`.
    async fn seed(db: &dyn Database) {
        let inside = (34.05, -118.25);
        insert(db, 1, "Theft", inside, at(1, 0, 0, 0)).await;
        insert(db, 2, "Theft", (34.0, -118.25), at(1, 2, 0, 0)).await;
        insert(db, 3, "Theft", (34.05, -118.2), at(1, 3, 0, 0)).await;
        for id in 4..=7 {
            insert(db, id, "Theft", inside, at(1, u32::try_from(id).unwrap(), 0, 0)).await;
        }

        insert(db, 8, "Theft", inside, at(2, 0, 0, 0)).await;
        insert(db, 9, "Assault", inside, at(1, 5, 30, 0)).await;
        insert(db, 10, "Theft", (34.2, -118.25), at(1, 6, 30, 0)).await;
        insert(db, 11, "Theft", inside, at(1, 0, 0, 0) - chrono::TimeDelta::seconds(1)).await;
    }

    fn theft_in_box() -> Predicate {
        compile(&IncidentFilterParams {
            from: Some("2020-01-01".to_string()),
            to: Some("2020-01-02".to_string()),
            crime_type: Some("Theft".to_string()),
            min_lat: Some("34.0".to_string()),
            min_lon: Some("-118.3".to_string()),
            max_lat: Some("34.1".to_string()),
            max_lon: Some("-118.2".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn count_matches_half_open_range_and_inclusive_box() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        seed(db.as_ref()).await;

        let total = count_incidents(db.as_ref(), &theft_in_box()).await.unwrap();

        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn select_returns_newest_first_up_to_limit() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        seed(db.as_ref()).await;

        let rows = select_incidents(db.as_ref(), &theft_in_box(), 5)
            .await
            .unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
        assert_eq!(rows[0].dr_no.as_deref(), Some("200100007"));
        assert_eq!(rows[0].crime_type.as_deref(), Some("Theft"));
        assert_eq!(rows[0].occur_time, Some(at(1, 7, 0, 0)));
    }

    #[tokio::test]
    async fn select_includes_from_and_box_edges_but_not_to() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        seed(db.as_ref()).await;

        let rows = select_incidents(db.as_ref(), &theft_in_box(), 1000)
            .await
            .unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 6, 5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn zero_limit_selects_nothing_but_count_is_unaffected() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        seed(db.as_ref()).await;
        let predicate = theft_in_box();

        let rows = select_incidents(db.as_ref(), &predicate, 0).await.unwrap();

        assert!(rows.is_empty());
        assert_eq!(count_incidents(db.as_ref(), &predicate).await.unwrap(), 7);
    }

    async fn read_row(db: &dyn Database, id: i64) -> Result<IncidentRow, DbError> {
        let rows = db
            .query_raw_params(
                &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"),
                &[DatabaseValue::Int64(id)],
            )
            .await
            .unwrap();
        row_to_incident(&rows[0])
    }

    #[tokio::test]
    async fn null_columns_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        db.exec_raw("INSERT INTO incidents (id) VALUES (42)")
            .await
            .unwrap();

        let row = read_row(db.as_ref(), 42).await.unwrap();

        assert_eq!(row.id, 42);
        assert_eq!(row.dr_no, None);
        assert_eq!(row.lat, None);
        assert_eq!(row.occur_time, None);
    }

    #[tokio::test]
    async fn numeric_report_number_reads_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        db.exec_raw("INSERT INTO incidents (id, dr_no) VALUES (42, 200100501)")
            .await
            .unwrap();

        let row = read_row(db.as_ref(), 42).await.unwrap();

        assert_eq!(row.dr_no.as_deref(), Some("200100501"));
    }

    #[tokio::test]
    async fn unreadable_occur_time_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        db.exec_raw("INSERT INTO incidents (id, occur_time) VALUES (42, 'last tuesday')")
            .await
            .unwrap();

        let err = read_row(db.as_ref(), 42).await.unwrap_err();

        assert!(matches!(err, DbError::Conversion { .. }), "{err}");
        assert!(err.to_string().contains("occur_time"));
    }

    #[tokio::test]
    async fn non_numeric_latitude_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        db.exec_raw("INSERT INTO incidents (id, lat) VALUES (42, 'north')")
            .await
            .unwrap();

        let err = read_row(db.as_ref(), 42).await.unwrap_err();

        assert!(matches!(err, DbError::Conversion { .. }), "{err}");
        assert!(err.to_string().contains("lat"));
    }
}
