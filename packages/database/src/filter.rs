//! Compiles incident filters into parameterized SQL predicates.
//!
//! Filter values are never interpolated into SQL text. Each condition gets a
//! positional placeholder (`$1`, `$2`, ...) and the value travels alongside
//! it as a named [`Binding`], so the same [`Predicate`] can drive both the
//! count and the select statement.

use incident_map_database_models::{FilterError, IncidentFilter, IncidentFilterParams};
use switchy_database::DatabaseValue;

/// A named value bound to one placeholder of a [`Predicate`].
#[derive(Debug, Clone)]
pub struct Binding {
    /// Logical parameter name (e.g. `from_time`, `min_lat`).
    pub name: &'static str,
    /// Value bound to the placeholder.
    pub value: DatabaseValue,
}

/// A compiled `WHERE` clause and its bound values.
///
/// Placeholder `$n` corresponds to `bindings()[n - 1]`.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clause: String,
    bindings: Vec<Binding>,
}

impl Predicate {
    /// The `WHERE` clause body (without the `WHERE` keyword).
    #[must_use]
    pub fn clause(&self) -> &str {
        &self.clause
    }

    /// Bindings in placeholder order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Looks up a binding by its logical name.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&DatabaseValue> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.value)
    }

    /// Bound values in placeholder order, ready for `query_raw_params`.
    #[must_use]
    pub fn values(&self) -> Vec<DatabaseValue> {
        self.bindings.iter().map(|b| b.value.clone()).collect()
    }

    /// Index of the next free placeholder after this predicate's bindings.
    #[must_use]
    pub fn next_placeholder(&self) -> usize {
        self.bindings.len() + 1
    }

    fn push(&mut self, column: &str, op: &str, name: &'static str, value: DatabaseValue) {
        if !self.clause.is_empty() {
            self.clause.push_str(" AND ");
        }
        self.bindings.push(Binding { name, value });
        self.clause.push_str(&format!("{column} {op} ${}", self.bindings.len()));
    }
}

impl From<&IncidentFilter> for Predicate {
    fn from(filter: &IncidentFilter) -> Self {
        let mut predicate = Self::default();

        predicate.push(
            "occur_time",
            ">=",
            "from_time",
            DatabaseValue::DateTime(filter.from),
        );
        predicate.push(
            "occur_time",
            "<",
            "to_time",
            DatabaseValue::DateTime(filter.to),
        );

        if let Some(crime_type) = &filter.crime_type {
            predicate.push(
                "crime_type",
                "=",
                "crime_type",
                DatabaseValue::String(crime_type.clone()),
            );
        }

        if let Some(bbox) = &filter.bbox {
            predicate.push("lat", ">=", "min_lat", DatabaseValue::Real64(bbox.min_lat));
            predicate.push("lat", "<=", "max_lat", DatabaseValue::Real64(bbox.max_lat));
            predicate.push("lon", ">=", "min_lon", DatabaseValue::Real64(bbox.min_lon));
            predicate.push("lon", "<=", "max_lon", DatabaseValue::Real64(bbox.max_lon));
        }

        predicate
    }
}

/// Validates raw query parameters and compiles them into a [`Predicate`].
///
/// # Errors
///
/// Returns [`FilterError`] if the time range is missing or unparseable, or
/// if all four bounding box values are present and any is not a number.
pub fn compile(params: &IncidentFilterParams) -> Result<Predicate, FilterError> {
    let filter = IncidentFilter::try_from(params)?;
    Ok(Predicate::from(&filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(from: &str, to: &str) -> IncidentFilterParams {
        IncidentFilterParams {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..Default::default()
        }
    }

    fn names(predicate: &Predicate) -> Vec<&'static str> {
        predicate.bindings().iter().map(|b| b.name).collect()
    }

    #[test]
    fn time_range_only() {
        let predicate = compile(&params("2020-01-01", "2020-01-02")).unwrap();
        assert_eq!(predicate.clause(), "occur_time >= $1 AND occur_time < $2");
        assert_eq!(names(&predicate), ["from_time", "to_time"]);
        assert_eq!(predicate.next_placeholder(), 3);
    }

    #[test]
    fn binds_midnight_for_date_only_bounds() {
        let predicate = compile(&params("2020-01-01", "2020-01-02")).unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert!(matches!(
            predicate.binding("from_time"),
            Some(DatabaseValue::DateTime(dt)) if *dt == expected
        ));
    }

    #[test]
    fn crime_type_is_bound_not_interpolated() {
        let mut p = params("2020-01-01", "2020-01-02");
        p.crime_type = Some("Theft' OR 1=1 --".to_string());
        let predicate = compile(&p).unwrap();

        assert_eq!(
            predicate.clause(),
            "occur_time >= $1 AND occur_time < $2 AND crime_type = $3"
        );
        assert!(!predicate.clause().contains("Theft"));
        assert!(matches!(
            predicate.binding("crime_type"),
            Some(DatabaseValue::String(s)) if s == "Theft' OR 1=1 --"
        ));
    }

    #[test]
    fn bbox_conditions_follow_crime_type() {
        let mut p = params("2020-01-01", "2020-01-02");
        p.crime_type = Some("Theft".to_string());
        p.min_lat = Some("33.9".to_string());
        p.min_lon = Some("-118.5".to_string());
        p.max_lat = Some("34.2".to_string());
        p.max_lon = Some("-118.1".to_string());
        let predicate = compile(&p).unwrap();

        assert_eq!(
            predicate.clause(),
            "occur_time >= $1 AND occur_time < $2 AND crime_type = $3 \
             AND lat >= $4 AND lat <= $5 AND lon >= $6 AND lon <= $7"
        );
        assert_eq!(
            names(&predicate),
            [
                "from_time",
                "to_time",
                "crime_type",
                "min_lat",
                "max_lat",
                "min_lon",
                "max_lon"
            ]
        );
        assert!(matches!(
            predicate.binding("max_lon"),
            Some(DatabaseValue::Real64(v)) if (*v - -118.1).abs() < f64::EPSILON
        ));
        assert_eq!(predicate.values().len(), 7);
    }

    #[test]
    fn bbox_without_crime_type_starts_at_third_placeholder() {
        let mut p = params("2020-01-01", "2020-01-02");
        p.min_lat = Some("33.9".to_string());
        p.min_lon = Some("-118.5".to_string());
        p.max_lat = Some("34.2".to_string());
        p.max_lon = Some("-118.1".to_string());
        let predicate = compile(&p).unwrap();

        assert!(
            predicate
                .clause()
                .ends_with("AND lat >= $3 AND lat <= $4 AND lon >= $5 AND lon <= $6")
        );
    }

    #[test]
    fn partial_bbox_adds_no_conditions() {
        let mut p = params("2020-01-01", "2020-01-02");
        p.min_lat = Some("33.9".to_string());
        p.max_lon = Some("-118.1".to_string());
        let predicate = compile(&p).unwrap();
        assert_eq!(predicate.clause(), "occur_time >= $1 AND occur_time < $2");
    }

    #[test]
    fn invalid_bbox_rejects() {
        let mut p = params("2020-01-01", "2020-01-02");
        p.min_lat = Some("33.9".to_string());
        p.min_lon = Some("west".to_string());
        p.max_lat = Some("34.2".to_string());
        p.max_lon = Some("-118.1".to_string());
        assert!(matches!(
            compile(&p),
            Err(FilterError::InvalidCoordinate { param: "minLon", .. })
        ));
    }

    #[test]
    fn missing_time_range_rejects() {
        assert_eq!(
            compile(&IncidentFilterParams::default()).unwrap_err(),
            FilterError::MissingTimeRange
        );
    }
}
