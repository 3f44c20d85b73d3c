//! Column binding: maps canonical input headers onto the logical fields the
//! metric engine needs.
//!
//! Each logical field carries an ordered list of keyword patterns in a
//! [`BindingConfig`]. A pattern matches any header that contains it as a
//! substring, which tolerates the prefix/suffix drift common in merged
//! spreadsheets (`..._sanction` vs `..._sanctioned`). The district and
//! institution columns are matched verbatim instead.
//!
//! Resolution happens once per dataset ([`BindingTable::resolve`]). A field
//! that matches nothing is *missing*; a pattern that matches several headers
//! is *ambiguous* unless exactly one header equals the pattern. Both outcomes
//! are reported by [`BindingTable::select`], which validates everything a
//! given [`Selection`] requires before any metric is computed.

use std::{
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{data::canonicalize_column_name, error::DashboardError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum Level {
    /// Class V (school) seats
    #[value(alias = "v")]
    School,
    /// Intermediate first-year seats
    #[value(alias = "inter")]
    Intermediate,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::School => write!(f, "school"),
            Level::Intermediate => write!(f, "intermediate"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum Category {
    Minority,
    NonMinority,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Minority => write!(f, "minority"),
            Category::NonMinority => write!(f, "non-minority"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatMeasure {
    Sanctioned,
    Admitted,
    Vacancy,
}

impl fmt::Display for SeatMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatMeasure::Sanctioned => write!(f, "sanctioned"),
            SeatMeasure::Admitted => write!(f, "admitted"),
            SeatMeasure::Vacancy => write!(f, "vacancy"),
        }
    }
}

/// The level × category key that picks which seat columns feed the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub level: Level,
    pub category: Category,
}

impl Selection {
    pub fn new(level: Level, category: Category) -> Self {
        Self { level, category }
    }

    pub fn required_fields(&self) -> [LogicalField; 7] {
        let seat = |measure| LogicalField::Seat {
            level: self.level,
            category: self.category,
            measure,
        };
        [
            LogicalField::District,
            LogicalField::Institution,
            seat(SeatMeasure::Sanctioned),
            seat(SeatMeasure::Admitted),
            seat(SeatMeasure::Vacancy),
            LogicalField::Attendance(self.level),
            LogicalField::Absentees,
        ]
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(Level::School, Category::Minority)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.level, self.category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalField {
    District,
    Institution,
    Seat {
        level: Level,
        category: Category,
        measure: SeatMeasure,
    },
    Attendance(Level),
    Absentees,
}

impl LogicalField {
    pub fn all() -> Vec<LogicalField> {
        let mut fields = vec![LogicalField::District, LogicalField::Institution];
        for level in [Level::School, Level::Intermediate] {
            for category in [Category::Minority, Category::NonMinority] {
                for measure in [
                    SeatMeasure::Sanctioned,
                    SeatMeasure::Admitted,
                    SeatMeasure::Vacancy,
                ] {
                    fields.push(LogicalField::Seat {
                        level,
                        category,
                        measure,
                    });
                }
            }
            fields.push(LogicalField::Attendance(level));
        }
        fields.push(LogicalField::Absentees);
        fields
    }

    fn is_verbatim(&self) -> bool {
        matches!(self, LogicalField::District | LogicalField::Institution)
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalField::District => write!(f, "district"),
            LogicalField::Institution => write!(f, "institution"),
            LogicalField::Seat {
                level,
                category,
                measure,
            } => write!(f, "{level}.{category}.{measure}"),
            LogicalField::Attendance(level) => write!(f, "{level}.attendance"),
            LogicalField::Absentees => write!(f, "absentees"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatBindings {
    pub sanctioned: Vec<String>,
    pub admitted: Vec<String>,
    pub vacancy: Vec<String>,
}

impl SeatBindings {
    fn with_prefix(prefix: &str) -> Self {
        Self {
            sanctioned: vec![format!("{prefix}_sanction")],
            admitted: vec![format!("{prefix}_admitted")],
            vacancy: vec![format!("{prefix}_vacancies")],
        }
    }

    fn patterns(&self, measure: SeatMeasure) -> &[String] {
        match measure {
            SeatMeasure::Sanctioned => &self.sanctioned,
            SeatMeasure::Admitted => &self.admitted,
            SeatMeasure::Vacancy => &self.vacancy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBindings {
    pub attendance: Vec<String>,
    pub minority: SeatBindings,
    pub non_minority: SeatBindings,
}

impl LevelBindings {
    fn seats(&self, category: Category) -> &SeatBindings {
        match category {
            Category::Minority => &self.minority,
            Category::NonMinority => &self.non_minority,
        }
    }
}

/// Declarative logical-field → keyword table, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub district_column: String,
    pub institution_column: String,
    pub absentees: Vec<String>,
    pub school: LevelBindings,
    pub intermediate: LevelBindings,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            district_column: "district".to_string(),
            institution_column: "college_name".to_string(),
            absentees: vec!["total_absentees".to_string()],
            school: LevelBindings {
                attendance: vec!["total_school_attendance".to_string()],
                minority: SeatBindings::with_prefix("vth_class_minority"),
                non_minority: SeatBindings::with_prefix("vth_class_non_minority"),
            },
            intermediate: LevelBindings {
                attendance: vec!["total_intermediate_attendance".to_string()],
                minority: SeatBindings::with_prefix("1st_year_minority"),
                non_minority: SeatBindings::with_prefix("1st_year_non_minority"),
            },
        }
    }
}

impl BindingConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening bindings file {path:?}"))?;
        let overrides: Value = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing bindings file {path:?}"))?;
        Self::from_overrides(overrides)
            .with_context(|| format!("Applying bindings file {path:?}"))
    }

    /// Layers a partial document over the defaults. Nested mappings merge key
    /// by key; any other value, lists included, replaces the default.
    pub fn from_overrides(overrides: Value) -> Result<Self> {
        let mut merged = serde_yaml::to_value(Self::default())?;
        merge_yaml(&mut merged, overrides);
        Ok(serde_yaml::from_value(merged)?)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml_string()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating bindings file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn level(&self, level: Level) -> &LevelBindings {
        match level {
            Level::School => &self.school,
            Level::Intermediate => &self.intermediate,
        }
    }

    pub fn patterns(&self, field: LogicalField) -> Vec<String> {
        match field {
            LogicalField::District => vec![self.district_column.clone()],
            LogicalField::Institution => vec![self.institution_column.clone()],
            LogicalField::Seat {
                level,
                category,
                measure,
            } => self.level(level).seats(category).patterns(measure).to_vec(),
            LogicalField::Attendance(level) => self.level(level).attendance.clone(),
            LogicalField::Absentees => self.absentees.clone(),
        }
    }
}

fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        // empty document or `key: ~`
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

/// Returns the first header containing `keyword`, in column order.
pub fn find_column<'a>(headers: &'a [String], keyword: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.contains(keyword))
        .map(|header| header.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Bound {
        index: usize,
        column: String,
        pattern: String,
    },
    Ambiguous {
        pattern: String,
        candidates: Vec<String>,
    },
    Missing,
}

impl Resolution {
    pub fn status(&self) -> &'static str {
        match self {
            Resolution::Bound { .. } => "bound",
            Resolution::Ambiguous { .. } => "ambiguous",
            Resolution::Missing => "missing",
        }
    }
}

fn resolve_keywords(headers: &[String], patterns: &[String]) -> Resolution {
    for pattern in patterns {
        let needle = canonicalize_column_name(pattern);
        if needle.is_empty() {
            continue;
        }
        let matches = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| header.contains(needle.as_str()))
            .collect::<Vec<_>>();
        match matches.as_slice() {
            [] => continue,
            [(index, header)] => {
                return Resolution::Bound {
                    index: *index,
                    column: (*header).clone(),
                    pattern: needle,
                };
            }
            several => {
                let exact = several
                    .iter()
                    .filter(|(_, header)| **header == needle)
                    .collect::<Vec<_>>();
                if let [(index, header)] = exact.as_slice() {
                    return Resolution::Bound {
                        index: *index,
                        column: (*header).clone(),
                        pattern: needle,
                    };
                }
                return Resolution::Ambiguous {
                    candidates: several.iter().map(|(_, h)| (*h).clone()).collect(),
                    pattern: needle,
                };
            }
        }
    }
    Resolution::Missing
}

fn resolve_verbatim(headers: &[String], name: &str) -> Resolution {
    let needle = canonicalize_column_name(name);
    let matches = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| **header == needle)
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [] => Resolution::Missing,
        [(index, header)] => Resolution::Bound {
            index: *index,
            column: (*header).clone(),
            pattern: needle,
        },
        several => Resolution::Ambiguous {
            candidates: several.iter().map(|(idx, h)| format!("{h}@{idx}")).collect(),
            pattern: needle,
        },
    }
}

#[derive(Debug, Clone)]
pub struct BindingEntry {
    pub field: LogicalField,
    pub patterns: Vec<String>,
    pub resolution: Resolution,
}

/// Every logical field resolved against one dataset's headers.
#[derive(Debug, Clone)]
pub struct BindingTable {
    entries: Vec<BindingEntry>,
}

impl BindingTable {
    pub fn resolve(config: &BindingConfig, headers: &[String]) -> Self {
        let entries = LogicalField::all()
            .into_iter()
            .map(|field| {
                let patterns = config.patterns(field);
                let resolution = if field.is_verbatim() {
                    resolve_verbatim(headers, &patterns[0])
                } else {
                    resolve_keywords(headers, &patterns)
                };
                debug!("Binding {field} -> {resolution:?}");
                BindingEntry {
                    field,
                    patterns,
                    resolution,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    pub fn get(&self, field: LogicalField) -> Option<&BindingEntry> {
        self.entries.iter().find(|entry| entry.field == field)
    }

    pub fn column(&self, field: LogicalField) -> Option<ColumnRef> {
        match self.get(field).map(|entry| &entry.resolution) {
            Some(Resolution::Bound { index, column, .. }) => Some(ColumnRef {
                index: *index,
                name: column.clone(),
            }),
            _ => None,
        }
    }

    /// Validates that every field `selection` needs is bound to exactly one column.
    pub fn select(&self, selection: Selection) -> Result<SelectedColumns, DashboardError> {
        let mut missing = Vec::new();
        let mut conflicts = Vec::new();
        let mut bound = Vec::with_capacity(7);
        for field in selection.required_fields() {
            let entry = self.get(field);
            match entry.map(|e| &e.resolution) {
                Some(Resolution::Bound { index, column, .. }) => bound.push(ColumnRef {
                    index: *index,
                    name: column.clone(),
                }),
                Some(Resolution::Ambiguous { candidates, .. }) => {
                    conflicts.push((field.to_string(), candidates.clone()))
                }
                Some(Resolution::Missing) | None => {
                    let patterns = entry.map(|e| e.patterns.join(" | ")).unwrap_or_default();
                    missing.push(format!("{field} ({patterns})"));
                }
            }
        }
        if !missing.is_empty() {
            return Err(DashboardError::MissingColumns {
                selection,
                fields: missing,
            });
        }
        if !conflicts.is_empty() {
            return Err(DashboardError::AmbiguousColumns {
                selection,
                conflicts,
            });
        }
        let [
            district,
            institution,
            sanctioned,
            admitted,
            vacancy,
            attendance,
            absentees,
        ] = <[ColumnRef; 7]>::try_from(bound)
            .unwrap_or_else(|_| unreachable!("every required field is bound"));
        Ok(SelectedColumns {
            selection,
            district,
            institution,
            sanctioned,
            admitted,
            vacancy,
            attendance,
            absentees,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
}

/// Validated column references for one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedColumns {
    pub selection: Selection,
    pub district: ColumnRef,
    pub institution: ColumnRef,
    pub sanctioned: ColumnRef,
    pub admitted: ColumnRef,
    pub vacancy: ColumnRef,
    pub attendance: ColumnRef,
    pub absentees: ColumnRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn full_headers() -> Vec<String> {
        headers(&[
            "district",
            "college_name",
            "vth_class_minority_sanctioned",
            "vth_class_minority_admitted",
            "vth_class_minority_vacancies",
            "vth_class_non_minority_sanctioned",
            "vth_class_non_minority_admitted",
            "vth_class_non_minority_vacancies",
            "total_school_attendance",
            "total_absentees",
        ])
    }

    #[test]
    fn find_column_returns_first_substring_match() {
        let cols = headers(&["a_total_absentees_x", "total_absentees"]);
        assert_eq!(find_column(&cols, "total_absentees"), Some("a_total_absentees_x"));
        assert_eq!(find_column(&cols, "attendance"), None);
    }

    #[test]
    fn minority_keyword_does_not_match_non_minority_column() {
        let cols = headers(&["vth_class_non_minority_sanctioned"]);
        assert_eq!(find_column(&cols, "vth_class_minority_sanction"), None);
    }

    #[test]
    fn select_binds_all_required_columns() {
        let table = BindingTable::resolve(&BindingConfig::default(), &full_headers());
        let selected = table
            .select(Selection::new(Level::School, Category::NonMinority))
            .expect("selection binds");
        assert_eq!(selected.district.index, 0);
        assert_eq!(selected.sanctioned.name, "vth_class_non_minority_sanctioned");
        assert_eq!(selected.vacancy.index, 7);
        assert_eq!(selected.attendance.name, "total_school_attendance");
        assert_eq!(selected.absentees.index, 9);
    }

    #[test]
    fn select_lists_every_missing_field() {
        let table = BindingTable::resolve(&BindingConfig::default(), &full_headers());
        let err = table
            .select(Selection::new(Level::Intermediate, Category::Minority))
            .unwrap_err();
        match err {
            DashboardError::MissingColumns { fields, .. } => {
                assert_eq!(fields.len(), 4);
                assert!(fields[0].starts_with("intermediate.minority.sanctioned"));
                assert!(fields[3].starts_with("intermediate.attendance"));
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn multiple_matches_are_ambiguous() {
        let mut cols = full_headers();
        cols.push("total_absentees_previous_week".to_string());
        let table = BindingTable::resolve(&BindingConfig::default(), &cols);
        // exact header name breaks the tie
        assert!(matches!(
            table.get(LogicalField::Absentees).unwrap().resolution,
            Resolution::Bound { index: 9, .. }
        ));

        let mut cols = full_headers();
        cols[9] = "total_absentees_boys".to_string();
        cols.push("total_absentees_girls".to_string());
        let table = BindingTable::resolve(&BindingConfig::default(), &cols);
        let err = table.select(Selection::default()).unwrap_err();
        assert!(matches!(err, DashboardError::AmbiguousColumns { .. }));
        assert!(err.to_string().contains("total_absentees_boys"));
    }

    #[test]
    fn later_patterns_apply_when_earlier_ones_miss() {
        let mut config = BindingConfig::default();
        config.absentees = vec!["absent_total".into(), "Total Absentees".into()];
        let table = BindingTable::resolve(&config, &full_headers());
        match &table.get(LogicalField::Absentees).unwrap().resolution {
            Resolution::Bound { pattern, .. } => assert_eq!(pattern, "total_absentees"),
            other => panic!("expected bound, got {other:?}"),
        }
    }

    #[test]
    fn verbatim_fields_do_not_substring_match() {
        let cols = headers(&["district_code", "college_name_full"]);
        let table = BindingTable::resolve(&BindingConfig::default(), &cols);
        assert_eq!(
            table.get(LogicalField::District).unwrap().resolution,
            Resolution::Missing
        );
        assert_eq!(
            table.get(LogicalField::Institution).unwrap().resolution,
            Resolution::Missing
        );
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = BindingConfig::default();
        let yaml = config.to_yaml_string().unwrap();
        let parsed: BindingConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);

        let partial: BindingConfig = serde_yaml::from_str("district_column: zone\n").unwrap();
        assert_eq!(partial.district_column, "zone");
        assert_eq!(partial.absentees, vec!["total_absentees".to_string()]);
    }

    #[test]
    fn nested_overrides_keep_sibling_defaults() {
        let overrides: Value =
            serde_yaml::from_str("school:\n  attendance: [daily_attendance]\n").unwrap();
        let config = BindingConfig::from_overrides(overrides).unwrap();
        let defaults = BindingConfig::default();
        assert_eq!(config.school.attendance, vec!["daily_attendance".to_string()]);
        assert_eq!(config.school.minority, defaults.school.minority);
        assert_eq!(config.intermediate, defaults.intermediate);

        let empty = BindingConfig::from_overrides(Value::Null).unwrap();
        assert_eq!(empty, defaults);
    }
}
