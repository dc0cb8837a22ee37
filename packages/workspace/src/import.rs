//! `GeoJSON` perimeter import.
//!
//! Loads a `FeatureCollection` into a named feature subset. The configured
//! year, acreage, and date properties are lifted into typed columns; every
//! property is also kept verbatim as JSON so exports can restore it.

use std::path::Path;

use duckdb::params;
use fire_perimeter_models::FieldMapping;
use geojson::{Feature, GeoJson};
use serde_json::Value;

use crate::dates::{parse_date_value, to_epoch_seconds};
use crate::subsets::create_feature_table;
use crate::{FeatureWorkspace, WorkspaceError, quote_ident};

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Features written.
    pub features: u64,
    /// Features with no parseable acreage.
    pub missing_acres: u64,
    /// Features with no parseable alarm or containment date.
    pub missing_dates: u64,
    /// Features with no parseable year.
    pub missing_year: u64,
}

impl FeatureWorkspace {
    /// Imports a `GeoJSON` file as subset `name`, replacing any existing
    /// subset of that name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the file cannot be read or parsed, or
    /// the subset cannot be written.
    pub fn import_geojson(
        &self,
        path: &Path,
        name: &str,
        fields: &FieldMapping,
    ) -> Result<ImportSummary, WorkspaceError> {
        log::info!("Importing {} as subset '{name}'...", path.display());
        let text = std::fs::read_to_string(path)?;
        self.import_geojson_str(&text, name, fields)
    }

    /// Imports `GeoJSON` text as subset `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the text is not a feature or feature
    /// collection, or the subset cannot be written.
    pub fn import_geojson_str(
        &self,
        text: &str,
        name: &str,
        fields: &FieldMapping,
    ) -> Result<ImportSummary, WorkspaceError> {
        let quoted = quote_ident(name)?;

        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                return Err(WorkspaceError::UnsupportedGeoJson {
                    message: "bare geometry without properties".to_string(),
                });
            }
        };

        create_feature_table(self.conn(), &quoted)?;

        let mut summary = ImportSummary::default();
        let mut stmt = self.conn().prepare(&format!(
            "INSERT INTO {quoted}
                (fid, year, acres, alarm_epoch, containment_epoch, properties, geometry)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))?;

        for (i, feature) in features.iter().enumerate() {
            let row = FeatureRow::from_feature(feature, fields)?;

            if row.acres.is_none() {
                summary.missing_acres += 1;
            }
            if row.alarm_epoch.is_none() || row.containment_epoch.is_none() {
                summary.missing_dates += 1;
            }
            if row.year.is_none() {
                summary.missing_year += 1;
            }

            let fid = i64::try_from(i).unwrap_or(i64::MAX) + 1;
            stmt.execute(params![
                fid,
                row.year,
                row.acres,
                row.alarm_epoch,
                row.containment_epoch,
                row.properties,
                row.geometry,
            ])?;
            summary.features += 1;
        }

        log::info!(
            "Imported {} features into '{name}' ({} without acreage, {} without a full date pair, {} without a year)",
            summary.features,
            summary.missing_acres,
            summary.missing_dates,
            summary.missing_year,
        );

        Ok(summary)
    }
}

/// Typed column values extracted from one feature.
struct FeatureRow {
    year: Option<i32>,
    acres: Option<f64>,
    alarm_epoch: Option<i64>,
    containment_epoch: Option<i64>,
    properties: String,
    geometry: Option<String>,
}

impl FeatureRow {
    fn from_feature(feature: &Feature, fields: &FieldMapping) -> Result<Self, WorkspaceError> {
        let prop = |key: &str| property(feature, key);

        let geometry = feature
            .geometry
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let properties = feature
            .properties
            .as_ref()
            .map_or_else(|| Ok("{}".to_string()), serde_json::to_string)?;

        Ok(Self {
            year: parse_year(prop(&fields.year)),
            acres: parse_number(prop(&fields.acres)),
            alarm_epoch: parse_date_value(prop(&fields.alarm_date)).map(to_epoch_seconds),
            containment_epoch: parse_date_value(prop(&fields.containment_date))
                .map(to_epoch_seconds),
            properties,
            geometry,
        })
    }
}

static NULL: Value = Value::Null;

fn property<'a>(feature: &'a Feature, key: &str) -> &'a Value {
    feature.property(key).unwrap_or(&NULL)
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|n: &f64| n.is_finite())
}

#[allow(clippy::cast_possible_truncation)]
fn parse_year(value: &Value) -> Option<i32> {
    let year = parse_number(value)?;
    (year.fract() == 0.0 && year >= f64::from(i32::MIN) && year <= f64::from(i32::MAX))
        .then_some(year as i32)
}
