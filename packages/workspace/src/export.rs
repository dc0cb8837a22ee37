//! `GeoJSON` export of feature subsets.
//!
//! Restores each feature's original properties. Subsets annotated with
//! per-record shares also carry `PercentOfTotalAcres` and
//! `PercentOfTotalDays` properties.

use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::Value;

use crate::subsets::{PERCENT_OF_YEAR_ACRES, PERCENT_OF_YEAR_DAYS};
use crate::{FeatureWorkspace, WorkspaceError};

/// Exported property name for the acreage share.
pub const ACRES_SHARE_PROPERTY: &str = "PercentOfTotalAcres";
/// Exported property name for the burn-day share.
pub const DAYS_SHARE_PROPERTY: &str = "PercentOfTotalDays";

impl FeatureWorkspace {
    /// Writes subset `name` to `path` as a `FeatureCollection`.
    ///
    /// Returns the number of features written.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the subset is missing, a stored value
    /// cannot be decoded, or the file cannot be written.
    pub fn export_geojson(&self, name: &str, path: &Path) -> Result<usize, WorkspaceError> {
        let collection = self.feature_collection(name)?;
        let count = collection.features.len();

        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&collection)?)?;

        log::info!("Exported {count} features from '{name}' to {}", path.display());
        Ok(count)
    }

    /// Builds a `FeatureCollection` from subset `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the subset is missing or a stored value
    /// cannot be decoded.
    pub fn feature_collection(&self, name: &str) -> Result<FeatureCollection, WorkspaceError> {
        let quoted = self.existing(name)?;
        let annotated = self.has_column(name, PERCENT_OF_YEAR_ACRES)?
            && self.has_column(name, PERCENT_OF_YEAR_DAYS)?;

        let share_columns = if annotated {
            format!(", {PERCENT_OF_YEAR_ACRES}, {PERCENT_OF_YEAR_DAYS}")
        } else {
            ", NULL::DOUBLE, NULL::DOUBLE".to_string()
        };

        let mut stmt = self.conn().prepare(&format!(
            "SELECT properties, geometry{share_columns} FROM {quoted} ORDER BY fid"
        ))?;
        let mut rows = stmt.query([])?;

        let mut features = Vec::new();
        while let Some(row) = rows.next()? {
            let properties: String = row.get(0)?;
            let geometry: Option<String> = row.get(1)?;
            let acres_share: Option<f64> = row.get(2)?;
            let days_share: Option<f64> = row.get(3)?;

            let mut props: JsonObject = serde_json::from_str(&properties)?;
            if annotated {
                props.insert(ACRES_SHARE_PROPERTY.to_string(), json_number(acres_share));
                props.insert(DAYS_SHARE_PROPERTY.to_string(), json_number(days_share));
            }

            let geometry = geometry
                .as_deref()
                .map(serde_json::from_str::<Geometry>)
                .transpose()?;

            features.push(Feature {
                bbox: None,
                geometry,
                id: None,
                properties: Some(props),
                foreign_members: None,
            });
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

fn json_number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}
