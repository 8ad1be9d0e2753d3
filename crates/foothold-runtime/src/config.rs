//! Terrain configuration – reads/writes `foothold.toml`.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Environment variables override the file after loading:
//!
//! | Variable | Config field |
//! |---|---|
//! | `FOOTHOLD_CONFIG` | path of the file itself (default `./foothold.toml`) |
//! | `FOOTHOLD_RESOLUTION` | `resolution` |
//! | `FOOTHOLD_CLOUD_MEAN` | `cloud_mean` (`true`/`false`/`1`/`0`) |
//!
//! # Example
//!
//! ```
//! use foothold_runtime::config::TerrainConfig;
//!
//! let cfg = TerrainConfig::parse(r#"
//!     resolution = 0.05
//!
//!     [[features]]
//!     kind = "curvature"
//!     weight = 2.0
//!     max_curvature = 0.05
//! "#).unwrap();
//!
//! let map = cfg.build_reward_map().unwrap();
//! assert_eq!(map.features().len(), 1);
//! assert_eq!(map.search_areas().len(), 1);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use foothold_environment::{
    CurvatureFeature, HeightDeviationFeature, RewardMap, SlopeFeature, SpatialTerrainEvaluator,
    TerrainFeature,
};
use foothold_planning::{CostGraphBuilder, DEFAULT_SEARCH_RADIUS};
use foothold_types::{FootholdError, NeighboringWindow, SearchArea};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_ENV: &str = "FOOTHOLD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "foothold.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

/// One terrain feature, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSpec {
    Slope {
        #[serde(default = "default_weight")]
        weight: f64,
        /// Slopes up to this angle are ideal (degrees).
        #[serde(default = "default_flat_angle_deg")]
        flat_angle_deg: f64,
        /// Slopes at or above this angle score worst (degrees).
        #[serde(default = "default_max_angle_deg")]
        max_angle_deg: f64,
    },
    Curvature {
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default = "default_max_curvature")]
        max_curvature: f64,
    },
    HeightDeviation {
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default = "default_radius_cells")]
        radius_cells: u16,
        /// Metres.
        #[serde(default = "default_max_deviation")]
        max_deviation: f64,
    },
}

impl FeatureSpec {
    pub fn weight(&self) -> f64 {
        match self {
            FeatureSpec::Slope { weight, .. }
            | FeatureSpec::Curvature { weight, .. }
            | FeatureSpec::HeightDeviation { weight, .. } => *weight,
        }
    }

    /// Instantiate the built-in feature described here.
    pub fn build(&self) -> Result<Box<dyn TerrainFeature>, FootholdError> {
        if !self.weight().is_finite() {
            return Err(FootholdError::Config(format!(
                "feature weight must be finite, got {}",
                self.weight()
            )));
        }
        let feature: Box<dyn TerrainFeature> = match *self {
            FeatureSpec::Slope {
                weight,
                flat_angle_deg,
                max_angle_deg,
            } => Box::new(SlopeFeature::new(
                weight,
                flat_angle_deg.to_radians(),
                max_angle_deg.to_radians(),
            )),
            FeatureSpec::Curvature {
                weight,
                max_curvature,
            } => Box::new(CurvatureFeature::new(weight, max_curvature)),
            FeatureSpec::HeightDeviation {
                weight,
                radius_cells,
                max_deviation,
            } => Box::new(HeightDeviationFeature::new(weight, radius_cells, max_deviation)),
        };
        Ok(feature)
    }
}

/// Persisted terrain evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TerrainConfig {
    /// Environment grid resolution (metres).
    pub resolution: f64,
    /// Report the neighbour-cloud centroid as a cell's position.
    pub cloud_mean: bool,
    /// Farthest neighbour (in cells) linked by the cost graph.
    pub search_radius_cells: u16,
    pub neighboring_window: NeighboringWindow,
    pub search_areas: Vec<SearchArea>,
    pub features: Vec<FeatureSpec>,
}

fn default_weight() -> f64 {
    1.0
}
fn default_flat_angle_deg() -> f64 {
    10.0
}
fn default_max_angle_deg() -> f64 {
    45.0
}
fn default_max_curvature() -> f64 {
    0.1
}
fn default_radius_cells() -> u16 {
    2
}
fn default_max_deviation() -> f64 {
    0.15
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            resolution: 0.04,
            cloud_mean: false,
            search_radius_cells: DEFAULT_SEARCH_RADIUS,
            neighboring_window: NeighboringWindow::default(),
            search_areas: vec![SearchArea::default()],
            features: vec![
                FeatureSpec::Slope {
                    weight: default_weight(),
                    flat_angle_deg: default_flat_angle_deg(),
                    max_angle_deg: default_max_angle_deg(),
                },
                FeatureSpec::Curvature {
                    weight: default_weight(),
                    max_curvature: default_max_curvature(),
                },
            ],
        }
    }
}

impl TerrainConfig {
    /// Parse a TOML document.
    pub fn parse(raw: &str) -> Result<Self, FootholdError> {
        toml::from_str(raw).map_err(|e| FootholdError::Config(format!("Failed to parse config: {e}")))
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String, FootholdError> {
        toml::to_string_pretty(self)
            .map_err(|e| FootholdError::Config(format!("Failed to serialize config: {e}")))
    }

    /// A [`RewardMap`] with this configuration's grid, window, search areas
    /// and features installed.
    pub fn build_reward_map(&self) -> Result<RewardMap, FootholdError> {
        let mut map = RewardMap::new(self.resolution)?;
        map.set_neighboring_window(self.neighboring_window);
        map.set_cloud_mean(self.cloud_mean);
        for area in &self.search_areas {
            map.add_search_area(*area)?;
        }
        for spec in &self.features {
            map.add_feature(spec.build()?);
        }
        Ok(map)
    }

    pub fn build_evaluator(&self) -> Result<SpatialTerrainEvaluator, FootholdError> {
        Ok(SpatialTerrainEvaluator::from_map(self.build_reward_map()?))
    }

    pub fn build_graph_builder(&self) -> CostGraphBuilder {
        CostGraphBuilder::with_radius(self.search_radius_cells)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading and saving
// ─────────────────────────────────────────────────────────────────────────────

/// `$FOOTHOLD_CONFIG`, or `./foothold.toml`.
pub fn config_path() -> PathBuf {
    config_path_from(std::env::var(CONFIG_ENV).ok())
}

pub(crate) fn config_path_from(var: Option<String>) -> PathBuf {
    match var {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Load from [`config_path`]. `Ok(None)` when the file does not exist.
pub fn load() -> Result<Option<TerrainConfig>, FootholdError> {
    load_from(&config_path())
}

/// Load from `path` and apply environment overrides.
pub fn load_from(path: &Path) -> Result<Option<TerrainConfig>, FootholdError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        FootholdError::Config(format!("Failed to read config at {}: {e}", path.display()))
    })?;
    let mut cfg = TerrainConfig::parse(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Write `cfg` to `path`, creating parent directories.
pub fn save_to(cfg: &TerrainConfig, path: &Path) -> Result<(), FootholdError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| FootholdError::Config(format!("Failed to create config directory: {e}")))?;
    }
    fs::write(path, cfg.to_toml()?).map_err(|e| {
        FootholdError::Config(format!("Failed to write config at {}: {e}", path.display()))
    })
}

/// Apply `FOOTHOLD_*` overrides from the process environment.
pub fn apply_env_overrides(cfg: &mut TerrainConfig) {
    apply_overrides(cfg, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`. Unparseable values are logged
/// and ignored.
pub(crate) fn apply_overrides(cfg: &mut TerrainConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("FOOTHOLD_RESOLUTION") {
        match v.trim().parse::<f64>() {
            Ok(r) if r.is_finite() && r > 0.0 => cfg.resolution = r,
            _ => warn!(value = %v, "ignoring invalid FOOTHOLD_RESOLUTION"),
        }
    }
    if let Some(v) = lookup("FOOTHOLD_CLOUD_MEAN") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => cfg.cloud_mean = true,
            "0" | "false" | "no" | "off" => cfg.cloud_mean = false,
            _ => warn!(value = %v, "ignoring invalid FOOTHOLD_CLOUD_MEAN"),
        }
    }
}

/// JSON schema of [`TerrainConfig`], pretty-printed.
pub fn config_schema() -> Result<String, FootholdError> {
    let schema = schemars::schema_for!(TerrainConfig);
    serde_json::to_string_pretty(&schema)
        .map_err(|e| FootholdError::Config(format!("Failed to render schema: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = TerrainConfig::parse("").unwrap();
        assert_eq!(cfg, TerrainConfig::default());
        assert_eq!(cfg.resolution, 0.04);
        assert_eq!(cfg.search_radius_cells, 3);
        assert_eq!(cfg.neighboring_window, NeighboringWindow::new(-1, 1, -1, 1, -1, 1));
        assert_eq!(cfg.search_areas, vec![SearchArea::new(0.5, 3.0, -0.75, 0.75, -0.77, -0.4, 0.04)]);
    }

    #[test]
    fn parses_full_document() {
        let cfg = TerrainConfig::parse(
            r#"
            resolution = 0.1
            cloud_mean = true
            search_radius_cells = 2

            [neighboring_window]
            min_x = -2
            max_x = 2
            min_y = -2
            max_y = 2
            min_z = -1
            max_z = 0

            [[search_areas]]
            min_x = 0.0
            max_x = 1.0
            min_y = -0.5
            max_y = 0.5
            min_z = -1.0
            max_z = 0.0
            resolution = 0.1

            [[features]]
            kind = "slope"
            weight = 2.0
            flat_angle_deg = 5.0
            max_angle_deg = 30.0

            [[features]]
            kind = "height_deviation"
            radius_cells = 1
            "#,
        )
        .unwrap();

        assert_eq!(cfg.resolution, 0.1);
        assert!(cfg.cloud_mean);
        assert_eq!(cfg.neighboring_window.min_x, -2);
        assert_eq!(cfg.search_areas.len(), 1);
        assert_eq!(
            cfg.features,
            vec![
                FeatureSpec::Slope {
                    weight: 2.0,
                    flat_angle_deg: 5.0,
                    max_angle_deg: 30.0
                },
                FeatureSpec::HeightDeviation {
                    weight: 1.0,
                    radius_cells: 1,
                    max_deviation: 0.15
                },
            ]
        );
    }

    #[test]
    fn unknown_feature_kind_is_a_config_error() {
        let err = TerrainConfig::parse("[[features]]\nkind = \"roughness\"\n").unwrap_err();
        assert!(matches!(err, FootholdError::Config(_)));
    }

    #[test]
    fn build_reward_map_installs_everything() {
        let mut cfg = TerrainConfig::default();
        cfg.cloud_mean = true;
        cfg.features.push(FeatureSpec::HeightDeviation {
            weight: 0.5,
            radius_cells: 1,
            max_deviation: 0.1,
        });
        let map = cfg.build_reward_map().unwrap();
        assert_eq!(map.grid().resolution(), 0.04);
        assert!(map.uses_cloud_mean());
        assert_eq!(map.search_areas(), &cfg.search_areas[..]);
        let names: Vec<&str> = map.features().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["slope", "curvature", "height_deviation"]);
        assert_eq!(map.features()[2].weight(), 0.5);
    }

    #[test]
    fn build_rejects_invalid_values() {
        let cfg = TerrainConfig {
            resolution: 0.0,
            ..TerrainConfig::default()
        };
        assert!(matches!(cfg.build_reward_map(), Err(FootholdError::Config(_))));

        let mut cfg = TerrainConfig::default();
        cfg.search_areas[0].resolution = -1.0;
        assert!(matches!(cfg.build_reward_map(), Err(FootholdError::Config(_))));

        let cfg = TerrainConfig {
            features: vec![FeatureSpec::Curvature {
                weight: f64::NAN,
                max_curvature: 0.1,
            }],
            ..TerrainConfig::default()
        };
        assert!(matches!(cfg.build_reward_map(), Err(FootholdError::Config(_))));
    }

    #[test]
    fn graph_builder_uses_configured_radius() {
        let cfg = TerrainConfig {
            search_radius_cells: 5,
            ..TerrainConfig::default()
        };
        assert_eq!(cfg.build_graph_builder().max_radius(), 5);
    }

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("foothold.toml");

        let mut cfg = TerrainConfig::default();
        cfg.features.push(FeatureSpec::HeightDeviation {
            weight: 3.0,
            radius_cells: 4,
            max_deviation: 0.2,
        });
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.features, cfg.features);
        assert_eq!(loaded.search_areas, cfg.search_areas);
        assert_eq!(loaded.neighboring_window, cfg.neighboring_window);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join("absent.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("foothold.toml");
        fs::write(&path, "resolution = \"fine\"").unwrap();
        assert!(matches!(load_from(&path), Err(FootholdError::Config(_))));
    }

    #[test]
    fn config_path_defaults_to_working_directory() {
        assert_eq!(config_path_from(None), PathBuf::from("foothold.toml"));
        assert_eq!(config_path_from(Some("  ".into())), PathBuf::from("foothold.toml"));
        assert_eq!(
            config_path_from(Some("/etc/foothold/robot.toml".into())),
            PathBuf::from("/etc/foothold/robot.toml")
        );
    }

    #[test]
    fn overrides_change_resolution_and_cloud_mean() {
        let mut cfg = TerrainConfig::default();
        apply_overrides(
            &mut cfg,
            lookup(&[("FOOTHOLD_RESOLUTION", "0.02"), ("FOOTHOLD_CLOUD_MEAN", "true")]),
        );
        assert_eq!(cfg.resolution, 0.02);
        assert!(cfg.cloud_mean);

        apply_overrides(&mut cfg, lookup(&[("FOOTHOLD_CLOUD_MEAN", "0")]));
        assert!(!cfg.cloud_mean);
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut cfg = TerrainConfig::default();
        apply_overrides(
            &mut cfg,
            lookup(&[("FOOTHOLD_RESOLUTION", "-1"), ("FOOTHOLD_CLOUD_MEAN", "maybe")]),
        );
        assert_eq!(cfg, TerrainConfig::default());

        apply_overrides(&mut cfg, lookup(&[("FOOTHOLD_RESOLUTION", "fine")]));
        assert_eq!(cfg.resolution, 0.04);
    }

    #[test]
    fn schema_describes_feature_kinds() {
        let schema = config_schema().unwrap();
        let value: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert_eq!(value["title"], "TerrainConfig");
        assert!(schema.contains("height_deviation"));
        assert!(schema.contains("search_areas"));
    }
}
