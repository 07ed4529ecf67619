//! Dashboard configuration: one [`DatasetConfig`] per dashboard.
//!
//! Each dataset describes where its source file lives, how headers are
//! normalized, which columns hold coordinates, statuses, and totals, the
//! status vocabulary, and whether rows without coordinates are retained.
//! The three built-in presets describe the Karnataka dashboards; a YAML file
//! can replace them entirely.

use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    data::HeaderCase,
    status::{ColorRule, Palette, StatusRule, UnmatchedStatus, default_rules},
};

/// Case-insensitive column selector, written `equals: Status` or `contains: lat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatcherEntry", into = "MatcherEntry")]
pub enum ColumnMatcher {
    Equals(String),
    Contains(String),
}

/// Single-key map form of [`ColumnMatcher`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatcherEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contains: Option<String>,
}

impl TryFrom<MatcherEntry> for ColumnMatcher {
    type Error = String;

    fn try_from(entry: MatcherEntry) -> std::result::Result<Self, Self::Error> {
        match (entry.equals, entry.contains) {
            (Some(name), None) => Ok(ColumnMatcher::Equals(name)),
            (None, Some(needle)) => Ok(ColumnMatcher::Contains(needle)),
            _ => Err("column matcher needs exactly one of `equals` or `contains`".to_string()),
        }
    }
}

impl From<ColumnMatcher> for MatcherEntry {
    fn from(matcher: ColumnMatcher) -> Self {
        match matcher {
            ColumnMatcher::Equals(name) => MatcherEntry {
                equals: Some(name),
                contains: None,
            },
            ColumnMatcher::Contains(needle) => MatcherEntry {
                equals: None,
                contains: Some(needle),
            },
        }
    }
}

impl ColumnMatcher {
    pub fn equals(name: &str) -> Self {
        ColumnMatcher::Equals(name.to_string())
    }

    pub fn contains(needle: &str) -> Self {
        ColumnMatcher::Contains(needle.to_string())
    }

    pub fn matches(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        match self {
            ColumnMatcher::Equals(name) => column == name.to_lowercase(),
            ColumnMatcher::Contains(needle) => column.contains(&needle.to_lowercase()),
        }
    }
}

/// Returns the first column (in table order) accepted by any matcher.
pub fn resolve_column(columns: &[String], matchers: &[ColumnMatcher]) -> Option<usize> {
    if matchers.is_empty() {
        return None;
    }
    columns
        .iter()
        .position(|column| matchers.iter().any(|m| m.matches(column)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Xlsx,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Detected from the file extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SourceFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub header_case: HeaderCase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateConfig {
    pub latitude: Vec<ColumnMatcher>,
    pub longitude: Vec<ColumnMatcher>,
    /// Misspelled header → canonical header, applied only when the canonical
    /// header is absent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renames: BTreeMap<String, String>,
    /// Fail with a schema error when the columns cannot be resolved.
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    pub columns: Vec<ColumnMatcher>,
    #[serde(default)]
    pub unmatched: UnmatchedStatus,
    #[serde(default = "default_rules")]
    pub rules: Vec<StatusRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraTotal {
    pub label: String,
    pub columns: Vec<ColumnMatcher>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsConfig {
    #[serde(default)]
    pub amount: Vec<ColumnMatcher>,
    #[serde(default)]
    pub area: Vec<ColumnMatcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraTotal>,
}

/// Source columns feeding the per-project display list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFields {
    #[serde(default)]
    pub name: Vec<ColumnMatcher>,
    #[serde(default)]
    pub amount: Vec<ColumnMatcher>,
    #[serde(default)]
    pub hectares: Vec<ColumnMatcher>,
    #[serde(default)]
    pub region: Vec<ColumnMatcher>,
    #[serde(default, rename = "type")]
    pub kind: Vec<ColumnMatcher>,
    #[serde(default)]
    pub districts: Vec<ColumnMatcher>,
    #[serde(default)]
    pub purpose: Vec<ColumnMatcher>,
    #[serde(default)]
    pub dpr_date: Vec<ColumnMatcher>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupField {
    pub label: String,
    /// Shows the normalized status instead of a column value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub status: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl PopupField {
    fn column(label: &str, column: &str) -> Self {
        Self {
            label: label.to_string(),
            status: false,
            columns: vec![ColumnMatcher::equals(column)],
            prefix: None,
            suffix: None,
        }
    }

    fn status(label: &str) -> Self {
        Self {
            label: label.to_string(),
            status: true,
            columns: Vec::new(),
            prefix: None,
            suffix: None,
        }
    }

    fn affixed(mut self, prefix: Option<&str>, suffix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self.suffix = suffix.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub type_column: Vec<ColumnMatcher>,
    pub length_column: Vec<ColumnMatcher>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: String,
    pub title: String,
    pub source: SourceConfig,
    pub coordinates: CoordinateConfig,
    #[serde(default)]
    pub drop_rows_without_coordinates: bool,
    pub status: StatusConfig,
    /// Status label → color, applied before `palette_rules`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub palette: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub palette_rules: Vec<ColorRule>,
    /// Replaces the dashboard-wide map settings for this dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapSettings>,
    #[serde(default)]
    pub totals: TotalsConfig,
    #[serde(default)]
    pub fields: ProjectFields,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub popup: Vec<PopupField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterConfig>,
}

impl DatasetConfig {
    pub fn color_palette(&self) -> Palette {
        Palette::with_overrides(&self.palette).with_rules(&self.palette_rules)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center: [15.3173, 75.7139],
            zoom: 7,
            tiles: "CartoDB positron".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base directory for relative source paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub map: MapSettings,
    pub datasets: Vec<DatasetConfig>,
}

impl DashboardConfig {
    pub fn builtin() -> Self {
        Self {
            data_dir: None,
            map: MapSettings::default(),
            datasets: vec![irrigation1(), irrigation2(), irrigation3()],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: DashboardConfig =
            serde_yaml::from_reader(reader).context("Parsing dashboard config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in presets.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing dashboard config to YAML")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.datasets.is_empty(), "Config defines no datasets");
        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            ensure!(!dataset.id.trim().is_empty(), "Dataset id must not be empty");
            ensure!(
                seen.insert(dataset.id.as_str()),
                "Duplicate dataset id '{}'",
                dataset.id
            );
            ensure!(
                !dataset.coordinates.latitude.is_empty() && !dataset.coordinates.longitude.is_empty(),
                "Dataset '{}' must declare latitude and longitude matchers",
                dataset.id
            );
        }
        Ok(())
    }

    pub fn dataset(&self, id: &str) -> Result<&DatasetConfig> {
        self.datasets
            .iter()
            .find(|dataset| dataset.id == id)
            .ok_or_else(|| {
                let known = self
                    .datasets
                    .iter()
                    .map(|d| d.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow!("Unknown dataset '{id}' (configured: {known})")
            })
    }

    pub fn map_settings<'a>(&'a self, dataset: &'a DatasetConfig) -> &'a MapSettings {
        dataset.map.as_ref().unwrap_or(&self.map)
    }

    pub fn source_path(&self, dataset: &DatasetConfig) -> PathBuf {
        match &self.data_dir {
            Some(dir) if dataset.source.path.is_relative() => dir.join(&dataset.source.path),
            _ => dataset.source.path.clone(),
        }
    }
}

fn equals(names: &[&str]) -> Vec<ColumnMatcher> {
    names.iter().map(|name| ColumnMatcher::equals(name)).collect()
}

fn contains(needles: &[&str]) -> Vec<ColumnMatcher> {
    needles
        .iter()
        .map(|needle| ColumnMatcher::contains(needle))
        .collect()
}

fn irrigation1() -> DatasetConfig {
    let mut renames = BTreeMap::new();
    renames.insert("logitude".to_string(), "longitude".to_string());
    DatasetConfig {
        id: "irrigation1".to_string(),
        title: "Karnataka Irrigation Projects".to_string(),
        source: SourceConfig {
            path: PathBuf::from("karnataka_irr1.xlsx"),
            format: Some(SourceFormat::Xlsx),
            encoding: None,
            delimiter: None,
            header_case: HeaderCase::Lower,
        },
        coordinates: CoordinateConfig {
            latitude: equals(&["latitude"]),
            longitude: equals(&["longitude"]),
            renames,
            required: true,
        },
        drop_rows_without_coordinates: true,
        status: StatusConfig {
            columns: equals(&["current_status"]),
            unmatched: UnmatchedStatus::Verbatim,
            rules: default_rules(),
        },
        palette: BTreeMap::new(),
        palette_rules: Vec::new(),
        map: Some(MapSettings {
            tiles: "CartoDB dark_matter".to_string(),
            ..MapSettings::default()
        }),
        totals: TotalsConfig {
            amount: equals(&["dpr_approval_amount"]),
            area: equals(&["hectares_irrigated"]),
            extra: Vec::new(),
        },
        fields: ProjectFields {
            name: equals(&["project_name"]),
            amount: equals(&["dpr_approval_amount"]),
            hectares: equals(&["hectares_irrigated"]),
            region: equals(&["region"]),
            kind: equals(&["project_type"]),
            districts: equals(&["districts_benefitted"]),
            purpose: equals(&["primary_purpose"]),
            dpr_date: equals(&["dpr_approval_date"]),
        },
        popup: vec![
            PopupField::status("Status"),
            PopupField::column("DPR Approval", "dpr_approval_date"),
            PopupField::column("Amount", "dpr_approval_amount").affixed(Some("₹"), Some(" Cr")),
            PopupField::column("Region", "region"),
            PopupField::column("Type", "project_type"),
            PopupField::column("Area", "hectares_irrigated").affixed(None, Some(" Ha")),
            PopupField::column("Districts", "districts_benefitted"),
            PopupField::column("Purpose", "primary_purpose"),
        ],
        filters: None,
    }
}

fn irrigation2() -> DatasetConfig {
    DatasetConfig {
        id: "irrigation2".to_string(),
        title: "Karnataka Irrigation Projects II".to_string(),
        source: SourceConfig {
            path: PathBuf::from("karnataka_irr2.xlsx"),
            format: Some(SourceFormat::Xlsx),
            encoding: None,
            delimiter: None,
            header_case: HeaderCase::Preserve,
        },
        coordinates: CoordinateConfig {
            latitude: contains(&["lat"]),
            longitude: contains(&["lon", "long"]),
            renames: BTreeMap::new(),
            required: false,
        },
        drop_rows_without_coordinates: false,
        status: StatusConfig {
            columns: contains(&["status"]),
            unmatched: UnmatchedStatus::Verbatim,
            rules: default_rules(),
        },
        palette: BTreeMap::new(),
        palette_rules: Vec::new(),
        map: None,
        totals: TotalsConfig {
            amount: vec![
                ColumnMatcher::contains("approval amount"),
                ColumnMatcher::equals("amount"),
            ],
            area: contains(&["hectare"]),
            extra: Vec::new(),
        },
        fields: ProjectFields {
            name: equals(&["Project Name"]),
            amount: equals(&["Approval Amount"]),
            hectares: equals(&["Hectares of land irrigated"]),
            region: equals(&["District"]),
            kind: equals(&["Project Type"]),
            districts: equals(&["District"]),
            purpose: equals(&["Canals under this project"]),
            dpr_date: equals(&["DRP Approval Date"]),
        },
        popup: vec![
            PopupField::status("Status"),
            PopupField::column("Type", "Project Type"),
            PopupField::column("DPR Approval Date", "DRP Approval Date"),
            PopupField::column("Approval Amount", "Approval Amount").affixed(Some("₹ "), None),
            PopupField::column("Hectares Irrigated", "Hectares of land irrigated")
                .affixed(None, Some(" Ha")),
            PopupField::column("District", "District"),
            PopupField::column("Canals under Project", "Canals under this project"),
        ],
        filters: None,
    }
}

fn irrigation3() -> DatasetConfig {
    DatasetConfig {
        id: "irrigation3".to_string(),
        title: "Karnataka Dams and Reservoirs".to_string(),
        source: SourceConfig {
            // Delimited text despite the extension.
            path: PathBuf::from("karnataka_irr3.xlsx"),
            format: Some(SourceFormat::Csv),
            encoding: Some("latin1".to_string()),
            delimiter: None,
            header_case: HeaderCase::Preserve,
        },
        coordinates: CoordinateConfig {
            latitude: contains(&["lat"]),
            longitude: contains(&["lon", "long"]),
            renames: BTreeMap::new(),
            required: false,
        },
        drop_rows_without_coordinates: false,
        status: StatusConfig {
            columns: equals(&["Status"]),
            unmatched: UnmatchedStatus::Verbatim,
            rules: default_rules(),
        },
        palette: BTreeMap::new(),
        palette_rules: vec![
            ColorRule::new(&["complete"], "#10b981"),
            ColorRule::new(&["ongoing", "progress", "construction"], "#f59e0b"),
            ColorRule::new(&["planned", "approved"], "#6366f1"),
        ],
        map: None,
        totals: TotalsConfig {
            amount: equals(&["Storage_Gross_Capacity_TMC"]),
            area: equals(&["Irrigation_Gross_Command_Area_Ha"]),
            extra: vec![
                ExtraTotal {
                    label: "irrigation_total".to_string(),
                    columns: equals(&["Irrigation_Gross_Command_Area_Ha"]),
                },
                ExtraTotal {
                    label: "storage_total".to_string(),
                    columns: equals(&["Storage_Gross_Capacity_TMC"]),
                },
                ExtraTotal {
                    label: "submergence_total".to_string(),
                    columns: equals(&["Submergence_Area_Total_Ha"]),
                },
            ],
        },
        fields: ProjectFields {
            name: equals(&["Project Name"]),
            amount: equals(&["Storage_Gross_Capacity_TMC"]),
            hectares: equals(&["Submergence_Area_Total_Ha"]),
            region: equals(&["Location_District"]),
            kind: equals(&["Dam_Type"]),
            districts: equals(&["Location_District"]),
            purpose: equals(&["Spillway_Type"]),
            dpr_date: equals(&["Project Duration Years"]),
        },
        popup: vec![
            PopupField::status("Status"),
            PopupField::column("Duration (Years)", "Project Duration Years"),
            PopupField::column("Gross Capacity (TMC)", "Storage_Gross_Capacity_TMC"),
            PopupField::column("Live Capacity (TMC)", "Storage_Live_Capacity_TMC"),
            PopupField::column("Dam Type", "Dam_Type"),
            PopupField::column("Dam Length (m)", "Dam_Length_Total_Mtr"),
            PopupField::column("District", "Location_District"),
            PopupField::column("Submergence Area (Ha)", "Submergence_Area_Total_Ha"),
            PopupField::column("Spillway Type", "Spillway_Type"),
        ],
        filters: Some(FilterConfig {
            type_column: equals(&["Dam_Type"]),
            length_column: equals(&["Dam_Length_Total_Mtr"]),
        }),
    }
}
