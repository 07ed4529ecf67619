#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use irrigation_dashboard::config::{DashboardConfig, DatasetConfig, SourceFormat};
use rust_xlsxwriter::Workbook;
use tempfile::{TempDir, tempdir};

/// Dam register in the layout of the third dashboard's source file.
pub const DAMS_CSV: &str = "\
Project Name,Status,Dam_Type,Dam_Length_Total_Mtr,Latitude,Longitude,Storage_Gross_Capacity_TMC,Irrigation_Gross_Command_Area_Ha,Submergence_Area_Total_Ha
Tunga Anicut,Completed,Gravity,850,13.93,75.57,3.24,1000,200
Bhadra,Under Construction,Earthen,\"1,708 m\",13.70,75.64,71.5,2000,300
Hemavathi,,Masonry Gravity,2400,,76.01,37.1,,
Kabini,Ongoing,Earthen,2684,11.97,76.35,19.52,500,50
";

/// Three projects: unparsable coordinates, a valid under-construction site,
/// and a row with no status and no latitude.
pub const THREE_ROW_CSV: &str = "\
Project Name,Status,Latitude,Longitude,Approval Amount,Hectares of land irrigated
Alpha,Completed,north,east,12.5 Cr,100
Beta,Under Construction,15.2,75.9,\"1,200\",50
Gamma,,,76.1,3,
";

#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Authors a single-sheet workbook with a header row.
    pub fn write_xlsx(&self, name: &str, headers: &[&str], rows: &[Vec<Cell<'_>>]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, header) in headers.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .expect("write header");
        }
        for (row_idx, row) in rows.iter().enumerate() {
            let row_num = row_idx as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(text) => {
                        worksheet
                            .write_string(row_num, col as u16, *text)
                            .expect("write text cell");
                    }
                    Cell::Number(value) => {
                        worksheet
                            .write_number(row_num, col as u16, *value)
                            .expect("write number cell");
                    }
                    Cell::Blank => {}
                }
            }
        }
        workbook.save(&path).expect("save workbook");
        path
    }

    /// Built-in presets with sources resolved inside this workspace.
    pub fn config(&self) -> DashboardConfig {
        let mut config = DashboardConfig::builtin();
        config.data_dir = Some(self.path().to_path_buf());
        config
    }
}

/// The second preset pointed at a delimited file in the workspace.
pub fn csv_dataset(config: &DashboardConfig, file: &str, drop_rows: bool) -> DatasetConfig {
    let mut dataset = config.dataset("irrigation2").expect("preset").clone();
    dataset.source.path = PathBuf::from(file);
    dataset.source.format = Some(SourceFormat::Csv);
    dataset.drop_rows_without_coordinates = drop_rows;
    dataset
}
