mod common;

use common::{Cell, DAMS_CSV, THREE_ROW_CSV, TestWorkspace, csv_dataset};
use irrigation_dashboard::{
    clean::{CleanedTable, CoercedSum, NormalizedRecord, cell_sum},
    config::ColumnMatcher,
    dashboard::{self, MapOutput, NO_COORDINATES_MESSAGE},
    data::CellValue,
    filter::{BoundFilters, DamLengthBucket, FilterCondition, FilterSelection},
    geo::{Exclusion, PointOutcome},
    stats::summarize,
    status::{Palette, ProjectStatus},
};
use proptest::prelude::*;

#[test]
fn three_row_fixture_honours_row_retention_flag() {
    let workspace = TestWorkspace::new();
    workspace.write("three.csv", THREE_ROW_CSV);
    let mut config = workspace.config();

    for (drop_rows, expected_total, expected_amount) in [(false, 3, 1215.5), (true, 2, 1212.5)] {
        let dataset = csv_dataset(&config, "three.csv", drop_rows);
        config.datasets = vec![dataset.clone()];
        let view = dashboard::build_view(&config, &dataset, &FilterSelection::default())
            .expect("view");

        let points = view.map.points();
        assert_eq!(points.len(), 1, "drop_rows={drop_rows}");
        assert_eq!(points[0].name, "Beta");
        assert_eq!(points[0].status, ProjectStatus::UnderConstruction);
        assert_eq!(points[0].color, "#f97316");
        assert_eq!(view.stats.total_projects, expected_total);
        assert_eq!(view.stats.total_amount, expected_amount);
        assert_eq!(view.projects.len(), expected_total);
        assert_eq!(view.table_data.len(), expected_total);
        assert_eq!(view.diagnostics.dropped_rows, 3 - expected_total);
    }
}

#[test]
fn excluded_rows_carry_reasons() {
    let workspace = TestWorkspace::new();
    workspace.write("three.csv", THREE_ROW_CSV);
    let config = workspace.config();
    let dataset = csv_dataset(&config, "three.csv", false);
    let prepared = dashboard::prepare(&config, &dataset, Vec::new()).expect("prepare");
    let outcomes = dashboard::point_outcomes(&dataset, &prepared);

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        &outcomes[0],
        PointOutcome::Excluded {
            id: 0,
            reason: Exclusion::UnparsableCoordinate { .. }
        }
    ));
    assert!(matches!(outcomes[1], PointOutcome::Included(_)));
    assert_eq!(
        outcomes[2],
        PointOutcome::Excluded {
            id: 2,
            reason: Exclusion::MissingCoordinate
        }
    );
}

#[test]
fn popup_and_tooltip_use_configured_fields() {
    let workspace = TestWorkspace::new();
    workspace.write("karnataka_irr3.xlsx", DAMS_CSV);
    let config = workspace.config();
    let dataset = config.dataset("irrigation3").expect("preset");
    let view = dashboard::build_view(&config, dataset, &FilterSelection::default()).expect("view");

    let tunga = &view.map.points()[0];
    assert_eq!(tunga.tooltip_html, "<b>Tunga Anicut</b><br><i>completed</i>");
    assert!(tunga.popup_html.contains("<p><b>Dam Type:</b> Gravity</p>"));
    assert!(tunga.popup_html.contains("<p><b>Dam Length (m):</b> 850</p>"));
    assert!(tunga.popup_html.contains("<p><b>Live Capacity (TMC):</b> N/A</p>"));
    match &view.map {
        MapOutput::Points { settings, .. } => {
            assert_eq!(settings.center, [15.3173, 75.7139]);
            assert_eq!(settings.zoom, 7);
        }
        other => panic!("expected points, got {other:?}"),
    }
}

#[test]
fn no_parsable_coordinates_yields_placeholder_but_keeps_table() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "nocoords.csv",
        "Project Name,Status,Latitude,Longitude,Approval Amount\nAlpha,Ongoing,,,5\n",
    );
    let mut config = workspace.config();
    let dataset = csv_dataset(&config, "nocoords.csv", false);
    config.datasets = vec![dataset.clone()];
    let view = dashboard::build_view(&config, &dataset, &FilterSelection::default()).expect("view");
    assert_eq!(
        view.map,
        MapOutput::Placeholder {
            message: NO_COORDINATES_MESSAGE.to_string()
        }
    );
    assert_eq!(view.stats.total_projects, 1);
    assert_eq!(view.stats.total_amount, 5.0);
    assert_eq!(view.projects[0].lat, None);
}

#[test]
fn dam_filters_narrow_view_and_echo_selection() {
    let workspace = TestWorkspace::new();
    workspace.write("karnataka_irr3.xlsx", DAMS_CSV);
    let config = workspace.config();
    let dataset = config.dataset("irrigation3").expect("preset");
    let selection = FilterSelection {
        dam_type: Some("earthen".into()),
        dam_length: Some("2000_plus".into()),
    };
    let view = dashboard::build_view(&config, dataset, &selection).expect("view");
    assert_eq!(view.stats.total_projects, 1);
    assert_eq!(view.projects[0].name, "Kabini");
    assert_eq!(view.projects[0].dam_length, Some(2684.0));
    assert_eq!(view.dam_types, vec!["Earthen", "Gravity", "Masonry Gravity"]);

    let json = serde_json::to_value(&view).expect("json");
    assert_eq!(json["selected"]["dam_type"], "earthen");
    assert_eq!(json["map"]["kind"], "points");
    assert_eq!(json["projects"][0]["type"], "Earthen");
    assert_eq!(json["stats"]["extra_totals"]["storage_total"], 19.52);
}

#[test]
fn dam_register_colors_statuses_by_substring() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "karnataka_irr3.xlsx",
        "Project Name,Status,Dam_Type,Dam_Length_Total_Mtr,Latitude,Longitude\n\
         Varahi,Construction stage,Earthen,900,13.65,74.95\n\
         Harangi,Nearly Completed,Masonry,845,12.49,75.90\n\
         Markandeya,Planned,Earthen,1100,15.98,74.63\n",
    );
    let config = workspace.config();
    let dataset = config.dataset("irrigation3").expect("preset");
    let view = dashboard::build_view(&config, dataset, &FilterSelection::default()).expect("view");

    let colors = view
        .map
        .points()
        .iter()
        .map(|point| (point.status.label().to_string(), point.color.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        colors,
        vec![
            ("construction stage".to_string(), "#f59e0b"),
            ("nearly completed".to_string(), "#10b981"),
            ("planned".to_string(), "#6366f1"),
        ]
    );
    let stage = view
        .stats
        .status_breakdown
        .iter()
        .find(|entry| entry.status == ProjectStatus::Other("construction stage".into()))
        .expect("breakdown entry");
    assert_eq!(stage.color, "#f59e0b");
}

#[test]
fn first_dashboard_uses_dark_tiles() {
    let workspace = TestWorkspace::new();
    workspace.write_xlsx(
        "karnataka_irr1.xlsx",
        &["Project_Name", "Current_Status", "Latitude", "Longitude"],
        &[vec![
            Cell::Text("Upper Bhadra"),
            Cell::Text("Ongoing"),
            Cell::Number(13.9),
            Cell::Number(76.2),
        ]],
    );
    let config = workspace.config();
    let dataset = config.dataset("irrigation1").expect("preset");
    let view = dashboard::build_view(&config, dataset, &FilterSelection::default()).expect("view");
    match &view.map {
        MapOutput::Points { settings, points } => {
            assert_eq!(settings.tiles, "CartoDB dark_matter");
            assert_eq!(points.len(), 1);
        }
        other => panic!("expected points, got {other:?}"),
    }
}

fn random_table(rows: &[(String, String, u32)]) -> CleanedTable {
    CleanedTable {
        columns: vec![
            "Dam_Type".into(),
            "Dam_Length_Total_Mtr".into(),
            "Approval Amount".into(),
        ],
        kinds: Vec::new(),
        records: rows
            .iter()
            .enumerate()
            .map(|(position, (kind, amount, length))| NormalizedRecord {
                position,
                cells: vec![
                    CellValue::Text(kind.clone()),
                    CellValue::Number(*length as f64),
                    CellValue::Text(amount.clone()),
                ],
                status: ProjectStatus::Unknown,
                geo: Err(Exclusion::NoCoordinateColumns),
            })
            .collect(),
        coordinates: None,
        dropped_rows: 0,
        skipped_lines: 0,
    }
}

fn bucket() -> impl Strategy<Value = DamLengthBucket> {
    prop_oneof![
        Just(DamLengthBucket::UpTo1000),
        Just(DamLengthBucket::From1000To2000),
        Just(DamLengthBucket::Over2000),
    ]
}

fn row() -> impl Strategy<Value = (String, String, u32)> {
    (
        prop_oneof![Just("Gravity"), Just("Earthen"), Just("Masonry Gravity"), Just("-")],
        "[0-9]{1,4}(\\.[0-9]{1,2})?( Cr)?",
        0u32..4000,
    )
        .prop_map(|(kind, amount, length)| (kind.to_string(), amount, length))
}

proptest! {
    #[test]
    fn combined_filters_equal_intersection_of_each(
        rows in prop::collection::vec(row(), 0..20),
        needle in prop_oneof![Just("gravity"), Just("earth"), Just("masonry")],
        bucket in bucket()
    ) {
        let table = random_table(&rows);
        let config = irrigation_dashboard::config::FilterConfig {
            type_column: vec![ColumnMatcher::equals("Dam_Type")],
            length_column: vec![ColumnMatcher::equals("Dam_Length_Total_Mtr")],
        };
        let positions = |conditions: Vec<FilterCondition>| {
            BoundFilters::bind(&table, Some(&config), conditions)
                .apply(&table)
                .iter()
                .map(|record| record.position)
                .collect::<Vec<_>>()
        };
        let by_type = positions(vec![FilterCondition::DamType(needle.to_string())]);
        let by_length = positions(vec![FilterCondition::DamLength(bucket)]);
        let both = positions(vec![
            FilterCondition::DamType(needle.to_string()),
            FilterCondition::DamLength(bucket),
        ]);
        let intersection = by_type
            .iter()
            .copied()
            .filter(|position| by_length.contains(position))
            .collect::<Vec<_>>();
        prop_assert_eq!(both, intersection);
    }

    #[test]
    fn amount_total_equals_sum_of_row_coercions(rows in prop::collection::vec(row(), 0..20)) {
        let table = random_table(&rows);
        let totals = irrigation_dashboard::config::TotalsConfig {
            amount: vec![ColumnMatcher::contains("amount")],
            area: Vec::new(),
            extra: Vec::new(),
        };
        let summary = summarize(&table, &table.records, &totals, &Palette::default());
        let expected = rows
            .iter()
            .map(|(_, amount, _)| cell_sum(&CellValue::Text(amount.clone())))
            .sum::<CoercedSum>();
        prop_assert_eq!(summary.total_projects, rows.len());
        prop_assert_eq!(summary.total_amount, expected.rounded());
        prop_assert_eq!(summary.total_area, 0.0);
    }
}
