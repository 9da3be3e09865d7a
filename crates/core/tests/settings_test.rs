//! Tests for settings and page (de)serialization.
#![cfg(feature = "serde")]

use serde_json::json;
use tablesieve_core::TableError;
use tablesieve_core::table::{
    BBox, EdgeSource, EdgeStrategy, ExplicitLine, Page, SplitTablePolicy, TableFinder,
    TablePredicate, TableSettings, find_tables,
};

#[test]
fn test_settings_round_trip() {
    let mut settings = TableSettings::lines();
    settings.tables.disabled = vec![TablePredicate::BoxedText, TablePredicate::ThinStrip];
    settings.tables.split_policy = SplitTablePolicy::Merge;
    settings.edges.explicit_vertical_lines = vec![
        ExplicitLine::Coord(72.0),
        ExplicitLine::Rect(BBox::new(100.0, 100.0, 200.0, 150.0)),
    ];

    let text = serde_json::to_string(&settings).unwrap();
    let back: TableSettings = serde_json::from_str(&text).unwrap();
    assert_eq!(back, settings);
}

#[test]
fn test_partial_settings_fill_defaults() {
    let settings: TableSettings = serde_json::from_value(json!({
        "edges": { "strategy": "lines", "vertical_source": "lines_strict" },
        "tables": { "split_policy": "keep", "disabled": ["single_char_cells"] }
    }))
    .unwrap();

    let defaults = TableSettings::default();
    assert_eq!(settings.edges.strategy, EdgeStrategy::Lines);
    assert_eq!(settings.edges.vertical_source, EdgeSource::LinesStrict);
    assert_eq!(settings.edges.snap_x_tolerance, defaults.edges.snap_x_tolerance);
    assert_eq!(settings.tables.split_policy, SplitTablePolicy::Keep);
    assert_eq!(settings.tables.disabled, vec![TablePredicate::SingleCharCells]);
    assert_eq!(settings.cells, defaults.cells);
    assert_eq!(settings.lattice, defaults.lattice);
}

#[test]
fn test_unknown_settings_are_rejected() {
    let err = serde_json::from_value::<TableSettings>(json!({
        "tables": { "max_empty_fractoin": 0.5 }
    }));
    assert!(err.is_err());

    let err = serde_json::from_value::<TableSettings>(json!({ "edge": {} }));
    assert!(err.is_err());
}

#[test]
fn test_deserialized_settings_are_still_validated() {
    let settings: TableSettings = serde_json::from_value(json!({
        "edges": { "vertical_source": "explicit", "explicit_vertical_lines": [{ "coord": 50.0 }] }
    }))
    .unwrap();
    assert!(matches!(
        TableFinder::new(settings),
        Err(TableError::MissingExplicitLines { .. })
    ));
}

#[test]
fn test_page_from_json_and_table_to_json() {
    let mut rects = Vec::new();
    let mut chars = Vec::new();
    for (r, row) in [["Year", "Sales"], ["2019", "120"], ["2020", "150"]]
        .iter()
        .enumerate()
    {
        for (c, text) in row.iter().enumerate() {
            let x0 = 100.0 + c as f64 * 80.0;
            let top = 100.0 + r as f64 * 20.0;
            rects.push(json!({ "x0": x0, "top": top, "x1": x0 + 80.0, "bottom": top + 20.0 }));
            for (i, ch) in text.chars().enumerate() {
                let cx = x0 + 2.0 + i as f64 * 5.0;
                chars.push(json!({
                    "text": ch.to_string(),
                    "x0": cx, "top": top + 2.0, "x1": cx + 5.0, "bottom": top + 12.0,
                    "size": 10.0
                }));
            }
        }
    }
    let page: Page = serde_json::from_value(json!({
        "page_bbox": { "x0": 0.0, "top": 0.0, "x1": 600.0, "bottom": 800.0 },
        "chars": chars,
        "rects": rects
    }))
    .unwrap();
    assert!(page.lines.is_empty());

    let tables = find_tables(&page, &TableSettings::default()).unwrap();
    assert_eq!(tables.len(), 1);

    let out = serde_json::to_value(&tables[0]).unwrap();
    assert_eq!(out["id"], json!(0));
    assert_eq!(
        out["bbox"],
        json!({ "x0": 100.0, "top": 100.0, "x1": 260.0, "bottom": 160.0 })
    );
    assert_eq!(out["cells"].as_array().unwrap().len(), 6);
    assert_eq!(out["cells"][0]["chars"], json!([0, 1, 2, 3]));
    assert_eq!(out["rects"].as_array().unwrap().len(), 6);
}
