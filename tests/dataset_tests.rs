//! Loading input tables and writing the result table.

mod fixtures;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use fixtures::*;
use tempfile::TempDir;
use walkreach::dataset::{
    AreaCrs, AreaOptions, CsvOptions, MED_CENTER_COLUMN, ResultColumns, load_addresses,
    load_area_destinations, load_pharmacies, load_point_destinations, load_practices,
    read_point_table, write_point_table,
};
use walkreach::error::InputError;
use walkreach::med_centers::{MedCenterRule, Practice, tag_pharmacies};
use walkreach::model::{AddressId, AggregateRow, Destination, DestinationId, ThresholdCount};
use walkreach::polyline::Polyline;
use walkreach::projection::Utm;
use walkreach::traits::Located;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// ============================================================================
// CSV input
// ============================================================================

#[test]
fn rows_without_coordinates_are_dropped() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "adressen_geocoded.csv",
        "strasse,lat,lon\n\
         Hauptstraße 30,52.4110,12.5530\n\
         Unbekannt,,12.55\n\
         Kaputt,abc,12.55\n\
         Steinstraße 12,52.4089,12.5588\n",
    );

    let table = load_addresses(&path).unwrap();

    assert_eq!(table.headers, vec!["strasse", "lat", "lon"]);
    assert_eq!(table.addresses.len(), 2);
    assert_eq!(table.addresses[0].id, AddressId(0));
    assert_eq!(table.addresses[1].id, AddressId(1));
    assert_eq!(table.addresses[1].attributes[0], "Steinstraße 12");
    assert_eq!(table.addresses[1].point, point(52.4089, 12.5588));
}

#[test]
fn missing_coordinate_column_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "shops.csv", "name,lat\nMarkt,52.41\n");

    let err = load_point_destinations(&path, CsvOptions::default()).unwrap_err();

    match err {
        InputError::MissingColumn { column, .. } => assert_eq!(column, "lon"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = load_addresses(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, InputError::MissingFile { .. }));
}

#[test]
fn destination_ids_and_med_center_flags() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "apotheken_geocoded.csv",
        "id,lat,lon,is_med_center\n\
         apo-1,52.4087,12.5575,True\n\
         ,52.4152,12.5610,0\n",
    );

    let destinations = load_point_destinations(&path, CsvOptions::default()).unwrap();

    assert_eq!(destinations.len(), 2);
    assert_eq!(destinations[0].id(), &DestinationId::new("apo-1"));
    assert_eq!(destinations[1].id(), &DestinationId::new("1"));
    assert!(destinations[0].is_eligible());
    assert!(!destinations[1].is_eligible());
}

#[test]
fn destination_file_without_rows_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "leer.csv", "lat,lon\n,\n");

    let err = load_point_destinations(&path, CsvOptions::default()).unwrap_err();

    assert!(matches!(err, InputError::NoDestinations { .. }));
}

#[test]
fn planar_columns_are_reprojected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "praxen.csv",
        "Name_Arztpraxis;Adresse;x;y\n\
         MVZ Havelland;Hauptstraße 1;500000;5761038.2125\n\
         ;Steinstraße 2;500000;5761038.2125\n",
    );
    let options = CsvOptions {
        delimiter: b';',
        planar: Some(Utm::default()),
    };

    let practices = load_practices(&path, options).unwrap();

    assert_eq!(practices.len(), 2);
    assert!((practices[0].point.lat - 52.0).abs() < 1e-6);
    assert!((practices[0].point.lon - 15.0).abs() < 1e-6);
    assert_eq!(practices[0].key(), "MVZ Havelland");
    assert_eq!(practices[1].key(), "Steinstraße 2");
}

#[test]
fn planar_columns_need_a_projection() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "praxen.csv", "x,y\n500000,5761038\n");

    let err = read_point_table(&path, CsvOptions::default()).unwrap_err();

    assert!(matches!(err, InputError::MissingColumn { .. }));
}

#[test]
fn pharmacies_keep_their_source_table() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "apotheken.csv",
        "id,name,lat,lon\napo-1,Dom-Apotheke,52.4152,12.5610\n",
    );

    let (table, pharmacies) = load_pharmacies(&path, CsvOptions::default()).unwrap();

    assert_eq!(table.headers, vec!["id", "name", "lat", "lon"]);
    assert_eq!(table.records[0].values[1], "Dom-Apotheke");
    assert_eq!(pharmacies[0].id, "apo-1");
}

// ============================================================================
// GeoJSON areas
// ============================================================================

const PARKS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {"objektbeze": "Marienberg"},
      "geometry": {"type": "Polygon", "coordinates": [[
        [12.535, 52.414], [12.538, 52.414], [12.538, 52.417], [12.535, 52.417], [12.535, 52.414]
      ]]}
    },
    {
      "type": "Feature",
      "properties": {"objektbeze": "Marienberg"},
      "geometry": {"type": "Polygon", "coordinates": [[
        [12.540, 52.414], [12.541, 52.414], [12.541, 52.415], [12.540, 52.415], [12.540, 52.414]
      ]]}
    },
    {
      "type": "Feature",
      "properties": {"objektbeze": "Humboldthain"},
      "geometry": {"type": "MultiPolygon", "coordinates": [[[
        [12.550, 52.405], [12.552, 52.405], [12.552, 52.406], [12.550, 52.406], [12.550, 52.405]
      ]]]}
    },
    {
      "type": "Feature",
      "properties": {"objektbeze": "Baum"},
      "geometry": {"type": "Point", "coordinates": [12.55, 52.41]}
    }
  ]
}"#;

#[test]
fn area_features_are_grouped_by_property() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "gruenflaechen.geojson", PARKS);
    let options = AreaOptions {
        group_by: Some("objektbeze".to_string()),
        ..Default::default()
    };

    let areas = load_area_destinations(&path, &options).unwrap();

    assert_eq!(areas.len(), 2);
    let ids: Vec<&str> = areas.iter().map(|area| area.id().as_str()).collect();
    assert_eq!(ids, vec!["Humboldthain", "Marienberg"]);

    let Destination::Area(marienberg) = &areas[1] else {
        panic!("expected an area destination");
    };
    assert_eq!(marienberg.geometry.0.len(), 2);
    assert!(marienberg.centroid.lat > 52.414 && marienberg.centroid.lat < 52.417);
    assert!(marienberg.centroid.lon > 12.535 && marienberg.centroid.lon < 12.541);
}

#[test]
fn ungrouped_features_stay_separate() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "gruenflaechen.geojson", PARKS);

    let areas = load_area_destinations(&path, &AreaOptions::default()).unwrap();

    assert_eq!(areas.len(), 3);
    assert!(areas.iter().all(Destination::is_area));
}

#[test]
fn planar_area_file_is_used_as_is() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "flaechen_utm.geojson",
        r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[
              [499900, 5760938.2125], [500100, 5760938.2125], [500100, 5761138.2125],
              [499900, 5761138.2125], [499900, 5760938.2125]
            ]]}
        }]}"#,
    );
    let options = AreaOptions {
        crs: AreaCrs::Utm,
        ..Default::default()
    };

    let areas = load_area_destinations(&path, &options).unwrap();

    assert!((areas[0].representative_point().lat - 52.0).abs() < 1e-6);
    assert!((areas[0].representative_point().lon - 15.0).abs() < 1e-6);
}

#[test]
fn feature_without_group_property_stays_its_own_area() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "gruenflaechen.geojson",
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"objektbeze": "Park"},
             "geometry": {"type": "Polygon", "coordinates": [[
               [12.535, 52.414], [12.536, 52.414], [12.536, 52.415], [12.535, 52.415], [12.535, 52.414]
             ]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[
               [12.550, 52.405], [12.551, 52.405], [12.551, 52.406], [12.550, 52.406], [12.550, 52.405]
             ]]}},
            {"type": "Feature", "properties": {"objektbeze": "1"},
             "geometry": {"type": "Polygon", "coordinates": [[
               [12.560, 52.420], [12.561, 52.420], [12.561, 52.421], [12.560, 52.421], [12.560, 52.420]
             ]]}}
        ]}"#,
    );
    let options = AreaOptions {
        group_by: Some("objektbeze".to_string()),
        ..Default::default()
    };

    let areas = load_area_destinations(&path, &options).unwrap();

    let ids: Vec<&str> = areas.iter().map(|area| area.id().as_str()).collect();
    assert_eq!(ids, vec!["1", "Park", "#1"]);
    for area in &areas {
        let Destination::Area(area) = area else {
            panic!("expected an area destination");
        };
        assert_eq!(area.geometry.0.len(), 1, "{} merged with another feature", area.id);
    }
}

#[test]
fn area_file_without_polygons_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "leer.geojson",
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": null}
        ]}"#,
    );

    let err = load_area_destinations(&path, &AreaOptions::default()).unwrap_err();

    assert!(matches!(err, InputError::NoDestinations { .. }));
}

// ============================================================================
// Result table
// ============================================================================

#[test]
fn result_columns_are_appended() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "adressen.csv",
        "strasse,lat,lon\nHauptstraße 30,52.4110,12.5530\nSteinstraße 12,52.4089,12.5588\n",
    );
    let output = dir.path().join("ergebnis.csv");
    let mut table = load_addresses(&input).unwrap();

    let mut rows = BTreeMap::new();
    rows.insert(
        AddressId(0),
        AggregateRow {
            nearest_m: Some(412.345),
            nearest_route: Some(Polyline::new(vec![(52.4110, 12.5530), (52.4086, 12.5578)])),
            nearest_destination: Some(DestinationId::new("Marienberg")),
            counts: vec![
                ThresholdCount {
                    threshold_m: 500.0,
                    count: 1,
                },
                ThresholdCount {
                    threshold_m: 1000.0,
                    count: 3,
                },
            ],
        },
    );
    let thresholds = [500.0, 1000.0];
    table
        .append_results(
            &rows,
            &ResultColumns {
                domain: "gruen",
                thresholds: &thresholds,
                include_destination_id: true,
            },
        )
        .unwrap();
    table.write_csv(&output).unwrap();

    let written = read_rows(&output);
    assert_eq!(
        written[0],
        vec![
            "strasse",
            "lat",
            "lon",
            "gruen_min_distance_m",
            "gruen_route",
            "gruen_area_id",
            "gruen_count_within_500m",
            "gruen_count_within_1000m",
        ]
    );
    assert_eq!(written[1][3], "412.3");
    assert!(written[1][4].contains("LineString"));
    assert_eq!(written[1][5], "Marienberg");
    assert_eq!(&written[1][6..], ["1", "3"]);

    // no result at all: empty distance, zero counts
    assert_eq!(written[2][0], "Steinstraße 12");
    assert_eq!(written[2][3], "");
    assert_eq!(written[2][4], "");
    assert_eq!(&written[2][6..], ["0", "0"]);
}

#[test]
fn retagged_pharmacies_overwrite_the_stale_flag() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "apotheken.csv",
        "id,lat,lon,is_med_center\napo-1,52.41,12.55,false\n",
    );
    let output = dir.path().join("apotheken_tagged.csv");
    let (mut table, pharmacies) = load_pharmacies(&input, CsvOptions::default()).unwrap();
    let practices: Vec<Practice> = ["MVZ Havelland", "Praxis Dr. Weber"]
        .into_iter()
        .map(|name| Practice {
            point: point(52.41, 12.55),
            name: Some(name.to_string()),
            address: None,
        })
        .collect();

    let tags = tag_pharmacies(&pharmacies, &practices, MedCenterRule::default());
    table.set_med_center_columns(&tags);
    write_point_table(&output, &table).unwrap();

    let written = read_rows(&output);
    assert_eq!(
        written[0],
        vec!["id", "lat", "lon", "is_med_center", "practice_count", "practice_keys"]
    );
    assert_eq!(written[1], vec!["apo-1", "52.41", "12.55", "true", "2", "MVZ Havelland|Praxis Dr. Weber"]);
    assert_eq!(
        written[0].iter().filter(|header| *header == MED_CENTER_COLUMN).count(),
        1
    );

    let reloaded = load_point_destinations(&output, CsvOptions::default()).unwrap();
    assert!(reloaded[0].is_eligible());
}

#[test]
fn planar_pharmacies_gain_coordinate_columns() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "apotheken.csv", "id,x,y\napo-1,500000,5761038.2125\n");
    let options = CsvOptions {
        planar: Some(Utm::default()),
        ..Default::default()
    };
    let (mut table, pharmacies) = load_pharmacies(&input, options).unwrap();

    let tags = tag_pharmacies(&pharmacies, &[], MedCenterRule::default());
    table.set_med_center_columns(&tags);

    assert_eq!(
        table.headers,
        vec!["id", "x", "y", "lat", "lon", "practice_count", "practice_keys", "is_med_center"]
    );
    let values = &table.records[0].values;
    assert!((values[3].parse::<f64>().unwrap() - 52.0).abs() < 1e-6);
    assert_eq!(&values[5..], ["0", "", "false"]);
}
