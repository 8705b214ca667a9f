//! Tabular input and output.
//!
//! Loads addresses and point destinations from CSV, area destinations from
//! GeoJSON, and appends aggregate columns to the address table before it is
//! written back out as CSV.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::{Centroid, Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{InputError, WriteError};
use crate::med_centers::{MedCenterTag, Pharmacy, Practice};
use crate::model::{
    Address, AddressId, AggregateRow, AreaDestination, Destination, DestinationId, GeoPoint,
    PointDestination,
};
use crate::projection::Utm;

pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "lon";
pub const X_COLUMN: &str = "x";
pub const Y_COLUMN: &str = "y";
pub const ID_COLUMN: &str = "id";
pub const MED_CENTER_COLUMN: &str = "is_med_center";
pub const PRACTICE_NAME_COLUMN: &str = "Name_Arztpraxis";
pub const PRACTICE_ADDRESS_COLUMN: &str = "Adresse";
pub const PRACTICE_COUNT_COLUMN: &str = "practice_count";
pub const PRACTICE_KEYS_COLUMN: &str = "practice_keys";

const DEFAULT_DOMAIN: &str = "ziel";
const DOMAIN_STOPWORDS: [&str; 3] = ["geocoded", "standorte", "data"];

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// When set, `x`/`y` columns in this zone are accepted in place of
    /// `lat`/`lon`.
    pub planar: Option<Utm>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            planar: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub point: GeoPoint,
    pub values: Vec<String>,
}

/// A CSV table whose rows all carry a valid point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    pub headers: Vec<String>,
    pub records: Vec<PointRecord>,
    /// Rows skipped for missing or invalid coordinates.
    pub dropped: usize,
}

impl PointTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Writes a column, overwriting the values of an existing header of the
    /// same name or appending a new one. `values` are matched to records in
    /// order.
    pub fn set_column(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        let index = match self.column(name) {
            Some(index) => index,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };
        let mut values = values.into_iter();
        for record in &mut self.records {
            if record.values.len() <= index {
                record.values.resize(index + 1, String::new());
            }
            record.values[index] = values.next().unwrap_or_default();
        }
    }

    /// Writes the med-center tagging result next to the pharmacy columns:
    /// `lat`/`lon` when the input was planar, then `practice_count`,
    /// `practice_keys` (`|`-joined) and `is_med_center`. Tags follow the
    /// record order.
    pub fn set_med_center_columns(&mut self, tags: &[MedCenterTag]) {
        if self.column(LAT_COLUMN).is_none() || self.column(LON_COLUMN).is_none() {
            let points: Vec<GeoPoint> = self.records.iter().map(|record| record.point).collect();
            self.set_column(LAT_COLUMN, points.iter().map(|p| p.lat.to_string()));
            self.set_column(LON_COLUMN, points.iter().map(|p| p.lon.to_string()));
        }
        self.set_column(
            PRACTICE_COUNT_COLUMN,
            tags.iter().map(|tag| tag.practice_count().to_string()),
        );
        self.set_column(
            PRACTICE_KEYS_COLUMN,
            tags.iter().map(|tag| tag.practice_keys.join("|")),
        );
        self.set_column(
            MED_CENTER_COLUMN,
            tags.iter().map(|tag| tag.is_med_center.to_string()),
        );
    }

    fn value(&self, record: &PointRecord, column: Option<usize>) -> Option<String> {
        column
            .and_then(|index| record.values.get(index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressTable {
    pub headers: Vec<String>,
    pub addresses: Vec<Address>,
}

/// Which aggregate columns [`AddressTable::append_results`] writes.
#[derive(Debug, Clone)]
pub struct ResultColumns<'a> {
    pub domain: &'a str,
    pub thresholds: &'a [f64],
    pub include_destination_id: bool,
}

impl AddressTable {
    /// Appends nearest distance, nearest route, optionally the nearest
    /// destination id, and one count per threshold.
    pub fn append_results(
        &mut self,
        rows: &BTreeMap<AddressId, AggregateRow>,
        columns: &ResultColumns<'_>,
    ) -> Result<(), WriteError> {
        let domain = columns.domain;
        self.headers.push(format!("{domain}_min_distance_m"));
        self.headers.push(format!("{domain}_route"));
        if columns.include_destination_id {
            self.headers.push(format!("{domain}_area_id"));
        }
        for threshold in columns.thresholds {
            self.headers.push(format!("{domain}_count_within_{threshold}m"));
        }

        let empty = AggregateRow::default();
        for address in &mut self.addresses {
            let row = rows.get(&address.id).unwrap_or(&empty);
            address
                .attributes
                .push(row.nearest_m.map(|d| format!("{d:.1}")).unwrap_or_default());
            address.attributes.push(match &row.nearest_route {
                Some(route) => route.to_geojson()?,
                None => String::new(),
            });
            if columns.include_destination_id {
                address.attributes.push(
                    row.nearest_destination
                        .as_ref()
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                );
            }
            for threshold in columns.thresholds {
                address
                    .attributes
                    .push(row.count_within(*threshold).unwrap_or(0).to_string());
            }
        }
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), WriteError> {
        write_rows(
            path,
            &self.headers,
            self.addresses.iter().map(|address| address.attributes.as_slice()),
        )
    }
}

/// Reads a CSV file, keeping only rows with a valid point.
pub fn read_point_table(path: &Path, options: CsvOptions) -> Result<PointTable, InputError> {
    if !path.exists() {
        return Err(InputError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let source_name = path.display().to_string();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    let position = |name: &str| headers.iter().position(|header| header == name);

    let locate = match (position(LAT_COLUMN), position(LON_COLUMN), options.planar) {
        (Some(lat), Some(lon), _) => Locate::Geographic { lat, lon },
        (lat, _, Some(utm)) => match (position(X_COLUMN), position(Y_COLUMN)) {
            (Some(x), Some(y)) => Locate::Planar { x, y, utm },
            _ => return Err(missing_coordinate_column(&source_name, lat)),
        },
        (lat, _, None) => return Err(missing_coordinate_column(&source_name, lat)),
    };

    let mut records = Vec::new();
    let mut dropped = 0;
    for record in reader.records() {
        let record = record?;
        match locate.point(&record) {
            Some(point) => records.push(PointRecord {
                point,
                values: record.iter().map(str::to_string).collect(),
            }),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(source = %source_name, dropped, "rows without usable coordinates skipped");
    }
    info!(source = %source_name, rows = records.len(), "table loaded");

    Ok(PointTable {
        headers,
        records,
        dropped,
    })
}

enum Locate {
    Geographic { lat: usize, lon: usize },
    Planar { x: usize, y: usize, utm: Utm },
}

impl Locate {
    fn point(&self, record: &csv::StringRecord) -> Option<GeoPoint> {
        match self {
            Locate::Geographic { lat, lon } => {
                GeoPoint::from_parts(parse_number(record, *lat), parse_number(record, *lon))
            }
            Locate::Planar { x, y, utm } => {
                let coord = Coord {
                    x: parse_number(record, *x)?,
                    y: parse_number(record, *y)?,
                };
                utm.inverse(coord).ok()
            }
        }
    }
}

fn parse_number(record: &csv::StringRecord, index: usize) -> Option<f64> {
    record
        .get(index)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<f64>().ok())
}

fn missing_coordinate_column(source_name: &str, lat: Option<usize>) -> InputError {
    let column = if lat.is_none() { LAT_COLUMN } else { LON_COLUMN };
    InputError::MissingColumn {
        source_name: source_name.to_string(),
        column: column.to_string(),
    }
}

pub fn load_addresses(path: &Path) -> Result<AddressTable, InputError> {
    let table = read_point_table(path, CsvOptions::default())?;
    let addresses = table
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| Address {
            id: AddressId(index),
            point: record.point,
            attributes: record.values,
        })
        .collect();
    Ok(AddressTable {
        headers: table.headers,
        addresses,
    })
}

/// Loads point destinations. Uses the `id` column when present, else the
/// row position; reads the `is_med_center` flag when present.
pub fn load_point_destinations(
    path: &Path,
    options: CsvOptions,
) -> Result<Vec<Destination>, InputError> {
    let table = read_point_table(path, options)?;
    let id_column = table.column(ID_COLUMN);
    let flag_column = table.column(MED_CENTER_COLUMN);

    let destinations: Vec<Destination> = table
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            Destination::Point(PointDestination {
                id: DestinationId(
                    table
                        .value(record, id_column)
                        .unwrap_or_else(|| index.to_string()),
                ),
                point: record.point,
                eligible: flag_column.map(|_| {
                    table
                        .value(record, flag_column)
                        .is_some_and(|value| parse_flag(&value))
                }),
            })
        })
        .collect();

    if destinations.is_empty() {
        return Err(InputError::NoDestinations {
            source_name: path.display().to_string(),
        });
    }
    Ok(destinations)
}

/// `true`, `1`, `yes` and `y`, case-insensitive.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

pub fn load_practices(path: &Path, options: CsvOptions) -> Result<Vec<Practice>, InputError> {
    let table = read_point_table(path, options)?;
    let name_column = table.column(PRACTICE_NAME_COLUMN);
    let address_column = table.column(PRACTICE_ADDRESS_COLUMN);
    Ok(table
        .records
        .iter()
        .map(|record| Practice {
            point: record.point,
            name: table.value(record, name_column),
            address: table.value(record, address_column),
        })
        .collect())
}

/// Loads pharmacies together with their source table for write-back.
pub fn load_pharmacies(
    path: &Path,
    options: CsvOptions,
) -> Result<(PointTable, Vec<Pharmacy>), InputError> {
    let table = read_point_table(path, options)?;
    let id_column = table.column(ID_COLUMN);
    let pharmacies = table
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| Pharmacy {
            id: table
                .value(record, id_column)
                .unwrap_or_else(|| index.to_string()),
            point: record.point,
        })
        .collect();
    Ok((table, pharmacies))
}

pub fn write_point_table(path: &Path, table: &PointTable) -> Result<(), WriteError> {
    write_rows(
        path,
        &table.headers,
        table.records.iter().map(|record| record.values.as_slice()),
    )
}

fn write_rows<'a>(
    path: &Path,
    headers: &[String],
    rows: impl Iterator<Item = &'a [String]>,
) -> Result<(), WriteError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reference frame of the coordinates in an area file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaCrs {
    /// GeoJSON default, longitude/latitude degrees.
    #[default]
    Wgs84,
    /// Already in the configured UTM zone.
    Utm,
}

#[derive(Debug, Clone)]
pub struct AreaOptions {
    /// Feature property whose value groups features into one area.
    pub group_by: Option<String>,
    pub crs: AreaCrs,
    pub projection: Utm,
}

impl Default for AreaOptions {
    fn default() -> Self {
        Self {
            group_by: None,
            crs: AreaCrs::Wgs84,
            projection: Utm::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<GeoJsonGeometry>,
}

type Ring = Vec<Vec<f64>>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Unsupported,
}

/// Loads polygon features from a GeoJSON FeatureCollection and merges those
/// sharing the grouping property into one multi-polygon destination.
pub fn load_area_destinations(
    path: &Path,
    options: &AreaOptions,
) -> Result<Vec<Destination>, InputError> {
    if !path.exists() {
        return Err(InputError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let source_name = path.display().to_string();
    let collection: FeatureCollection =
        serde_json::from_reader(BufReader::new(File::open(path)?))?;

    let mut groups: BTreeMap<AreaKey, Vec<Polygon<f64>>> = BTreeMap::new();
    let mut skipped = 0;
    for (index, feature) in collection.features.into_iter().enumerate() {
        let key = group_key(feature.properties.as_ref(), options.group_by.as_deref())
            .map_or(AreaKey::Feature(index), AreaKey::Property);
        let parts = match feature.geometry {
            Some(GeoJsonGeometry::Polygon { coordinates }) => vec![coordinates],
            Some(GeoJsonGeometry::MultiPolygon { coordinates }) => coordinates,
            Some(GeoJsonGeometry::Unsupported) | None => {
                skipped += 1;
                continue;
            }
        };
        match parts
            .iter()
            .map(|rings| to_polygon(rings, options))
            .collect::<Option<Vec<_>>>()
        {
            Some(polygons) => groups.entry(key).or_default().extend(polygons),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(source = %source_name, skipped, "features without usable polygon geometry skipped");
    }

    let taken: BTreeSet<String> = groups
        .keys()
        .filter_map(|key| match key {
            AreaKey::Property(value) => Some(value.clone()),
            AreaKey::Feature(_) => None,
        })
        .collect();

    let mut destinations = Vec::with_capacity(groups.len());
    for (key, polygons) in groups {
        let key = key.into_id(options.group_by.is_some(), &taken);
        let geometry = MultiPolygon::new(polygons);
        let centroid = geometry
            .centroid()
            .and_then(|point| options.projection.inverse(point.0).ok());
        match centroid {
            Some(centroid) => destinations.push(Destination::Area(AreaDestination {
                id: DestinationId(key),
                geometry,
                projection: options.projection,
                centroid,
            })),
            None => warn!(source = %source_name, area = %key, "area without centroid skipped"),
        }
    }

    if destinations.is_empty() {
        return Err(InputError::NoDestinations { source_name });
    }
    info!(source = %source_name, areas = destinations.len(), "areas loaded");
    Ok(destinations)
}

/// Grouping key of one feature. Features without the grouping property stay
/// on their own and never join a property group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum AreaKey {
    Property(String),
    Feature(usize),
}

impl AreaKey {
    /// Destination id. Ungrouped loads use the bare feature index; in grouped
    /// loads a lone feature gets `#index`, prefixed further until it differs
    /// from every property value.
    fn into_id(self, grouped: bool, taken: &BTreeSet<String>) -> String {
        match self {
            AreaKey::Property(value) => value,
            AreaKey::Feature(index) if !grouped => index.to_string(),
            AreaKey::Feature(index) => {
                let mut id = format!("#{index}");
                while taken.contains(&id) {
                    id.insert(0, '#');
                }
                id
            }
        }
    }
}

fn group_key(properties: Option<&Map<String, Value>>, group_by: Option<&str>) -> Option<String> {
    match properties?.get(group_by?)? {
        Value::String(value) => Some(value.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn to_polygon(rings: &[Ring], options: &AreaOptions) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_line_string(ring, options));
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn to_line_string(ring: &Ring, options: &AreaOptions) -> Option<LineString<f64>> {
    ring.iter()
        .map(|position| {
            let [first, second, ..] = position.as_slice() else {
                return None;
            };
            match options.crs {
                AreaCrs::Utm => Some(Coord {
                    x: *first,
                    y: *second,
                }),
                AreaCrs::Wgs84 => {
                    let point = GeoPoint::new(*second, *first)?;
                    options.projection.forward(point).ok()
                }
            }
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

/// Column prefix derived from a destination file name, e.g.
/// `einzelhandel_geocoded.csv` → `einzelhandel`.
pub fn domain_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| {
            stem.split('_')
                .map(str::to_lowercase)
                .find(|part| !part.is_empty() && !DOMAIN_STOPWORDS.contains(&part.as_str()))
        })
        .unwrap_or_else(|| DEFAULT_DOMAIN.to_string())
}
