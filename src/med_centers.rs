//! Medical-center tagging.
//!
//! A pharmacy counts as a medical center when enough distinct doctor
//! practices lie within a short radius of it. The resulting flag feeds the
//! category filter of the routing run.

use rayon::prelude::*;

use crate::haversine::haversine_m;
use crate::model::GeoPoint;

/// A doctor practice. Several doctors of one practice share its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Practice {
    pub point: GeoPoint,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl Practice {
    /// Identity used for distinct counting: name, else address, else the
    /// coordinate pair.
    pub fn key(&self) -> String {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.address.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:.6}|{:.6}", self.point.lat, self.point.lon))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pharmacy {
    pub id: String,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedCenterRule {
    pub radius_m: f64,
    pub min_practices: usize,
}

impl Default for MedCenterRule {
    fn default() -> Self {
        Self {
            radius_m: 100.0,
            min_practices: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MedCenterTag {
    pub pharmacy_id: String,
    /// Distinct practice keys within the radius, sorted.
    pub practice_keys: Vec<String>,
    pub is_med_center: bool,
}

impl MedCenterTag {
    pub fn practice_count(&self) -> usize {
        self.practice_keys.len()
    }
}

/// Tags every pharmacy; output order follows `pharmacies`.
pub fn tag_pharmacies(
    pharmacies: &[Pharmacy],
    practices: &[Practice],
    rule: MedCenterRule,
) -> Vec<MedCenterTag> {
    let keyed: Vec<(GeoPoint, String)> = practices
        .iter()
        .map(|practice| (practice.point, practice.key()))
        .collect();

    pharmacies
        .par_iter()
        .map(|pharmacy| {
            let mut practice_keys: Vec<String> = keyed
                .iter()
                .filter(|(point, _)| haversine_m(pharmacy.point, *point) <= rule.radius_m)
                .map(|(_, key)| key.clone())
                .collect();
            practice_keys.sort();
            practice_keys.dedup();

            MedCenterTag {
                pharmacy_id: pharmacy.id.clone(),
                is_med_center: practice_keys.len() >= rule.min_practices,
                practice_keys,
            }
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
