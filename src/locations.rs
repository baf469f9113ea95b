/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::{BTreeSet, HashMap};

use log::warn;
use serde::Serialize;

use crate::ims::SurfaceForecast;

/// A place we publish data for, and what each upstream calls it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub name: String,
    pub lat: f32,
    pub long: f32,
    pub alt: i32,
    pub uwyo_station: u32,
    #[serde(skip)]
    pub ims_name: String,
}

const BET_DAGAN: u32 = 40179;

pub fn default_locations() -> Vec<Location> {
    let location = |name: &str, lat, long, alt, ims_name: &str| Location {
        name: name.to_owned(),
        lat,
        long,
        alt,
        uwyo_station: BET_DAGAN,
        ims_name: ims_name.to_owned(),
    };

    vec![
        location("megido", 32.597662, 35.234076, 200, "AFULA NIR HAEMEQ"),
        location("sde-teiman", 31.287646, 34.722855, 656, "BEER SHEVA"),
        location("zefat", 32.965719, 35.497225, 2559, "ZEFAT HAR KENAAN"),
        location("bet-shaan", 32.102560, 35.197610, -394, "EDEN FARM"),
    ]
}

/// Pairs each forecast with the name of the location it belongs to. Forecasts for
/// places we don't track are dropped.
pub fn match_forecasts(
    locations: &[Location],
    forecasts: Vec<SurfaceForecast>,
) -> Vec<(String, SurfaceForecast)> {
    let names: HashMap<&str, &str> = locations
        .iter()
        .map(|l| (l.ims_name.as_str(), l.name.as_str()))
        .collect();

    let mut matched = Vec::new();
    for forecast in forecasts {
        match names.get(forecast.name.as_str()) {
            Some(name) => matched.push((name.to_string(), forecast)),
            None => warn!("Skipping unmapped location: {:?}", forecast.name),
        }
    }

    matched
}

/// Distinct sounding stations, each queried once no matter how many locations share it.
pub fn uwyo_stations(locations: &[Location]) -> Vec<u32> {
    locations
        .iter()
        .map(|l| l.uwyo_station)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
