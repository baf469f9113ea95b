/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use chrono_tz::Tz;
use log::info;
use yaml_rust::yaml::{Yaml, YamlLoader};

use crate::error::{Error, Result};
use crate::locations::{default_locations, Location};
use crate::profile::RowTokenizer;
use crate::units::ZoneLabel;

/// Everything the parsers and fetchers need to know about the deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Zone the sounding headings are read in and output days are cut in.
    pub reference_zone: Tz,
    /// What the IMS forecast times really are, whatever they claim.
    pub ims_zone: ZoneLabel,
    pub ims_api_token: Option<String>,
    pub ims_station: u32,
    pub uwyo_region: String,
    pub uwyo_rows: RowTokenizer,
    pub noaa_forecast_days: i64,
    pub locations: Vec<Location>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reference_zone: chrono_tz::Asia::Jerusalem,
            ims_zone: ZoneLabel::default(),
            ims_api_token: None,
            ims_station: 16,
            uwyo_region: "mideast".to_owned(),
            uwyo_rows: RowTokenizer::FixedColumns { width: 7 },
            noaa_forecast_days: 4,
            locations: default_locations(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            return Err(Error::Config(format!(
                "error opening {}: {}. Copy config.yml.example as {} and edit it to your liking.",
                path.display(),
                e,
                path.display()
            )));
        }
    };

    let mut s = String::new();
    match file.read_to_string(&mut s) {
        Ok(_) => Ok(s),
        Err(e) => Err(Error::Config(format!("error reading {}: {}", path.display(), e))),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let config = Config::from_yaml_str(&read_config_file(path)?)?;
        info!("Successfully read config file {}", path.display());
        Ok(config)
    }

    /// Missing keys keep their defaults.
    pub fn from_yaml_str(s: &str) -> Result<Config> {
        let docs = match YamlLoader::load_from_str(s) {
            Ok(d) => d,
            Err(e) => {
                return Err(Error::Config(format!("invalid yaml: {}", e)));
            }
        };

        let mut config = Config::default();
        let doc = match docs.first() {
            Some(d) => d,
            None => {
                return Ok(config);
            }
        };

        if let Some(name) = string(&doc["timezone"], "timezone")? {
            config.reference_zone = name
                .parse::<Tz>()
                .map_err(|e| Error::Config(format!("bad timezone {}: {}", name, e)))?;
        }

        let ims = &doc["ims"];
        if let Some(abbreviation) = string(&ims["zone"], "ims.zone")? {
            config.ims_zone = match integer(&ims["utc_offset"], "ims.utc_offset")? {
                Some(hours) => ZoneLabel::new(&abbreviation, hours as i32)?,
                None => ZoneLabel::from_abbreviation(&abbreviation)?,
            };
        }
        config.ims_api_token = string(&ims["api_token"], "ims.api_token")?;
        if let Some(station) = integer(&ims["station"], "ims.station")? {
            config.ims_station = station as u32;
        }

        let uwyo = &doc["uwyo"];
        if let Some(region) = string(&uwyo["region"], "uwyo.region")? {
            config.uwyo_region = region;
        }
        if let Some(rows) = string(&uwyo["rows"], "uwyo.rows")? {
            config.uwyo_rows = match rows.as_str() {
                "whitespace" => RowTokenizer::Whitespace,
                "fixed" => {
                    let width = integer(&uwyo["column_width"], "uwyo.column_width")?.unwrap_or(7);
                    if width <= 0 {
                        return Err(Error::Config(format!("bad uwyo.column_width {}", width)));
                    }
                    RowTokenizer::FixedColumns { width: width as usize }
                }
                other => {
                    return Err(Error::Config(format!("unknown uwyo.rows {:?}", other)));
                }
            };
        }

        if let Some(days) = integer(&doc["noaa"]["forecast_days"], "noaa.forecast_days")? {
            config.noaa_forecast_days = days;
        }

        match &doc["locations"] {
            Yaml::BadValue => {}
            Yaml::Array(entries) => {
                config.locations = entries.iter().map(location).collect::<Result<_>>()?;
            }
            _ => {
                return Err(Error::Config("locations must be a list".to_owned()));
            }
        }

        Ok(config)
    }
}

fn location(y: &Yaml) -> Result<Location> {
    let required = |key: &str| Error::Config(format!("location is missing {}", key));

    Ok(Location {
        name: string(&y["name"], "locations.name")?.ok_or_else(|| required("name"))?,
        lat: float(&y["lat"], "locations.lat")?.ok_or_else(|| required("lat"))? as f32,
        long: float(&y["long"], "locations.long")?.ok_or_else(|| required("long"))? as f32,
        alt: integer(&y["alt"], "locations.alt")?.unwrap_or(0) as i32,
        uwyo_station: integer(&y["uwyo_station"], "locations.uwyo_station")?
            .ok_or_else(|| required("uwyo_station"))? as u32,
        ims_name: string(&y["ims_name"], "locations.ims_name")?.unwrap_or_default(),
    })
}

fn string(y: &Yaml, key: &str) -> Result<Option<String>> {
    match y {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(s) => Ok(Some(s.to_owned())),
        Yaml::Integer(i) => Ok(Some(i.to_string())),
        _ => Err(Error::Config(format!("{} must be a string", key))),
    }
}

fn integer(y: &Yaml, key: &str) -> Result<Option<i64>> {
    match y {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(i) => Ok(Some(*i)),
        _ => Err(Error::Config(format!("{} must be an integer", key))),
    }
}

fn float(y: &Yaml, key: &str) -> Result<Option<f64>> {
    match y {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(i) => Ok(Some(*i as f64)),
        Yaml::Real(_) => Ok(y.as_f64()),
        _ => Err(Error::Config(format!("{} must be a number", key))),
    }
}
