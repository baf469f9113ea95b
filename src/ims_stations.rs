/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use chrono::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::RawResponse;

/// Station measurement at a 3-hourly observation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Measurement {
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    #[serde(rename = "GroundTemp")]
    pub ground_temperature: f32,
    #[serde(rename = "DryTemp")]
    pub dry_temperature: f32,
    #[serde(rename = "RelHumid")]
    pub relative_humidity: f32,
    #[serde(rename = "WindDir")]
    pub wind_direction: f32,
    #[serde(rename = "WindSpeed")]
    pub wind_speed: f32,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    data: Vec<Record>,
}

#[derive(Deserialize)]
struct Record {
    datetime: DateTime<Utc>,
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct Channel {
    name: String,
    value: Option<f32>,
}

pub fn measurements_from_response(resp: &RawResponse) -> Result<Vec<Measurement>> {
    decode_measurements(resp.success_body()?)
}

pub fn decode_measurements(body: &[u8]) -> Result<Vec<Measurement>> {
    let response: Response = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return Err(Error::Parse(format!("error parsing measurements json: {}", e)));
        }
    };

    let mut measurements = Vec::new();
    for record in response.data {
        if !on_synoptic_hour(&record.datetime) {
            debug!("Skip time {}", record.datetime);
            continue;
        }

        let mut m = Measurement {
            time: record.datetime,
            ..Default::default()
        };
        for channel in record.channels {
            let value = match channel.value {
                Some(v) => v,
                None => {
                    debug!("Channel {} has no value at {}", channel.name, record.datetime);
                    continue;
                }
            };
            match channel.name.as_str() {
                "TG" => m.ground_temperature = value,
                "TD" => m.dry_temperature = value,
                "RH" => m.relative_humidity = value,
                "WD" => m.wind_direction = value,
                "WS" => m.wind_speed = value,
                other => debug!("Skipping unmapped channel {:?}", other),
            }
        }
        measurements.push(m);
    }

    Ok(measurements)
}

fn on_synoptic_hour(t: &DateTime<Utc>) -> bool {
    t.hour() % 3 == 0 && t.minute() == 0 && t.second() == 0 && t.nanosecond() == 0
}
