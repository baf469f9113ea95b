/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::borrow::Cow;

use chrono::prelude::*;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::RawResponse;
use crate::units::{repair_mislabeled_zone, ZoneLabel};

lazy_static! {
    static ref RE_XML_ENCODING: Regex =
        Regex::new(r#"^(\s*<\?xml[^>]*?encoding\s*=\s*["'])([^"']+)(["'])"#).unwrap();
}

/// Hourly surface forecast for one IMS location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceForecast {
    pub name: String,
    pub latitude: f32,
    pub longitude: f32,
    pub elevation: f32,
    pub forecast: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    #[serde(rename = "Temp")]
    pub temperature: f32,
    #[serde(rename = "RelHum")]
    pub relative_humidity: f32,
    #[serde(rename = "WindSpeed")]
    pub wind_speed: f32,
    #[serde(rename = "WindDir")]
    pub wind_direction: f32,
}

pub fn forecasts_from_response(resp: &RawResponse, zone: &ZoneLabel) -> Result<Vec<SurfaceForecast>> {
    decode_forecasts(resp.success_body()?, zone)
}

/// Decodes an `HourlyLocationsForecast` document. Fails as a whole on any bad element.
pub fn decode_forecasts(body: &[u8], zone: &ZoneLabel) -> Result<Vec<SurfaceForecast>> {
    let xml = transcode(body)?;

    let root = match xmltree::Element::parse(xml.as_bytes()) {
        Ok(r) => r,
        Err(e) => {
            return Err(Error::Parse(format!("error parsing forecast xml: {}", e)));
        }
    };

    if root.name != "HourlyLocationsForecast" {
        return Err(Error::Parse(format!(
            "unexpected forecast root element <{}>",
            root.name
        )));
    }

    let mut forecasts = Vec::new();
    for location in child_elements(&root, "Location") {
        forecasts.push(decode_location(location, zone)?);
    }

    info!("Decoded forecasts for {} locations", forecasts.len());

    Ok(forecasts)
}

fn decode_location(location: &xmltree::Element, zone: &ZoneLabel) -> Result<SurfaceForecast> {
    let meta = location.get_child("LocationMetaData");

    let name = meta
        .and_then(|m| m.get_child("LocationName"))
        .and_then(|n| n.get_text())
        .map(|n| n.trim().to_owned())
        .unwrap_or_default();

    let mut forecast = Vec::new();
    if let Some(data) = location.get_child("LocationData") {
        for hourly in child_elements(data, "Forecast") {
            forecast.push(decode_hourly(hourly, zone, &name)?);
        }
    }

    debug!("Location {:?}: {} hourly forecasts", name, forecast.len());

    Ok(SurfaceForecast {
        latitude: number(meta, "LocationLatitude")?,
        longitude: number(meta, "LocationLongitude")?,
        elevation: number(meta, "LocationHeight")?,
        name,
        forecast,
    })
}

fn decode_hourly(hourly: &xmltree::Element, zone: &ZoneLabel, location: &str) -> Result<HourlyForecast> {
    let raw_time = match hourly.get_child("ForecastTime").and_then(|t| t.get_text()) {
        Some(t) => t,
        None => {
            return Err(Error::Parse(format!(
                "forecast without ForecastTime for {:?}",
                location
            )));
        }
    };

    Ok(HourlyForecast {
        time: repair_mislabeled_zone(&raw_time, zone)?,
        temperature: number(Some(hourly), "Temperature")?,
        relative_humidity: number(Some(hourly), "RelativeHumidity")?,
        wind_speed: number(Some(hourly), "WindSpeed")?,
        wind_direction: number(Some(hourly), "WindDirection")?,
    })
}

// Missing elements read as zero, present ones must be numeric.
fn number(parent: Option<&xmltree::Element>, name: &str) -> Result<f32> {
    let element = match parent.and_then(|p| p.get_child(name)) {
        Some(e) => e,
        None => {
            return Ok(0.0);
        }
    };

    let text = element.get_text().unwrap_or(Cow::Borrowed(""));
    match text.trim().parse::<f32>() {
        Ok(v) => Ok(v),
        Err(_) => Err(Error::Parse(format!("<{}> is not a number: {:?}", name, text))),
    }
}

fn child_elements<'a>(
    parent: &'a xmltree::Element,
    name: &'a str,
) -> impl Iterator<Item = &'a xmltree::Element> + 'a {
    parent.children.iter().filter_map(move |c| match c {
        xmltree::XMLNode::Element(ce) if ce.name == name => Some(ce),
        _ => None,
    })
}

/// Decodes the document into UTF-8 following its own encoding declaration.
fn transcode(body: &[u8]) -> Result<String> {
    let head = String::from_utf8_lossy(&body[..body.len().min(256)]);
    let label = RE_XML_ENCODING
        .captures(&head)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_owned());

    let encoding = match &label {
        Some(l) => match Encoding::for_label(l.trim().as_bytes()) {
            Some(e) => e,
            None => {
                return Err(Error::Parse(format!("unsupported xml encoding {:?}", l)));
            }
        },
        None => UTF_8,
    };

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        return Err(Error::Parse(format!(
            "forecast is not valid {}",
            used.name()
        )));
    }
    if used != UTF_8 {
        debug!("Transcoded forecast from {}", used.name());
    }

    Ok(RE_XML_ENCODING
        .replace(&text, "${1}UTF-8${3}")
        .into_owned())
}
