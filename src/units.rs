/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use chrono::prelude::*;
use chrono_tz::Tz;

use crate::error::{Error, Result};

pub const FEET_PER_METER: f32 = 3.28084;

lazy_static! {
    // Only the abbreviations the upstream sources are known to mean.
    static ref KNOWN_ZONES: HashMap<&'static str, i32> = {
        let mut m = HashMap::new();
        m.insert("UTC", 0);
        m.insert("GMT", 0);
        m.insert("CET", 1);
        m.insert("EET", 2);
        m.insert("IST", 2);
        m.insert("IDT", 3);
        m
    };
}

/// A zone abbreviation bound to the fixed offset it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneLabel {
    pub abbreviation: String,
    pub utc_offset: FixedOffset,
}

impl ZoneLabel {
    pub fn new(abbreviation: &str, offset_hours: i32) -> Result<ZoneLabel> {
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!(
                "offset {}h for zone {} is out of range",
                offset_hours, abbreviation
            ))
        })?;

        Ok(ZoneLabel {
            abbreviation: abbreviation.to_owned(),
            utc_offset,
        })
    }

    pub fn from_abbreviation(abbreviation: &str) -> Result<ZoneLabel> {
        match KNOWN_ZONES.get(abbreviation) {
            Some(hours) => ZoneLabel::new(abbreviation, *hours),
            None => Err(Error::Config(format!(
                "unknown zone abbreviation {}",
                abbreviation
            ))),
        }
    }
}

impl Default for ZoneLabel {
    fn default() -> Self {
        ZoneLabel {
            abbreviation: "IDT".to_owned(),
            utc_offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        }
    }
}

pub fn convert_length(meters: f32) -> f32 {
    meters * FEET_PER_METER
}

/// Parses a numeric token, multiplies it by `scale` and truncates toward zero.
pub fn scale_to_int(token: &str, scale: f32) -> Result<i32> {
    truncate(parse_number(token)? * scale, token)
}

/// Parses a length in meters and truncates it to whole feet.
pub fn length_to_int(token: &str) -> Result<i32> {
    truncate(convert_length(parse_number(token)?), token)
}

fn parse_number(token: &str) -> Result<f32> {
    match token.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::Parse(format!("not a number: {:?}", token))),
    }
}

fn truncate(value: f32, token: &str) -> Result<i32> {
    // i32::MAX rounds up to 2^31 as f32, hence the strict upper bound.
    if value.is_finite() && value >= i32::MIN as f32 && value < i32::MAX as f32 {
        Ok(value as i32)
    } else {
        Err(Error::Parse(format!("{:?} is out of range", token)))
    }
}

/// The surface forecast feed stamps every time with "UTC" although the wall clock
/// is local. Drops the 3-letter placeholder and reads the time in `zone` instead.
pub fn repair_mislabeled_zone(raw: &str, zone: &ZoneLabel) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let split = raw.len().saturating_sub(3);

    let (local, placeholder) = match (raw.get(..split), raw.get(split..)) {
        (Some(l), Some(p)) if !l.trim().is_empty() => (l.trim_end(), p),
        _ => {
            return Err(Error::Parse(format!("timestamp too short: {:?}", raw)));
        }
    };

    if !placeholder.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::Parse(format!(
            "timestamp has no zone abbreviation: {:?}",
            raw
        )));
    }

    let naive = NaiveDateTime::parse_from_str(local, "%d/%m/%Y %H:%M").map_err(|e| {
        Error::Parse(format!(
            "bad timestamp {:?} (read as {} {}): {}",
            raw, local, zone.abbreviation, e
        ))
    })?;

    match zone.utc_offset.from_local_datetime(&naive).single() {
        Some(t) => Ok(t.with_timezone(&Utc)),
        None => Err(Error::Parse(format!("bad timestamp {:?}", raw))),
    }
}

/// Reads the "... at 00Z 19 Jun 2020" style sounding heading as wall-clock time in `zone`.
pub fn parse_zoned_header(text: &str, zone: Tz) -> Result<DateTime<Utc>> {
    let at = match text.find(" at ") {
        Some(i) => i,
        None => {
            return Err(Error::Parse(format!("didn't find 'at' in: {:?}", text)));
        }
    };
    let rest = text[at + 4..].trim();

    let (hour, date) = match rest.split_once(' ') {
        Some((h, d)) => (h.trim_end_matches(|c| c == 'Z' || c == 'z'), d),
        None => {
            return Err(Error::Parse(format!("bad sounding time: {:?}", rest)));
        }
    };
    let naive = date_at_hour(date, hour)?;

    match zone.from_local_datetime(&naive).single() {
        Some(t) => Ok(t.with_timezone(&Utc)),
        None => Err(Error::Parse(format!(
            "sounding time {:?} does not exist in {}",
            rest,
            zone.name()
        ))),
    }
}

/// Combines a "D Mon YYYY" date with an hour token.
pub(crate) fn date_at_hour(date: &str, hour: &str) -> Result<NaiveDateTime> {
    let day = NaiveDate::parse_from_str(date.trim(), "%d %b %Y")
        .map_err(|e| Error::Parse(format!("bad date {:?}: {}", date, e)))?;

    hour.trim()
        .parse::<u32>()
        .ok()
        .and_then(|h| day.and_hms_opt(h, 0, 0))
        .ok_or_else(|| Error::Parse(format!("bad hour {:?}", hour)))
}
