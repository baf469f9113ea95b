/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use chrono::prelude::*;
use log::{debug, info};
use regex::Regex;

use crate::error::{Error, Result};
use crate::fetch::RawResponse;
use crate::interpolation::fill_missing_hours;
use crate::profile::{RowTokenizer, VerticalProfile, GSD_ROWS};
use crate::units::date_at_hour;

// Lines between the time header and the first level: CAPE, two identifier
// rows and the coordinates row.
const BOILERPLATE_LINES: usize = 4;

lazy_static! {
    // GFS 09 h forecast valid for grid point 13.1 nm / 243 deg from 32.6,35.23:
    static ref RE_FORECAST_HEADER: Regex = Regex::new(r"^[A-Za-z0-9]+ .* for grid point").unwrap();
    // GFS         21      19      Jun    2020
    static ref RE_TIME_HEADER: Regex =
        Regex::new(r"^[A-Za-z0-9]+\s+(\d+)\s+(\d+)\s+([A-Za-z]+)\s+(\d+)\s*$").unwrap();
}

pub fn soundings_from_response(resp: &RawResponse) -> Result<Vec<VerticalProfile>> {
    parse_soundings(resp.success_body()?)
}

/// Parses a GSD ascii sounding listing and fills hourly gaps between the
/// forecasts by interpolation. Forecasts must come in ascending time order.
///
/// Valid output is in the format
///
/// ```text
/// GFS 09 h forecast valid for grid point 13.1 nm / 243 deg from 32.6,35.23:
/// GFS         21      19      Jun    2020
///    CAPE    231    CIN     -7  Helic  99999     PW     27
///       1  23062  99999  32.50 -35.00  99999  99999
///       2  99999  99999  99999     35  99999  99999
///       3           32.6,35.23            12     kt
///       9  10000     77    225    181    260      9
///       4   9750    297    209    171    265     13
/// ```
pub fn parse_soundings(body: &[u8]) -> Result<Vec<VerticalProfile>> {
    let text = match std::str::from_utf8(body) {
        Ok(t) => t,
        Err(e) => {
            return Err(Error::Parse(format!("sounding text is not utf-8: {}", e)));
        }
    };

    let mut lines = text.lines();
    let mut profiles: Vec<VerticalProfile> = Vec::new();

    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }

        if RE_FORECAST_HEADER.is_match(line) {
            let time_line = lines.next().unwrap_or_default();
            let time = parse_time_line(time_line).map_err(|e| {
                Error::Parse(format!("failed parsing time header {:?}: {}", line, e))
            })?;
            debug!("Found forecast for time: {}", time);

            profiles.push(VerticalProfile::new(time, None));
            for _ in 0..BOILERPLATE_LINES {
                lines.next();
            }
            continue;
        }

        // Update the last forecast item.
        if let Some(profile) = profiles.last_mut() {
            profile.push_row(line, &GSD_ROWS, RowTokenizer::Whitespace)?;
        }
    }

    info!("Parsed {} NOAA forecasts", profiles.len());

    fill_missing_hours(profiles)
}

fn parse_time_line(line: &str) -> Result<DateTime<Utc>> {
    let caps = match RE_TIME_HEADER.captures(line) {
        Some(c) => c,
        None => {
            return Err(Error::Parse(format!("bad time line {:?}", line)));
        }
    };

    let date = format!("{} {} {}", &caps[2], &caps[3], &caps[4]);
    let naive = date_at_hour(&date, &caps[1])?;

    Ok(Utc.from_utc_datetime(&naive))
}
