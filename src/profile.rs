/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use chrono::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::units::{length_to_int, scale_to_int};

/// One sounding at a single valid time.
///
/// Pressure (hPa), height (ft), temperature and dew point (°C) have one entry per
/// level. Wind direction (deg) and speed (kt) are reported on a subset of levels
/// only, so the two wind vectors are usually shorter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalProfile {
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    #[serde(rename = "Station", skip_serializing_if = "Option::is_none", default)]
    pub station: Option<u32>,
    #[serde(rename = "Pressure")]
    pub pressure: Vec<i32>,
    #[serde(rename = "Height")]
    pub height: Vec<i32>,
    #[serde(rename = "Temp")]
    pub temperature: Vec<i32>,
    #[serde(rename = "Dew")]
    pub dew_point: Vec<i32>,
    #[serde(rename = "WindDir")]
    pub wind_direction: Vec<i32>,
    #[serde(rename = "WindSpeed")]
    pub wind_speed: Vec<i32>,
}

/// How a level row is cut into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTokenizer {
    /// Split on whitespace and require exactly the layout's token count.
    Whitespace,
    /// Slice fixed-width columns. A blank cell leaves its field out for that row.
    FixedColumns { width: usize },
}

/// What a cell's reading is converted with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unit {
    Scaled(f32),
    /// Meters, stored as feet.
    Meters,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub index: usize,
    pub unit: Unit,
}

/// Cell positions and scales of the six profile fields within a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLayout {
    pub pressure: Column,
    pub height: Column,
    pub temperature: Column,
    pub dew_point: Column,
    pub wind_direction: Column,
    pub wind_speed: Column,
    pub token_count: usize,
    /// Reject decimal readings.
    pub whole_numbers: bool,
}

/// GSD ascii sounding rows: `type pres hght temp dwpt wdir wspd`, tenths of hPa and °C.
pub const GSD_ROWS: RowLayout = RowLayout {
    pressure: Column { index: 1, unit: Unit::Scaled(0.1) },
    height: Column { index: 2, unit: Unit::Meters },
    temperature: Column { index: 3, unit: Unit::Scaled(0.1) },
    dew_point: Column { index: 4, unit: Unit::Scaled(0.1) },
    wind_direction: Column { index: 5, unit: Unit::Scaled(1.0) },
    wind_speed: Column { index: 6, unit: Unit::Scaled(1.0) },
    token_count: 7,
    whole_numbers: true,
};

/// Wyoming TEXT:LIST rows: `PRES HGHT TEMP DWPT RELH MIXR DRCT SKNT THTA THTE THTV`.
pub const WYOMING_ROWS: RowLayout = RowLayout {
    pressure: Column { index: 0, unit: Unit::Scaled(1.0) },
    height: Column { index: 1, unit: Unit::Meters },
    temperature: Column { index: 2, unit: Unit::Scaled(1.0) },
    dew_point: Column { index: 3, unit: Unit::Scaled(1.0) },
    wind_direction: Column { index: 6, unit: Unit::Scaled(1.0) },
    wind_speed: Column { index: 7, unit: Unit::Scaled(1.0) },
    token_count: 11,
    whole_numbers: false,
};

impl VerticalProfile {
    pub fn new(time: DateTime<Utc>, station: Option<u32>) -> VerticalProfile {
        VerticalProfile {
            time,
            station,
            pressure: Vec::new(),
            height: Vec::new(),
            temperature: Vec::new(),
            dew_point: Vec::new(),
            wind_direction: Vec::new(),
            wind_speed: Vec::new(),
        }
    }

    pub fn levels(&self) -> usize {
        self.pressure.len()
    }

    pub fn wind_levels(&self) -> usize {
        self.wind_direction.len()
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.pressure.len();
        self.height.len() == n
            && self.temperature.len() == n
            && self.dew_point.len() == n
            && self.wind_speed.len() == self.wind_direction.len()
    }

    /// Parses one level row and appends it. On error nothing is appended.
    pub fn push_row(
        &mut self,
        line: &str,
        layout: &RowLayout,
        tokenizer: RowTokenizer,
    ) -> Result<()> {
        let cells = Cells::split(line, layout, tokenizer)?;
        let value = |col: &Column| -> Result<Option<i32>> {
            let token = match cells.get(col) {
                Some(t) => t,
                None => return Ok(None),
            };
            if layout.whole_numbers && token.parse::<i64>().is_err() {
                return Err(Error::Parse(format!(
                    "row {:?}: expected a whole number, found {:?}",
                    line, token
                )));
            }

            let converted = match col.unit {
                Unit::Scaled(scale) => scale_to_int(token, scale),
                Unit::Meters => length_to_int(token),
            };
            converted
                .map(Some)
                .map_err(|e| Error::Parse(format!("row {:?}: {}", line, e)))
        };

        let pressure = value(&layout.pressure)?;
        let height = value(&layout.height)?;
        let temperature = value(&layout.temperature)?;
        let dew_point = value(&layout.dew_point)?;
        let wind_direction = value(&layout.wind_direction)?;
        let wind_speed = value(&layout.wind_speed)?;

        match (pressure, height, temperature, dew_point) {
            (Some(p), Some(h), Some(t), Some(d)) => {
                self.pressure.push(p);
                self.height.push(h);
                self.temperature.push(t);
                self.dew_point.push(d);
            }
            _ => {
                warn!("Level without full thermodynamic data, skipping: {:?}", line);
                return Ok(());
            }
        }

        if let (Some(dir), Some(speed)) = (wind_direction, wind_speed) {
            self.wind_direction.push(dir);
            self.wind_speed.push(speed);
        }

        Ok(())
    }
}

enum Cells<'a> {
    Tokens(Vec<&'a str>),
    Fixed { line: &'a str, width: usize },
}

impl<'a> Cells<'a> {
    fn split(line: &'a str, layout: &RowLayout, tokenizer: RowTokenizer) -> Result<Self> {
        match tokenizer {
            RowTokenizer::Whitespace => {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() != layout.token_count {
                    return Err(Error::Parse(format!(
                        "expected {} fields, found {} in row {:?}",
                        layout.token_count,
                        tokens.len(),
                        line
                    )));
                }
                Ok(Cells::Tokens(tokens))
            }
            RowTokenizer::FixedColumns { width } => {
                if width == 0 {
                    return Err(Error::Internal("zero column width".to_owned()));
                }
                Ok(Cells::Fixed { line, width })
            }
        }
    }

    fn get(&self, col: &Column) -> Option<&'a str> {
        match self {
            Cells::Tokens(tokens) => tokens.get(col.index).copied(),
            Cells::Fixed { line, width } => {
                let line: &'a str = *line;
                let start = col.index * *width;
                let end = (start + *width).min(line.len());
                let cell = line.get(start..end)?.trim();
                if cell.is_empty() {
                    None
                } else {
                    Some(cell)
                }
            }
        }
    }
}
