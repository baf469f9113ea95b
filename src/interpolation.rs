/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use chrono::prelude::*;
use chrono::Duration;
use log::{debug, warn};
use std::convert::TryFrom;

use crate::error::{Error, Result};
use crate::profile::VerticalProfile;

/// Adds a linearly interpolated profile for every whole hour missing between two
/// consecutive profiles. Input must be sorted by time.
pub fn fill_missing_hours(profiles: Vec<VerticalProfile>) -> Result<Vec<VerticalProfile>> {
    let mut out: Vec<VerticalProfile> = Vec::with_capacity(profiles.len());

    for next in profiles {
        let synthetic = match out.last() {
            Some(first) => between(first, &next)?,
            None => Vec::new(),
        };
        if !synthetic.is_empty() {
            debug!(
                "Interpolated {} profiles between {} and {}",
                synthetic.len(),
                synthetic[0].time - Duration::hours(1),
                next.time
            );
        }
        out.extend(synthetic);
        out.push(next);
    }

    Ok(out)
}

fn between(first: &VerticalProfile, next: &VerticalProfile) -> Result<Vec<VerticalProfile>> {
    let mut result = Vec::new();
    let mut t = first.time + Duration::hours(1);

    while t < next.time {
        let r = hour_fraction(first.time, next.time, t);
        let field = |name: &str, a: &[i32], b: &[i32]| -> Result<Vec<i32>> {
            if a.len() != b.len() {
                return Err(Error::Internal(format!(
                    "{} has {} levels at {} but {} at {}",
                    name,
                    a.len(),
                    first.time,
                    b.len(),
                    next.time
                )));
            }
            interpolate(r, a, b).ok_or_else(|| {
                Error::Internal(format!(
                    "{} interpolated out of range between {} and {}",
                    name, first.time, next.time
                ))
            })
        };

        result.push(VerticalProfile {
            time: t,
            station: first.station,
            pressure: field("pressure", &first.pressure, &next.pressure)?,
            height: field("height", &first.height, &next.height)?,
            temperature: field("temperature", &first.temperature, &next.temperature)?,
            dew_point: field("dew point", &first.dew_point, &next.dew_point)?,
            wind_direction: field("wind direction", &first.wind_direction, &next.wind_direction)?,
            wind_speed: field("wind speed", &first.wind_speed, &next.wind_speed)?,
        });

        t = t + Duration::hours(1);
    }

    Ok(result)
}

// The fraction only looks at the hour of day, as the upstream indexes its data.
// This goes wrong when the bracket spans midnight.
fn hour_fraction(first: DateTime<Utc>, next: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    let span = next.hour() as i32 - first.hour() as i32;
    if span == 0 {
        warn!(
            "Profiles at {} and {} share an hour of day, copying the earlier one",
            first, next
        );
        return 0.0;
    }

    (t.hour() as i32 - first.hour() as i32) as f64 / span as f64
}

// Slices must have equal length. None when a value leaves the i32 range, which
// only happens when the hour fraction extrapolates across midnight.
fn interpolate(r: f64, a: &[i32], b: &[i32]) -> Option<Vec<i32>> {
    a.iter()
        .zip(b)
        .map(|(&x1, &x2)| {
            let step = (r * (x2 as i64 - x1 as i64) as f64) as i64;
            i32::try_from(x1 as i64 + step).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(hour: u32, pressure: Vec<i32>, wind: Vec<i32>) -> VerticalProfile {
        let mut p = VerticalProfile::new(Utc.with_ymd_and_hms(2020, 6, 19, hour, 0, 0).unwrap(), None);
        p.height = pressure.iter().map(|v| v * 10).collect();
        p.temperature = pressure.iter().map(|v| v / 100).collect();
        p.dew_point = pressure.iter().map(|v| -v / 100).collect();
        p.pressure = pressure;
        p.wind_speed = wind.clone();
        p.wind_direction = wind;
        p
    }

    #[test]
    fn three_hour_gap_gives_two_profiles() {
        let out = fill_missing_hours(vec![
            profile(3, vec![1000], vec![10]),
            profile(6, vec![1010], vec![20]),
        ])
        .unwrap();

        assert_eq!(out.len(), 4);
        let hours: Vec<u32> = out.iter().map(|p| p.time.hour()).collect();
        assert_eq!(hours, vec![3, 4, 5, 6]);
        assert_eq!(out[1].pressure, vec![1003]);
        assert_eq!(out[2].pressure, vec![1006]);
        assert_eq!(out[1].wind_speed, vec![13]);
        assert_eq!(out[2].wind_direction, vec![16]);
    }

    #[test]
    fn midpoint() {
        let out = fill_missing_hours(vec![
            profile(0, vec![1000], vec![]),
            profile(2, vec![1010], vec![]),
        ])
        .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].pressure, vec![1005]);
        assert_eq!(out[1].height, vec![10050]);
    }

    #[test]
    fn truncates_toward_zero() {
        let out = fill_missing_hours(vec![
            profile(0, vec![1010, 900], vec![]),
            profile(3, vec![1000, 902], vec![]),
        ])
        .unwrap();
        // 1010 - 10/3 and 900 + 2/3
        assert_eq!(out[1].pressure, vec![1007, 900]);
        assert_eq!(out[2].pressure, vec![1004, 901]);
    }

    #[test]
    fn keeps_wind_length() {
        let out = fill_missing_hours(vec![
            profile(0, vec![1000, 900, 800], vec![5]),
            profile(2, vec![1010, 910, 810], vec![7]),
        ])
        .unwrap();
        assert_eq!(out[1].levels(), 3);
        assert_eq!(out[1].wind_levels(), 1);
        assert!(out[1].is_consistent());
    }

    #[test]
    fn no_gap_no_change() {
        let input = vec![
            profile(0, vec![1000], vec![1]),
            profile(1, vec![1001], vec![2]),
            profile(2, vec![1002], vec![3]),
        ];
        let out = fill_missing_hours(input.clone()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn empty_and_single() {
        assert!(fill_missing_hours(vec![]).unwrap().is_empty());
        assert_eq!(fill_missing_hours(vec![profile(0, vec![1], vec![])]).unwrap().len(), 1);
    }

    #[test]
    fn mismatched_levels_is_internal_error() {
        let err = fill_missing_hours(vec![
            profile(0, vec![1000, 900], vec![]),
            profile(3, vec![1000], vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let mut low = profile(0, vec![], vec![]);
        let mut high = profile(2, vec![], vec![]);
        for p in [&mut low, &mut high].iter_mut() {
            p.height = vec![0, 0];
            p.temperature = vec![0, 0];
            p.dew_point = vec![0, 0];
        }
        low.pressure = vec![i32::MIN, i32::MAX];
        high.pressure = vec![i32::MAX, i32::MIN];

        let out = fill_missing_hours(vec![low, high]).unwrap();
        assert_eq!(out[1].pressure, vec![-1, 0]);
    }

    #[test]
    fn fraction_uses_hour_of_day_across_midnight() {
        let mut late = profile(21, vec![1000], vec![]);
        late.time = Utc.with_ymd_and_hms(2020, 6, 18, 21, 0, 0).unwrap();
        let out = fill_missing_hours(vec![late, profile(0, vec![1030], vec![])]).unwrap();

        let got: Vec<(u32, i32)> = out.iter().map(|p| (p.time.hour(), p.pressure[0])).collect();
        assert_eq!(got, vec![(21, 1000), (22, 999), (23, 998), (0, 1030)]);
    }

    #[test]
    fn same_hour_next_day_copies_earlier_profile() {
        let mut next = profile(0, vec![1030], vec![9]);
        next.time = Utc.with_ymd_and_hms(2020, 6, 20, 0, 0, 0).unwrap();
        let first = profile(0, vec![1000], vec![5]);
        let out = fill_missing_hours(vec![first.clone(), next]).unwrap();

        assert_eq!(out.len(), 25);
        for p in &out[1..24] {
            assert_eq!(p.pressure, first.pressure);
            assert_eq!(p.height, first.height);
            assert_eq!(p.wind_speed, first.wind_speed);
        }
        assert_eq!(out[24].pressure, vec![1030]);
    }

    #[test]
    fn mismatch_without_gap_is_fine() {
        let out = fill_missing_hours(vec![
            profile(0, vec![1000, 900], vec![]),
            profile(1, vec![1000], vec![]),
        ])
        .unwrap();
        assert_eq!(out.len(), 2);
    }
}
