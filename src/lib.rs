/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Fetches surface forecasts and atmospheric soundings from IMS, NOAA and the
//! University of Wyoming and normalises them into UTC-stamped profiles.

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod error;
pub mod fetch;
pub mod ims;
pub mod ims_stations;
pub mod interpolation;
pub mod locations;
pub mod noaa;
pub mod profile;
pub mod units;
pub mod uwyo;

pub use error::{Error, Result};
