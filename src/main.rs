/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;

use chrono::prelude::*;
use chrono::Duration;
use clap::{Parser, ValueEnum};
use futures::future::join_all;
use log::{error, info, warn};
use serde::Serialize;

use airsounds_fetch::config::Config;
use airsounds_fetch::locations::{match_forecasts, uwyo_stations};
use airsounds_fetch::{fetch, ims, ims_stations, noaa, uwyo, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Ims,
    Measure,
    Noaa,
    Uwyo,
}

#[derive(Parser, Debug)]
#[command(name = "airsounds-fetch")]
#[command(about = "Fetch forecasts and soundings and print them as JSON lines")]
struct Args {
    /// Which source to update, all of them when omitted
    #[arg(short, long, value_enum)]
    source: Option<Source>,

    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,
}

/// One output line for the storage side to pick up.
#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    source: &'static str,
    location: &'a str,
    data: &'a T,
}

fn emit<T: Serialize>(source: &'static str, location: &str, data: &T) -> Result<()> {
    let line = serde_json::to_string(&Record {
        source,
        location,
        data,
    })
    .map_err(|e| Error::Internal(format!("serializing {} record: {}", source, e)))?;
    println!("{}", line);

    Ok(())
}

async fn run_ims(config: &Config) -> Result<()> {
    let resp = fetch::get_ims_forecast().await?;
    let forecasts = ims::forecasts_from_response(&resp, &config.ims_zone)?;

    for (location, forecast) in match_forecasts(&config.locations, forecasts) {
        for hourly in &forecast.forecast {
            emit("ims", &location, hourly)?;
        }
        info!("Wrote {} IMS forecasts for {}", forecast.forecast.len(), location);
    }

    Ok(())
}

async fn run_measure(config: &Config) -> Result<()> {
    let token = match &config.ims_api_token {
        Some(t) => t,
        None => {
            warn!("No ims.api_token configured, skipping station measurements");
            return Ok(());
        }
    };

    let today = Utc::now().with_timezone(&config.reference_zone).date_naive();
    let resp = fetch::get_ims_measurements(token, config.ims_station, today).await?;
    let measurements = ims_stations::measurements_from_response(&resp)?;

    let station = config.ims_station.to_string();
    for m in &measurements {
        emit("measure", &station, m)?;
    }
    info!("Wrote {} measurements for station {}", measurements.len(), station);

    Ok(())
}

async fn run_noaa(config: &Config) -> Result<()> {
    let start = Utc.from_utc_datetime(&Utc::now().date_naive().and_time(NaiveTime::default()));
    let end = start + Duration::days(config.noaa_forecast_days);

    let requests = config
        .locations
        .iter()
        .map(|l| fetch::get_noaa(start, end, l.lat, l.long));
    let responses = join_all(requests).await;

    for (location, resp) in config.locations.iter().zip(responses) {
        let profiles = noaa::soundings_from_response(&resp?)?;
        for p in &profiles {
            emit("noaa", &location.name, p)?;
        }
        info!("Wrote {} NOAA profiles for {}", profiles.len(), location.name);
    }

    Ok(())
}

async fn run_uwyo(config: &Config) -> Result<()> {
    let now = Utc::now().with_timezone(&config.reference_zone);

    for station in uwyo_stations(&config.locations) {
        let resp = fetch::get_uwyo(station, &config.uwyo_region, &now).await?;
        let profiles = uwyo::soundings_from_response(&resp, config.reference_zone, config.uwyo_rows)?;

        let name = station.to_string();
        for p in &profiles {
            emit("uwyo", &name, p)?;
        }
        info!("Wrote {} UWYO profiles for station {}", profiles.len(), name);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            error!("Could not get configuration. Exiting.");
            std::process::exit(1);
        }
    };

    let mut failures = 0;
    let sources = [Source::Ims, Source::Measure, Source::Noaa, Source::Uwyo];
    for source in sources.iter().copied() {
        if args.source.map_or(false, |wanted| wanted != source) {
            continue;
        }

        let result = match source {
            Source::Ims => run_ims(&config).await,
            Source::Measure => run_measure(&config).await,
            Source::Noaa => run_noaa(&config).await,
            Source::Uwyo => run_uwyo(&config).await,
        };

        match result {
            Ok(()) => info!("Finished {:?}", source),
            Err(e) => {
                error!("Fetching {:?}: {}", source, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
