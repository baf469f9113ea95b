/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use chrono::prelude::*;
use http::StatusCode;
use log::info;
use url::Url;

use crate::error::{Error, Result};

pub const IMS_FORECAST_URL: &str =
    "https://ims.gov.il/sites/default/files/ims_data/xml_files/IMS_001.xml";
pub const IMS_STATIONS_URL: &str = "https://api.ims.gov.il/v1/envista/stations";
pub const NOAA_SOUNDINGS_URL: &str = "https://rucsoundings.noaa.gov/get_soundings.cgi";
pub const UWYO_SOUNDING_URL: &str = "http://weather.uwyo.edu/cgi-bin/sounding";

lazy_static! {
    pub static ref HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .user_agent(concat!("airsounds-fetch/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap();
}

/// Raw bytes of an upstream response together with its status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub url: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// The body, unless the status says there is nothing worth decoding.
    pub fn success_body(&self) -> Result<&[u8]> {
        if !self.status.is_success() {
            return Err(Error::Fetch(format!(
                "bad status {} from {}",
                self.status, self.url
            )));
        }

        Ok(&self.body)
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<RawResponse> {
    let resp = request.send().await?;
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp.bytes().await?.to_vec();

    Ok(RawResponse { status, url, body })
}

pub async fn get_ims_forecast() -> Result<RawResponse> {
    info!("Fetching IMS forecast from {}", IMS_FORECAST_URL);
    send(HTTP_CLIENT.get(IMS_FORECAST_URL)).await
}

pub async fn get_ims_measurements(token: &str, station: u32, date: NaiveDate) -> Result<RawResponse> {
    let url = ims_measurements_url(station, date)?;
    info!("Fetching IMS measurements from {}", url);

    send(
        HTTP_CLIENT
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("ApiToken {}", token)),
    )
    .await
}

pub async fn get_noaa(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lat: f32,
    long: f32,
) -> Result<RawResponse> {
    let query = noaa_query(start, end, lat, long);
    info!("Fetching NOAA soundings for {},{} from {} to {}", lat, long, start, end);

    send(HTTP_CLIENT.get(NOAA_SOUNDINGS_URL).query(&query)).await
}

pub async fn get_uwyo<Tz: TimeZone>(station: u32, region: &str, t: &DateTime<Tz>) -> Result<RawResponse> {
    let query = uwyo_query(station, region, t);
    info!("Fetching UWYO sounding for station {} ({:?})", station, query);

    send(HTTP_CLIENT.get(UWYO_SOUNDING_URL).query(&query)).await
}

pub fn ims_measurements_url(station: u32, date: NaiveDate) -> Result<Url> {
    let raw = format!(
        "{}/{}/data/daily/{}",
        IMS_STATIONS_URL,
        station,
        date.format("%Y/%m/%d")
    );

    Url::parse(&raw).map_err(|e| Error::Fetch(format!("bad url {}: {}", raw, e)))
}

/// NOAA only serves times on a 3 hour grid, in UTC.
pub fn noaa_query(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lat: f32,
    long: f32,
) -> Vec<(&'static str, String)> {
    let start = truncate_to_hours(start, 3);
    let end = truncate_to_hours(end, 3);

    vec![
        ("data_source", "GFS".to_owned()),
        ("start_year", start.year().to_string()),
        ("start_month_name", start.format("%B").to_string()),
        ("start_mday", start.day().to_string()),
        ("start_hour", "0".to_owned()),
        ("start_min", "0".to_owned()),
        ("n_hrs", "1.0".to_owned()),
        ("fcst_len", "shortest".to_owned()),
        ("airport", format!("{},{}", lat, long)),
        ("text", "Ascii text (GSD format)".to_owned()),
        ("hydrometeors", "false".to_owned()),
        ("startSecs", start.timestamp().to_string()),
        ("endSecs", end.timestamp().to_string()),
    ]
}

/// Wyoming keeps soundings at 00 and 12 only.
pub fn uwyo_query<Tz: TimeZone>(
    station: u32,
    region: &str,
    t: &DateTime<Tz>,
) -> Vec<(&'static str, String)> {
    let hour = if t.hour() > 12 { "12" } else { "00" };
    let day = format!("{:02}{}", t.day(), hour);

    vec![
        ("region", region.to_owned()),
        ("STNM", station.to_string()),
        ("TYPE", "TEXT:LIST".to_owned()),
        ("YEAR", format!("{:4}", t.year())),
        ("MONTH", format!("{:02}", t.month())),
        ("FROM", day.clone()),
        ("TO", day),
    ]
}

fn truncate_to_hours(t: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    let hour = t.hour() - t.hour() % hours;
    match t.date_naive().and_hms_opt(hour, 0, 0) {
        Some(naive) => Utc.from_utc_datetime(&naive),
        None => t,
    }
}
