/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use chrono_tz::Tz;
use log::{debug, info};
use select::document::Document;
use select::node::Node;
use select::predicate::Name;

use crate::error::{Error, Result};
use crate::fetch::RawResponse;
use crate::profile::{RowTokenizer, VerticalProfile, WYOMING_ROWS};
use crate::units::parse_zoned_header;

// Dash rule, column names, units, dash rule.
const TABLE_HEADER_LINES: usize = 4;

pub fn soundings_from_response(
    resp: &RawResponse,
    zone: Tz,
    tokenizer: RowTokenizer,
) -> Result<Vec<VerticalProfile>> {
    parse_soundings(resp.success_body()?, zone, tokenizer)
}

/// Extracts one profile per `<h2>` heading and the `<pre>` table following it.
/// Running out of headings ends the document, it is not an error.
pub fn parse_soundings(body: &[u8], zone: Tz, tokenizer: RowTokenizer) -> Result<Vec<VerticalProfile>> {
    let html = match std::str::from_utf8(body) {
        Ok(h) => h,
        Err(e) => {
            return Err(Error::Parse(format!("sounding page is not utf-8: {}", e)));
        }
    };

    let document = Document::from(html);
    let body = match document.find(Name("body")).next() {
        Some(b) => b,
        None => {
            return Err(Error::Parse("didn't find 'body' node".to_owned()));
        }
    };

    let mut node = body.first_child();
    let mut profiles = Vec::new();
    while let Some(header) = find_element(node, &["h2"]) {
        let table = match find_element(header.next(), &["pre", "h2"]) {
            Some(t) if t.name() == Some("pre") => t,
            _ => {
                return Err(Error::Parse(format!(
                    "no table follows heading {:?}",
                    header.text()
                )));
            }
        };

        profiles.push(parse_table(&header.text(), &table.text(), zone, tokenizer)?);
        node = table.next();
    }

    info!("Parsed {} UWYO soundings", profiles.len());

    Ok(profiles)
}

fn parse_table(heading: &str, table: &str, zone: Tz, tokenizer: RowTokenizer) -> Result<VerticalProfile> {
    let time = parse_zoned_header(heading, zone)
        .map_err(|e| Error::Parse(format!("parsing header {:?}: {}", heading, e)))?;
    let station = heading
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<u32>().ok());
    debug!("Found sounding for station {:?} at {}", station, time);

    let mut profile = VerticalProfile::new(time, station);
    let rows = table
        .trim_start_matches(|c| c == '\r' || c == '\n')
        .lines()
        .skip(TABLE_HEADER_LINES)
        .filter(|l| !l.trim().is_empty());
    for line in rows {
        profile.push_row(line, &WYOMING_ROWS, tokenizer)?;
    }

    Ok(profile)
}

/// Depth-first search from `start` through its descendants and following
/// siblings for the first element named one of `tags`.
fn find_element<'a>(start: Option<Node<'a>>, tags: &[&str]) -> Option<Node<'a>> {
    let mut node = start;
    while let Some(n) = node {
        if let Some(name) = n.name() {
            if tags.contains(&name) {
                return Some(n);
            }
        }
        if let Some(found) = find_element(n.first_child(), tags) {
            return Some(found);
        }
        node = n.next();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::prelude::*;

    const UWYO_HTML: &str = r###"<HTML>
<TITLE>University of Wyoming - Radiosonde Data</TITLE>
<BODY BGCOLOR="white">
<H2>40179 Bet Dagan Observations at 00Z 19 Jun 2020</H2>
<PRE>
-----------------------------------------------------------------------------
   PRES   HGHT   TEMP   DWPT   RELH   MIXR   DRCT   SKNT   THTA   THTE   THTV
    hPa     m      C      C      %    g/kg    deg   knot     K      K      K
-----------------------------------------------------------------------------
 1000.0    112   24.2   13.2     50   9.67    300     11  297.1  325.3  298.8
  993.0    174   25.2   12.2     44   9.06    305     12  298.7  325.2  300.3
  925.0    799   20.6    9.6     49   8.16    320     10  300.3  324.5  301.8
  850.0   1530   16.4   -0.6     31   4.61    335      8  303.3  317.6  304.1
</PRE><H3>Station information and sounding indices</H3><PRE>
                         Station identifier: LLBD
                             Station number: 40179
</PRE>
<H2>40179 Bet Dagan Observations at 12Z 19 Jun 2020</H2>
<PRE>
-----------------------------------------------------------------------------
   PRES   HGHT   TEMP   DWPT   RELH   MIXR   DRCT   SKNT   THTA   THTE   THTV
    hPa     m      C      C      %    g/kg    deg   knot     K      K      K
-----------------------------------------------------------------------------
 1000.0    109   29.0   15.0     42  10.79    290     14  302.1  333.9  304.1
  925.0    800   23.2    8.2     38   7.42    295     16  302.9  325.3  304.3
</PRE><H3>Station information and sounding indices</H3><PRE>
                             Station number: 40179
</PRE>
<P>Description of the
<A HREF="/upperair/columns.html">columns and abbreviations</A>.
</BODY></HTML>
"###;

    const SPARSE_WIND_HTML: &str = r###"<HTML><BODY>
<H2>40179 Bet Dagan Observations at 00Z 19 Jun 2020</H2>
<PRE>
-----------------------------------------------------------------------------
   PRES   HGHT   TEMP   DWPT   RELH   MIXR   DRCT   SKNT   THTA   THTE   THTV
    hPa     m      C      C      %    g/kg    deg   knot     K      K      K
-----------------------------------------------------------------------------
 1000.0    112   24.2   13.2     50   9.67    300     11  297.1  325.3  298.8
  993.0    174   25.2   12.2     44   9.06                298.7  325.2  300.3
  986.0    237   25.0   11.0     41   8.46                299.1  323.6  300.6
  979.0    301   24.4   10.9     42   8.46                299.1  323.6  300.6
  925.0    799   20.6    9.6     49   8.16    320     10  300.3  324.5  301.8
  913.0    912   19.8    9.3     50   8.09                300.6  324.9  302.1
  900.0   1036   18.8    8.8     52   7.98                300.8  324.8  302.2
  877.0   1258   17.4    6.4     48   6.85                301.6  322.4  302.9
  850.0   1530   16.4   -0.6     31   4.61    335      8  303.3  317.6  304.1
  837.0   1662   15.6   -3.4     27   3.72                303.8  315.6  304.5
  700.0   3142    5.0   -8.0     39   3.26    280     15  307.8  318.2  308.4
</PRE>
</BODY></HTML>
"###;

    fn jerusalem() -> Tz {
        chrono_tz::Asia::Jerusalem
    }

    #[test]
    fn parses_every_section() {
        let ps = parse_soundings(UWYO_HTML.as_bytes(), jerusalem(), RowTokenizer::Whitespace).unwrap();
        assert_eq!(ps.len(), 2);

        let p = &ps[0];
        assert_eq!(p.station, Some(40179));
        assert_eq!(p.time, Utc.with_ymd_and_hms(2020, 6, 18, 21, 0, 0).unwrap());
        assert_eq!(p.pressure, vec![1000, 993, 925, 850]);
        assert_eq!(p.height, vec![367, 570, 2621, 5019]);
        assert_eq!(p.temperature, vec![24, 25, 20, 16]);
        assert_eq!(p.dew_point, vec![13, 12, 9, 0]);
        assert_eq!(p.wind_direction, vec![300, 305, 320, 335]);
        assert_eq!(p.wind_speed, vec![11, 12, 10, 8]);

        // No interpolation between the 00Z and 12Z soundings.
        assert_eq!(ps[1].time, Utc.with_ymd_and_hms(2020, 6, 19, 9, 0, 0).unwrap());
        assert_eq!(ps[1].levels(), 2);
    }

    #[test]
    fn sparse_wind_keeps_lengths() {
        let ps = parse_soundings(
            SPARSE_WIND_HTML.as_bytes(),
            jerusalem(),
            RowTokenizer::FixedColumns { width: 7 },
        )
        .unwrap();
        assert_eq!(ps.len(), 1);

        let p = &ps[0];
        assert_eq!(p.pressure.len(), 11);
        assert_eq!(p.height.len(), 11);
        assert_eq!(p.temperature.len(), 11);
        assert_eq!(p.dew_point.len(), 11);
        assert_eq!(p.wind_direction, vec![300, 320, 335, 280]);
        assert_eq!(p.wind_speed, vec![11, 10, 8, 15]);
    }

    #[test]
    fn default_rows_handle_sparse_wind() {
        let rows = crate::config::Config::default().uwyo_rows;
        let ps = parse_soundings(SPARSE_WIND_HTML.as_bytes(), jerusalem(), rows).unwrap();
        assert_eq!(ps[0].levels(), 11);
        assert_eq!(ps[0].wind_levels(), 4);
        assert!(ps[0].is_consistent());
    }

    #[test]
    fn sparse_wind_rejected_by_strict_split() {
        let err = parse_soundings(SPARSE_WIND_HTML.as_bytes(), jerusalem(), RowTokenizer::Whitespace)
            .unwrap_err();
        match err {
            Error::Parse(msg) => assert!(msg.contains("993.0")),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn no_sections_is_empty() {
        let html = "<html><body><p>Can't get 40179 Bet Dagan Observations at 00Z 19 Jun 2020.</p></body></html>";
        let ps = parse_soundings(html.as_bytes(), jerusalem(), RowTokenizer::Whitespace).unwrap();
        assert!(ps.is_empty());
    }

    #[test]
    fn heading_without_table() {
        let html = "<html><body><h2>40179 Bet Dagan Observations at 00Z 19 Jun 2020</h2><p>Sorry</p></body></html>";
        let err = parse_soundings(html.as_bytes(), jerusalem(), RowTokenizer::Whitespace).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let html = "<html><body><h2>first at 00Z 19 Jun 2020</h2><h2>second at 12Z 19 Jun 2020</h2><pre>\n</pre></body></html>";
        let err = parse_soundings(html.as_bytes(), jerusalem(), RowTokenizer::Whitespace).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn bad_heading_time() {
        let html = UWYO_HTML.replace("at 12Z 19 Jun 2020", "on 12Z 19 Jun 2020");
        let err = parse_soundings(html.as_bytes(), jerusalem(), RowTokenizer::Whitespace).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn malformed_row_gives_no_partial_result() {
        let html = UWYO_HTML.replace("   1530   16.4", "   15x0   16.4");
        match parse_soundings(html.as_bytes(), jerusalem(), RowTokenizer::Whitespace) {
            Err(Error::Parse(msg)) => assert!(msg.contains("15x0")),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn not_utf8() {
        let mut bytes = UWYO_HTML.as_bytes().to_vec();
        bytes.insert(10, 0xff);
        assert!(matches!(
            parse_soundings(&bytes, jerusalem(), RowTokenizer::Whitespace),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn find_element_descends() {
        let document = Document::from("<html><body><div><span><pre>x</pre></span></div><h2>y</h2></body></html>");
        let body = document.find(Name("body")).next().unwrap();
        let pre = find_element(body.first_child(), &["pre"]).unwrap();
        assert_eq!(pre.text(), "x");
        let h2 = find_element(body.first_child(), &["h2"]).unwrap();
        assert_eq!(h2.text(), "y");
        assert!(find_element(body.first_child(), &["table"]).is_none());
    }
}
