//! Built-in run settings: 10 m wind components around the FROGGIT station and
//! the iSTA-BREEZE small wind generator catalogue.

use crate::domain::model::ProductSpec;
use std::collections::BTreeMap;

pub const YEAR_START: i32 = 1993;
pub const YEAR_END: i32 = 2018;
pub const FETCH_OUTPUT_DIR: &str = ".";

pub const MANUFACTURER: &str = "IstaBreeze";
pub const SCRAPE_OUTPUT_PATH: &str = "generators.json";
pub const SCRAPE_TIMEOUT_SECONDS: u64 = 60;

/// ERA-Interim surface analysis, u/v wind at 10 m, four times a day.
const INTERIM_REQUEST: &[(&str, &str)] = &[
    ("class", "ei"),
    ("stream", "oper"),
    ("type", "an"),
    ("dataset", "interim"),
    ("expver", "1"),
    ("repres", "sh"),
    ("levtype", "sfc"),
    ("param", "165.128/166.128"),
    ("step", "0"),
    ("domain", "g"),
    ("resol", "auto"),
    ("area", "36.48/-6.23/36.43/-6.19"),
    ("time", "00/06/12/18"),
    ("padding", "0"),
    ("expect", "any"),
    ("grid", "0.75/0.75"),
];

const GENERATORS: &[(&str, &str, u64)] = &[
    (
        "https://www.istabreeze.com/online/Windgenerator/i-300-12v-Windgenerator-iSTA-BREEZE",
        "i-300 12V",
        189,
    ),
    (
        "https://www.istabreeze.com/online/Windgenerator/L-500-24V-Windgenerator-iSTA-BREEZE-Land-Edition",
        "L-500 24V",
        229,
    ),
    (
        "https://www.istabreeze.com/online/Windgenerator/i-700-24V-Windgenerator-iSTA-BREEZE",
        "i-700 24V",
        369,
    ),
    (
        "https://www.istabreeze.com/online/Windgenerator/i-1000-24V-Windgenerator-iSTA-BREEZE",
        "i-1000 24V",
        459,
    ),
    (
        "https://www.istabreeze.com/online/Windgenerator/i-1500-48V-Windgenerator-iSTA-BREEZE",
        "i-1500 48V",
        539,
    ),
    (
        "https://www.istabreeze.com/online/Windgenerator/i-2000-48V-Windgenerator-iSTA-BREEZE",
        "i-2000 48V",
        619,
    ),
];

pub fn interim_request() -> BTreeMap<String, String> {
    INTERIM_REQUEST
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn generators() -> Vec<ProductSpec> {
    GENERATORS
        .iter()
        .map(|(url, model, price)| ProductSpec {
            url: url.to_string(),
            model: model.to_string(),
            price: (*price).into(),
        })
        .collect()
}
