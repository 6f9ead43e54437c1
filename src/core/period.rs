use crate::utils::error::{EtlError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DATE_RANGE_SEPARATOR: &str = "/TO/";

/// How period targets are named: `<prefix><YYYY><MM>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for TargetNaming {
    fn default() -> Self {
        Self {
            prefix: "interim_daily_".to_string(),
            extension: "grb".to_string(),
        }
    }
}

/// A calendar month of a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(EtlError::InvalidConfigValueError {
                field: "period.year".to_string(),
                value: year.to_string(),
                reason: "Year must have four digits (1..=9999)".to_string(),
            });
        }
        if !(1..=12).contains(&month) {
            return Err(EtlError::InvalidConfigValueError {
                field: "period.month".to_string(),
                value: month.to_string(),
                reason: "Month must be between 1 and 12".to_string(),
            });
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn number_of_days(&self) -> u32 {
        let next_month = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };

        match next_month.and_then(|d| d.pred_opt()) {
            Some(last) => last.day(),
            // 9999-12 沒有下一個月
            None => 31,
        }
    }

    pub fn start_date(&self) -> String {
        format!("{:04}{:02}01", self.year, self.month)
    }

    pub fn last_date(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.number_of_days())
    }

    /// Inclusive date range in the form the data service expects.
    pub fn request_dates(&self) -> String {
        format!(
            "{}{}{}",
            self.start_date(),
            DATE_RANGE_SEPARATOR,
            self.last_date()
        )
    }

    pub fn target(&self, naming: &TargetNaming) -> String {
        format!(
            "{}{:04}{:02}.{}",
            naming.prefix, self.year, self.month, naming.extension
        )
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of years, always covering months 1 through 12.
///
/// Only built through [`PeriodRange::new`], so every year it yields is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    year_start: i32,
    year_end: i32,
}

impl PeriodRange {
    pub const MONTH_START: u32 = 1;
    pub const MONTH_END: u32 = 12;

    pub fn new(year_start: i32, year_end: i32) -> Result<Self> {
        // 年份本身的檢查交給 Period::new
        Period::new(year_start, Self::MONTH_START)?;
        Period::new(year_end, Self::MONTH_START)?;

        if year_start > year_end {
            return Err(EtlError::InvalidConfigValueError {
                field: "fetch.year_start".to_string(),
                value: year_start.to_string(),
                reason: format!("Start year must not be after end year {}", year_end),
            });
        }
        Ok(Self {
            year_start,
            year_end,
        })
    }

    pub fn year_start(&self) -> i32 {
        self.year_start
    }

    pub fn year_end(&self) -> i32 {
        self.year_end
    }

    pub fn len(&self) -> usize {
        if self.year_end < self.year_start {
            return 0;
        }
        (self.year_end - self.year_start + 1) as usize * Self::MONTH_END as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periods in order: year outer, month inner.
    pub fn iter(&self) -> impl Iterator<Item = Period> {
        (self.year_start..=self.year_end).flat_map(|year| {
            (Self::MONTH_START..=Self::MONTH_END).map(move |month| Period { year, month })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_number_of_days_handles_leap_years() {
        assert_eq!(Period::new(2000, 2).unwrap().number_of_days(), 29);
        assert_eq!(Period::new(1900, 2).unwrap().number_of_days(), 28);
        assert_eq!(Period::new(2016, 2).unwrap().number_of_days(), 29);
        assert_eq!(Period::new(2018, 2).unwrap().number_of_days(), 28);
        assert_eq!(Period::new(2018, 4).unwrap().number_of_days(), 30);
        assert_eq!(Period::new(2018, 12).unwrap().number_of_days(), 31);
        assert_eq!(Period::new(9999, 12).unwrap().number_of_days(), 31);
    }

    #[test]
    fn test_target_is_zero_padded() {
        let naming = TargetNaming::default();
        assert_eq!(
            Period::new(1993, 1).unwrap().target(&naming),
            "interim_daily_199301.grb"
        );
        assert_eq!(
            Period::new(2000, 2).unwrap().target(&naming),
            "interim_daily_200002.grb"
        );
        assert_eq!(
            Period::new(2018, 12).unwrap().target(&naming),
            "interim_daily_201812.grb"
        );
    }

    #[test]
    fn test_request_dates() {
        assert_eq!(
            Period::new(2018, 2).unwrap().request_dates(),
            "20180201/TO/20180228"
        );
        assert_eq!(
            Period::new(2000, 2).unwrap().request_dates(),
            "20000201/TO/20000229"
        );
        assert_eq!(Period::new(1993, 1).unwrap().start_date(), "19930101");
        assert_eq!(Period::new(1993, 1).unwrap().last_date(), "19930131");
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert!(Period::new(2018, 0).is_err());
        assert!(Period::new(2018, 13).is_err());
        assert!(Period::new(0, 1).is_err());
        assert!(Period::new(10000, 1).is_err());
    }

    #[test]
    fn test_range_yields_twelve_unique_targets_per_year() {
        let range = PeriodRange::new(1993, 2018).unwrap();
        let naming = TargetNaming::default();
        let periods: Vec<Period> = range.iter().collect();

        assert_eq!(periods.len(), (2018 - 1993 + 1) * 12);
        assert_eq!(range.len(), periods.len());

        let targets: HashSet<String> = periods.iter().map(|p| p.target(&naming)).collect();
        assert_eq!(targets.len(), periods.len());
    }

    #[test]
    fn test_range_order_is_year_then_month() {
        let range = PeriodRange::new(1999, 2000).unwrap();
        let periods: Vec<Period> = range.iter().collect();

        assert_eq!(periods.first().unwrap().to_string(), "1999-01");
        assert_eq!(periods[11].to_string(), "1999-12");
        assert_eq!(periods[12].to_string(), "2000-01");
        assert_eq!(periods.last().unwrap().to_string(), "2000-12");
        assert!(periods.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_range_single_year_and_reversed() {
        assert_eq!(PeriodRange::new(2018, 2018).unwrap().len(), 12);
        assert!(PeriodRange::new(2018, 1993).is_err());
    }

    #[test]
    fn test_range_rejects_years_without_four_digits() {
        assert!(PeriodRange::new(0, 2000).is_err());
        assert!(PeriodRange::new(-5, 1993).is_err());
        assert!(PeriodRange::new(1993, 10000).is_err());

        let range = PeriodRange::new(1, 1).unwrap();
        assert_eq!((range.year_start(), range.year_end()), (1, 1));
        assert_eq!(
            range.iter().next().unwrap().target(&TargetNaming::default()),
            "interim_daily_000101.grb"
        );
    }
}
