use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::error::{Result, TallyError};
use crate::models::{Status, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Monthly,
    Annual,
}

impl FromStr for Period {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "mensal" => Ok(Self::Monthly),
            "annual" | "anual" => Ok(Self::Annual),
            other => Err(TallyError::InvalidQuery(format!(
                "unknown period '{other}' (expected monthly or annual)"
            ))),
        }
    }
}

/// A validated `YYYY-MM` anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("static regex"))
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(TallyError::InvalidQuery(format!("year {year} is out of range")));
        }
        if !(1..=12).contains(&month) {
            return Err(TallyError::InvalidQuery(format!("month {month} is out of range")));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| TallyError::InvalidQuery(format!("invalid month {self}")))
    }

    pub fn last_day(&self) -> Result<NaiveDate> {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| TallyError::InvalidQuery(format!("invalid month {self}")))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = year_month_re().captures(s.trim()).ok_or_else(|| {
            TallyError::InvalidQuery(format!("date '{s}' is not in YYYY-MM form"))
        })?;
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| TallyError::InvalidQuery(format!("bad year in '{s}'")))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| TallyError::InvalidQuery(format!("bad month in '{s}'")))?;
        Self::new(year, month)
    }
}

/// Filter criteria for a report. `None` in `kind` or `status` means "all".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuerySpec {
    pub period: Option<Period>,
    pub kind: Option<TransactionKind>,
    pub status: Option<Status>,
    pub anchor: Option<YearMonth>,
}

fn is_all(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None => true,
        Some(s) => s.is_empty() || s.eq_ignore_ascii_case("all"),
    }
}

impl QuerySpec {
    /// Build a spec from raw caller parameters (`period`, `kind`, `status`, `date`).
    pub fn parse(
        period: Option<&str>,
        kind: Option<&str>,
        status: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self> {
        let period = match period.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(p.parse::<Period>()?),
            None => None,
        };
        let kind = if is_all(kind) {
            None
        } else {
            Some(
                kind.unwrap_or_default()
                    .parse::<TransactionKind>()
                    .map_err(|e| TallyError::InvalidQuery(e.to_string()))?,
            )
        };
        let status = if is_all(status) {
            None
        } else {
            Some(
                status
                    .unwrap_or_default()
                    .parse::<Status>()
                    .map_err(|e| TallyError::InvalidQuery(e.to_string()))?,
            )
        };
        let anchor = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Some(d.parse::<YearMonth>()?),
            None => None,
        };
        Ok(Self {
            period,
            kind,
            status,
            anchor,
        })
    }

    /// Inclusive date range implied by the anchor, if any.
    ///
    /// An anchor without a period is read as a single month.
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let Some(anchor) = self.anchor else {
            return Ok(None);
        };
        let range = match self.period.unwrap_or(Period::Monthly) {
            Period::Monthly => (anchor.first_day()?, anchor.last_day()?),
            Period::Annual => {
                let start = NaiveDate::from_ymd_opt(anchor.year(), 1, 1);
                let end = NaiveDate::from_ymd_opt(anchor.year(), 12, 31);
                match (start, end) {
                    (Some(s), Some(e)) => (s, e),
                    _ => {
                        return Err(TallyError::InvalidQuery(format!(
                            "year {} is out of range",
                            anchor.year()
                        )))
                    }
                }
            }
        };
        Ok(Some(range))
    }

    /// Lines for the report's filter band.
    pub fn describe(&self) -> Vec<String> {
        let period = match (self.anchor, self.period) {
            (None, _) => "Period: all dates".to_string(),
            (Some(a), Some(Period::Annual)) => format!("Period: annual {}", a.year()),
            (Some(a), _) => format!("Period: monthly {:02}/{:04}", a.month(), a.year()),
        };
        let kind = match self.kind {
            Some(k) => format!("Kind: {}", k.label()),
            None => "Kind: all".to_string(),
        };
        let status = match self.status {
            Some(s) => format!("Status: {}", s.label()),
            None => "Status: all".to_string(),
        };
        vec![period, kind, status]
    }

    /// Short slug used in export file names.
    pub fn slug(&self) -> String {
        match (self.anchor, self.period) {
            (None, _) => "all".to_string(),
            (Some(a), Some(Period::Annual)) => a.year().to_string(),
            (Some(a), _) => format!("{:04}-{:02}", a.year(), a.month()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_month_parses() {
        let ym: YearMonth = "2024-02".parse().unwrap();
        assert_eq!(ym.year(), 2024);
        assert_eq!(ym.month(), 2);
        assert_eq!(ym.to_string(), "2024-02");
    }

    #[test]
    fn test_year_month_rejects_bad_shape() {
        for raw in ["2024-2", "24-02", "2024/02", "2024-02-01", "abcd-ef", ""] {
            let err = raw.parse::<YearMonth>().unwrap_err();
            assert!(matches!(err, TallyError::InvalidQuery(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn test_year_month_rejects_out_of_range() {
        assert!(matches!("2024-13".parse::<YearMonth>(), Err(TallyError::InvalidQuery(_))));
        assert!(matches!("2024-00".parse::<YearMonth>(), Err(TallyError::InvalidQuery(_))));
        assert!(matches!("0000-05".parse::<YearMonth>(), Err(TallyError::InvalidQuery(_))));
    }

    #[test]
    fn test_monthly_range_handles_leap_february() {
        let spec = QuerySpec::parse(Some("monthly"), None, None, Some("2024-02")).unwrap();
        assert_eq!(spec.date_range().unwrap(), Some((day(2024, 2, 1), day(2024, 2, 29))));
    }

    #[test]
    fn test_monthly_range_december() {
        let spec = QuerySpec::parse(Some("monthly"), None, None, Some("2023-12")).unwrap();
        assert_eq!(spec.date_range().unwrap(), Some((day(2023, 12, 1), day(2023, 12, 31))));
    }

    #[test]
    fn test_annual_range() {
        let spec = QuerySpec::parse(Some("annual"), None, None, Some("2024-07")).unwrap();
        assert_eq!(spec.date_range().unwrap(), Some((day(2024, 1, 1), day(2024, 12, 31))));
    }

    #[test]
    fn test_anchor_without_period_is_monthly() {
        let spec = QuerySpec::parse(None, None, None, Some("2024-01")).unwrap();
        assert_eq!(spec.date_range().unwrap(), Some((day(2024, 1, 1), day(2024, 1, 31))));
    }

    #[test]
    fn test_no_anchor_means_no_range() {
        let spec = QuerySpec::parse(Some("annual"), None, None, None).unwrap();
        assert_eq!(spec.date_range().unwrap(), None);
    }

    #[test]
    fn test_all_selects_everything() {
        let spec = QuerySpec::parse(None, Some("all"), Some("ALL"), None).unwrap();
        assert_eq!(spec, QuerySpec::default());
    }

    #[test]
    fn test_parse_rejects_unknown_values_as_invalid_query() {
        assert!(matches!(
            QuerySpec::parse(Some("weekly"), None, None, None),
            Err(TallyError::InvalidQuery(_))
        ));
        assert!(matches!(
            QuerySpec::parse(None, Some("expense"), None, None),
            Err(TallyError::InvalidQuery(_))
        ));
        assert!(matches!(
            QuerySpec::parse(None, None, Some("late"), None),
            Err(TallyError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_describe() {
        let spec =
            QuerySpec::parse(Some("monthly"), Some("fixed_expense"), None, Some("2024-01")).unwrap();
        assert_eq!(
            spec.describe(),
            vec![
                "Period: monthly 01/2024".to_string(),
                "Kind: Fixed expense".to_string(),
                "Status: all".to_string(),
            ]
        );
        assert_eq!(spec.slug(), "2024-01");
    }
}
