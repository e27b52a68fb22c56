use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observed exchange rate, quoted as local currency per USD.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub rate: Decimal,
    pub timestamp: u64,
}

/// Reference windows the dashboard compares against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Day,
    #[default]
    Week,
    Month,
}

impl Window {
    pub fn days(self) -> u32 {
        match self {
            Window::Day => 1,
            Window::Week => 7,
            Window::Month => 30,
        }
    }

    pub fn seconds(self) -> u64 {
        u64::from(self.days()) * crate::SECONDS_PER_DAY
    }

    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            1 => Some(Window::Day),
            7 => Some(Window::Week),
            30 => Some(Window::Month),
            _ => None,
        }
    }
}

impl std::str::FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "1" => Ok(Window::Day),
            "week" | "7" => Ok(Window::Week),
            "month" | "30" => Ok(Window::Month),
            other => Err(format!("unknown window '{}', use day, week or month", other)),
        }
    }
}

/// Result of a market data fetch: the current rate plus two reference points.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub current: Decimal,
    pub week_ago: Decimal,
    pub month_ago: Decimal,
    pub timestamp: u64,
}

impl MarketSnapshot {
    pub fn current_sample(&self) -> RateSample {
        RateSample { rate: self.current, timestamp: self.timestamp }
    }

    /// Reference sample for `window`. A one-day window falls back to the
    /// weekly point since the feed only tracks week and month history.
    pub fn sample(&self, window: Window) -> RateSample {
        match window {
            Window::Day | Window::Week => RateSample {
                rate: self.week_ago,
                timestamp: self.timestamp.saturating_sub(Window::Week.seconds()),
            },
            Window::Month => RateSample {
                rate: self.month_ago,
                timestamp: self.timestamp.saturating_sub(Window::Month.seconds()),
            },
        }
    }
}
