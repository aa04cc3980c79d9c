use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::error::Error;

const SECONDS_PER_TENTH: f64 = 360.0;

/// 小数第1位に丸めた時間数
///
/// 表示は小数点にカンマを使う（1.5 時間 → "1,5"）。内部では 0.1 時間単位の整数で持つ。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours {
    tenths: i64,
}

impl Hours {
    pub const ZERO: Hours = Hours { tenths: 0 };

    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            tenths: (seconds as f64 / SECONDS_PER_TENTH).round_ties_even() as i64,
        }
    }

    /// 秒数が無い・0 の場合はゼロ
    pub fn from_optional_seconds(seconds: Option<i64>) -> Self {
        seconds.map(Self::from_seconds).unwrap_or(Self::ZERO)
    }

    pub fn from_f64(hours: f64) -> Self {
        Self {
            tenths: (hours * 10.0).round_ties_even() as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.tenths as f64 / 10.0
    }

    pub fn is_zero(&self) -> bool {
        self.tenths == 0
    }

    /// 解析できない文字列はゼロとして扱う
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::ZERO)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.tenths < 0 { "-" } else { "" };
        let abs = self.tenths.unsigned_abs();
        write!(f, "{}{},{}", sign, abs / 10, abs % 10)
    }
}

impl FromStr for Hours {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(',', ".");
        let hours: f64 = normalized
            .parse()
            .map_err(|_| Error::InvalidData(format!("Invalid hours value: {:?}", s)))?;
        if !hours.is_finite() {
            return Err(Error::InvalidData(format!("Invalid hours value: {:?}", s)));
        }
        Ok(Self::from_f64(hours))
    }
}

impl Add for Hours {
    type Output = Hours;

    fn add(self, rhs: Hours) -> Hours {
        Hours {
            tenths: self.tenths + rhs.tenths,
        }
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Hours) {
        self.tenths += rhs.tenths;
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Hours>>(iter: I) -> Hours {
        iter.fold(Hours::ZERO, Add::add)
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
