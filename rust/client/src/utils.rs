use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MachineError;

/// Decimals of the native coin and of every pool token.
pub const TOKEN_DECIMALS: u32 = 9;

const BPS_PER_PERCENT: u64 = 100;
const SLIPPAGE_DECIMALS: u32 = 2;

/// Scales a human decimal amount such as `"1.5"` to base units.
pub fn parse_amount(value: &str) -> Result<u64, MachineError> {
    parse_scaled(value, TOKEN_DECIMALS, "amount")
}

pub fn format_amount(value: u64) -> String {
    let scale = 10u64.pow(TOKEN_DECIMALS);
    let whole = value / scale;
    let fraction = value % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0>width$}", width = TOKEN_DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

fn parse_scaled(value: &str, decimals: u32, label: &str) -> Result<u64, MachineError> {
    let trimmed = value.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(format!("{label} is empty")));
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid(format!("{label} is not a decimal number: {trimmed}")));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(format!("{label} has more than {decimals} decimals")));
    }
    let overflow = || invalid(format!("{label} is too large: {trimmed}"));
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| overflow())?
    };
    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let padding = 10u64.pow(decimals - fraction.len() as u32);
        fraction.parse::<u64>().map_err(|_| overflow())? * padding
    };
    whole_value
        .checked_mul(10u64.pow(decimals))
        .and_then(|scaled| scaled.checked_add(fraction_value))
        .ok_or_else(overflow)
}

fn invalid(message: String) -> MachineError {
    MachineError::InvalidSettings(message)
}

/// Slippage tolerance in basis points, capped at 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slippage(u64);

impl Slippage {
    pub const MAX_BPS: u64 = 10_000;

    pub fn from_bps(bps: u64) -> Result<Self, MachineError> {
        if bps > Self::MAX_BPS {
            return Err(invalid(format!("slippage above 100%: {bps} bps")));
        }
        Ok(Self(bps))
    }

    pub fn from_percent(percent: u64) -> Result<Self, MachineError> {
        let bps = percent
            .checked_mul(BPS_PER_PERCENT)
            .ok_or_else(|| invalid(format!("slippage above 100%: {percent}%")))?;
        Self::from_bps(bps)
    }

    pub fn bps(&self) -> u64 {
        self.0
    }
}

impl Default for Slippage {
    fn default() -> Self {
        Self(BPS_PER_PERCENT)
    }
}

impl FromStr for Slippage {
    type Err = MachineError;

    /// Accepts a percent with up to two decimals, e.g. `"1"` or `"0.5"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().trim_end_matches('%');
        Self::from_bps(parse_scaled(value, SLIPPAGE_DECIMALS, "slippage")?)
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / BPS_PER_PERCENT;
        let fraction = self.0 % BPS_PER_PERCENT;
        if fraction == 0 {
            write!(f, "{whole}%")
        } else {
            let digits = format!("{fraction:02}");
            write!(f, "{whole}.{}%", digits.trim_end_matches('0'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{format_amount, parse_amount, Slippage};

    #[test]
    fn parse_amount_scales_to_base_units() {
        assert_eq!(parse_amount("1").expect("whole"), 1_000_000_000);
        assert_eq!(parse_amount("1.5").expect("fraction"), 1_500_000_000);
        assert_eq!(parse_amount("0.000000001").expect("smallest"), 1);
        assert_eq!(parse_amount(".25").expect("leading dot"), 250_000_000);
        assert_eq!(parse_amount(" 2. ").expect("trailing dot"), 2_000_000_000);
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount(".").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1e9").is_err());
        assert!(parse_amount("0.0000000001").is_err());
        assert!(parse_amount("18446744074").is_err());
    }

    #[test]
    fn format_amount_trims_trailing_zeros() {
        assert_eq!(format_amount(1_500_000_000), "1.5");
        assert_eq!(format_amount(2_000_000_000), "2");
        assert_eq!(format_amount(1), "0.000000001");
    }

    #[test]
    fn slippage_parses_percent_strings() {
        assert_eq!("1".parse::<Slippage>().expect("one").bps(), 100);
        assert_eq!("0.5".parse::<Slippage>().expect("half").bps(), 50);
        assert_eq!("2.25%".parse::<Slippage>().expect("suffix").bps(), 225);
        assert!("0.125".parse::<Slippage>().is_err());
        assert!("101".parse::<Slippage>().is_err());
        assert_eq!(Slippage::from_percent(3).expect("three").to_string(), "3%");
        assert_eq!(Slippage::from_bps(50).expect("half").to_string(), "0.5%");
    }
}
