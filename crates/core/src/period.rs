//! Legacy period codes: two-digit pay period of the year followed by the
//! two-digit year (`"0125"` is the first quincena of 2025).

use crate::error::CoreError;

/// Quincenas (half-month pay periods) per year.
pub const PAY_PERIODS_PER_YEAR: i32 = 24;

/// Build the four-character period code.
pub fn format_period(pay_period: i32, year: i32) -> Result<String, CoreError> {
    if !(1..=PAY_PERIODS_PER_YEAR).contains(&pay_period) {
        return Err(CoreError::Validation(format!(
            "Pay period must be between 1 and {PAY_PERIODS_PER_YEAR}, got {pay_period}"
        )));
    }
    if year < 0 {
        return Err(CoreError::Validation(format!("Invalid period year {year}")));
    }
    Ok(format!("{:02}{:02}", pay_period, year % 100))
}

/// Split a period code back into `(pay_period, two_digit_year)`.
pub fn parse_period(code: &str) -> Option<(i32, i32)> {
    if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let period: i32 = code[..2].parse().ok()?;
    let year: i32 = code[2..].parse().ok()?;
    (1..=PAY_PERIODS_PER_YEAR)
        .contains(&period)
        .then_some((period, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_quincena_of_2025() {
        assert_eq!(format_period(1, 2025).unwrap(), "0125");
    }

    #[test]
    fn last_quincena_pads_year() {
        assert_eq!(format_period(24, 2009).unwrap(), "2409");
    }

    #[test]
    fn two_digit_year_input_is_accepted() {
        assert_eq!(format_period(7, 25).unwrap(), "0725");
    }

    #[test]
    fn out_of_range_period_is_rejected() {
        assert!(format_period(0, 2025).is_err());
        assert!(format_period(25, 2025).is_err());
    }

    #[test]
    fn negative_year_is_rejected() {
        assert!(format_period(3, -1).is_err());
    }

    #[test]
    fn parse_round_trips_valid_code() {
        assert_eq!(parse_period("1224"), Some((12, 24)));
        assert_eq!(parse_period("2599"), None);
        assert_eq!(parse_period("12A4"), None);
        assert_eq!(parse_period("123"), None);
    }
}
