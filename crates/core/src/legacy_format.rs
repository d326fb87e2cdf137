//! Fixed-width and fixed-format field rules for the legacy procedures.
//!
//! The legacy columns are CHAR/VARCHAR of fixed size and the procedures
//! take dates as `mm/dd/yy` strings. Values are truncated, never rejected.

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Column widths
// ---------------------------------------------------------------------------

pub const CURP_WIDTH: usize = 18;
pub const RFC_WIDTH: usize = 13;
pub const EMPLOYEE_NUMBER_WIDTH: usize = 10;
pub const NAME_WIDTH: usize = 30;
pub const SURNAME_WIDTH: usize = 25;
pub const NSS_WIDTH: usize = 11;
pub const STREET_WIDTH: usize = 60;
pub const NEIGHBORHOOD_WIDTH: usize = 40;
pub const POSTAL_CODE_WIDTH: usize = 5;
pub const PHONE_WIDTH: usize = 15;
pub const EMAIL_WIDTH: usize = 60;
pub const ORG_CODE_WIDTH: usize = 10;
pub const FLAG_WIDTH: usize = 1;
pub const PERIOD_WIDTH: usize = 4;
pub const MOVEMENT_CODE_WIDTH: usize = 2;

/// Date format expected by every legacy procedure.
pub const LEGACY_DATE_FORMAT: &str = "%m/%d/%y";

/// Timestamp format for the admission field of "create affiliate".
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Truncate to at most `width` characters (not bytes) after trimming.
pub fn truncate(value: &str, width: usize) -> String {
    value.trim().chars().take(width).collect()
}

/// Truncate an optional value, mapping `None` to an empty string.
pub fn truncate_opt(value: Option<&str>, width: usize) -> String {
    value.map(|v| truncate(v, width)).unwrap_or_default()
}

/// Format a date as `mm/dd/yy`.
pub fn format_legacy_date(date: NaiveDate) -> String {
    date.format(LEGACY_DATE_FORMAT).to_string()
}

/// Format a timestamp as `mm/dd/yyyy hh:mm:ss`.
pub fn format_legacy_timestamp(ts: NaiveDateTime) -> String {
    ts.format(LEGACY_TIMESTAMP_FORMAT).to_string()
}

/// Map the "owns property" flag to the legacy `S`/`N` char.
pub fn property_flag(owns_property: Option<bool>) -> &'static str {
    match owns_property {
        Some(true) => "S",
        _ => "N",
    }
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Legacy marital-status code used when the source value is missing.
pub const DEFAULT_MARITAL_STATUS: &str = "S";

/// Legacy nationality code used when the source value is missing.
pub const DEFAULT_NATIONALITY: &str = "M";

/// Map a free-text or numeric marital status to its one-char legacy code.
///
/// Unknown values fall back to [`DEFAULT_MARITAL_STATUS`] (single).
pub fn marital_status_code(value: Option<&str>) -> &'static str {
    let Some(raw) = value.map(|v| v.trim().to_uppercase()) else {
        return DEFAULT_MARITAL_STATUS;
    };
    match raw.as_str() {
        "1" | "S" | "SOLTERO" | "SOLTERA" | "SINGLE" => "S",
        "2" | "C" | "CASADO" | "CASADA" | "MARRIED" => "C",
        "3" | "D" | "DIVORCIADO" | "DIVORCIADA" | "DIVORCED" => "D",
        "4" | "V" | "VIUDO" | "VIUDA" | "WIDOWED" => "V",
        "5" | "U" | "UNION LIBRE" | "UNIÓN LIBRE" | "CONCUBINATO" => "U",
        _ => DEFAULT_MARITAL_STATUS,
    }
}

/// Map a free-text or numeric nationality to its one-char legacy code.
///
/// Unknown values fall back to [`DEFAULT_NATIONALITY`] (Mexican).
pub fn nationality_code(value: Option<&str>) -> &'static str {
    let Some(raw) = value.map(|v| v.trim().to_uppercase()) else {
        return DEFAULT_NATIONALITY;
    };
    match raw.as_str() {
        "1" | "M" | "MEX" | "MEXICANA" | "MEXICANO" | "MEXICAN" => "M",
        "2" | "E" | "EXT" | "EXTRANJERA" | "EXTRANJERO" | "FOREIGN" => "E",
        _ => DEFAULT_NATIONALITY,
    }
}

/// Normalize a sex value to the one-char legacy code (`H`/`M`).
pub fn sex_code(value: Option<&str>) -> String {
    let Some(raw) = value.map(|v| v.trim().to_uppercase()) else {
        return String::new();
    };
    match raw.as_str() {
        "H" | "HOMBRE" | "MASCULINO" | "1" => "H".to_string(),
        "M" | "MUJER" | "FEMENINO" | "2" => "M".to_string(),
        _ => truncate(&raw, FLAG_WIDTH),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
