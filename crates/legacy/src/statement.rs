//! Statement text for the legacy procedures and lookups.

use crate::driver::LegacyValue;

/// Liveness probe run on every freshly opened connection.
pub const PROBE_SQL: &str = "SELECT 1 FROM RDB$DATABASE";

/// Legacy identity lookup by CURP or RFC.
pub const LOOKUP_INTERNO_SQL: &str =
    "SELECT FIRST 1 INTERNO FROM AFILIADOS WHERE CURP = ? OR RFC = ? ORDER BY INTERNO";

/// `EXECUTE PROCEDURE NAME(?, ?, ...)` with `arity` placeholders.
pub fn procedure_call(procedure: &str, arity: usize) -> String {
    let placeholders = vec!["?"; arity].join(", ");
    format!("EXECUTE PROCEDURE {procedure}({placeholders})")
}

/// The same call with every parameter inlined as a literal.
///
/// Only for logs and dry-run previews; execution always binds parameters.
pub fn render_literal(procedure: &str, params: &[LegacyValue]) -> String {
    let args: Vec<String> = params.iter().map(literal).collect();
    format!("EXECUTE PROCEDURE {procedure}({})", args.join(", "))
}

fn literal(value: &LegacyValue) -> String {
    match value {
        LegacyValue::Null => "NULL".to_string(),
        LegacyValue::Int(i) => i.to_string(),
        LegacyValue::Float(f) => f.to_string(),
        LegacyValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        LegacyValue::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("x'{hex}'")
        }
    }
}
