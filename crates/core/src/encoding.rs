//! Repair of mis-decoded accented characters in legacy strings.
//!
//! The legacy store has mangled the Spanish `ñ`/`Ñ` in several ways over
//! the years: the UTF-8 bytes of U+FFFD read back as Latin-1 (`ï¿½`), a
//! bare U+FFFD, or a literal `?`, always sitting between two letters.
//! Vowels with acute accents show up as classic UTF-8-read-as-Latin-1
//! pairs (`Ã¡` for `á`).
//!
//! [`EncodingCorrector::decode`] runs a fixed pipeline:
//!
//! 1. byte decoding with the configured [`SourceCharset`], falling back
//!    through the other single-byte encodings;
//! 2. [`CorrectionRule::SurnameDictionary`];
//! 3. [`CorrectionRule::FlankedMarker`];
//! 4. [`CorrectionRule::Utf8AsLatin1`].
//!
//! The pipeline is re-run until the text stops changing, so decoding
//! already-corrected text is a no-op.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// UTF-8 bytes of U+FFFD (`EF BF BD`) read back as Latin-1.
pub const MOJIBAKE_MARKER: &str = "\u{EF}\u{BF}\u{BD}";

/// [`MOJIBAKE_MARKER`] as chars, for positional scanning.
const MOJIBAKE_CHARS: [char; 3] = ['\u{EF}', '\u{BF}', '\u{BD}'];

/// The Unicode replacement character.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Upper bound on pipeline passes when looking for a fixed point.
const MAX_PASSES: usize = 4;

/// Field-name suffixes that mark a column as free text (names, places).
const TEXTUAL_FIELD_SUFFIXES: &[&str] = &[
    "NOMBRE",
    "NOMBRES",
    "APELLIDO",
    "PATERNO",
    "MATERNO",
    "LOCALIDAD",
    "MUNICIPIO",
    "ESTADO",
    "CALLE",
    "NACIONALIDAD",
    "NAME",
    "SURNAME",
    "LOCALITY",
    "MUNICIPALITY",
    "STATE",
    "STREET",
    "NATIONALITY",
];

/// Surnames that reach the legacy store without their tilde.
const SURNAME_FIXES: &[(&str, &str)] = &[
    ("IBANEZ", "IBAÑEZ"),
    ("PATINO", "PATIÑO"),
    ("MUNOZ", "MUÑOZ"),
    ("NUNEZ", "NUÑEZ"),
    ("ORDONEZ", "ORDOÑEZ"),
    ("YANEZ", "YAÑEZ"),
    ("CASTANEDA", "CASTAÑEDA"),
    ("ACUNA", "ACUÑA"),
    ("PENALOZA", "PEÑALOZA"),
];

/// UTF-8 two-byte sequences that were decoded as Windows-1252 or Latin-1.
///
/// Uppercase vowels appear twice because their second byte falls in the
/// 0x80-0x9F range, which the two single-byte charsets decode differently.
const UTF8_AS_LATIN1: &[(&str, &str)] = &[
    ("Ã¡", "á"),
    ("Ã©", "é"),
    ("Ã\u{AD}", "í"),
    ("Ã³", "ó"),
    ("Ãº", "ú"),
    ("Ã±", "ñ"),
    ("Ã¼", "ü"),
    ("Ã\u{81}", "Á"),
    ("Ã‰", "É"),
    ("Ã\u{89}", "É"),
    ("Ã\u{8D}", "Í"),
    ("Ã“", "Ó"),
    ("Ã\u{93}", "Ó"),
    ("Ãš", "Ú"),
    ("Ã\u{9A}", "Ú"),
    ("Ã‘", "Ñ"),
    ("Ã\u{91}", "Ñ"),
    ("Ãœ", "Ü"),
    ("Ã\u{9C}", "Ü"),
];

static SURNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SURNAME_FIXES
        .iter()
        .map(|(wrong, _)| *wrong)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid regex")
});

// ---------------------------------------------------------------------------
// Source charset
// ---------------------------------------------------------------------------

/// Character set the legacy database hands back for text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceCharset {
    Utf8,
    #[default]
    Windows1252,
    Latin1,
}

impl SourceCharset {
    /// Name as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF8",
            Self::Windows1252 => "WIN1252",
            Self::Latin1 => "ISO8859_1",
        }
    }

    /// Parse a configured charset name. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "UTF8" | "UTF_8" => Some(Self::Utf8),
            "WIN1252" | "WINDOWS_1252" | "CP1252" => Some(Self::Windows1252),
            "ISO8859_1" | "ISO_8859_1" | "LATIN1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Decoding order: the configured charset first, then the rest.
    /// Latin-1 always comes last because it cannot fail.
    fn fallback_chain(self) -> &'static [SourceCharset] {
        match self {
            Self::Utf8 => &[Self::Utf8, Self::Windows1252, Self::Latin1],
            Self::Windows1252 => &[Self::Windows1252, Self::Utf8, Self::Latin1],
            Self::Latin1 => &[Self::Latin1],
        }
    }

    fn try_decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
            Self::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
            Self::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

impl std::fmt::Display for SourceCharset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a byte buffer starting with `charset` and falling back through
/// the remaining single-byte encodings.
pub fn decode_bytes(bytes: &[u8], charset: SourceCharset) -> String {
    charset
        .fallback_chain()
        .iter()
        .find_map(|cs| cs.try_decode(bytes))
        .unwrap_or_else(|| encoding_rs::mem::decode_latin1(bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Field classification
// ---------------------------------------------------------------------------

/// Whether a column name denotes free text eligible for full correction.
pub fn is_textual_field(field_name: &str) -> bool {
    let upper = field_name.trim().to_ascii_uppercase();
    TEXTUAL_FIELD_SUFFIXES.iter().any(|s| upper.ends_with(s))
}

/// Whether `text` carries a marker that cannot appear in clean data.
///
/// A literal `?` does not count: code and numeric fields may hold one.
pub fn has_corruption_marker(text: &str) -> bool {
    text.contains(MOJIBAKE_MARKER)
        || text.contains(REPLACEMENT_CHAR)
        || UTF8_AS_LATIN1.iter().any(|(bad, _)| text.contains(bad))
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// How aggressively a rule may rewrite the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Free-text column: every rule applies and `?` counts as a marker.
    Textual,
    /// Code or numeric column: only unambiguous corruption is repaired.
    Guarded,
}

/// One step of the text-repair pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionRule {
    /// Whole-word replacement of surnames known to lose their tilde.
    SurnameDictionary,
    /// A marker flanked by letters becomes `ñ` or `Ñ`.
    FlankedMarker,
    /// Literal replacement of UTF-8 pairs decoded as a single-byte charset.
    Utf8AsLatin1,
}

impl CorrectionRule {
    /// Rules in execution order.
    pub const PIPELINE: [CorrectionRule; 3] = [
        CorrectionRule::SurnameDictionary,
        CorrectionRule::FlankedMarker,
        CorrectionRule::Utf8AsLatin1,
    ];

    pub fn apply<'a>(&self, text: &'a str, scope: Scope) -> Cow<'a, str> {
        match self {
            Self::SurnameDictionary => match scope {
                Scope::Textual => fix_known_surnames(text),
                Scope::Guarded => Cow::Borrowed(text),
            },
            Self::FlankedMarker => repair_flanked_markers(text, scope == Scope::Textual),
            Self::Utf8AsLatin1 => replace_utf8_pairs(text),
        }
    }
}

fn fix_known_surnames(text: &str) -> Cow<'_, str> {
    SURNAME_RE.replace_all(text, |caps: &Captures| {
        let found = &caps[0];
        let upper = found.to_uppercase();
        let fixed = SURNAME_FIXES
            .iter()
            .find(|(wrong, _)| *wrong == upper)
            .map(|(_, right)| *right)
            .unwrap_or(found);
        match_case(found, fixed)
    })
}

/// Give `replacement` the letter case pattern of `original`.
fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().all(|c| !c.is_lowercase()) {
        replacement.to_uppercase()
    } else if original.chars().all(|c| !c.is_uppercase()) {
        replacement.to_lowercase()
    } else {
        let lower = replacement.to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Length in chars of a corruption marker starting at `chars[i]`, or 0.
fn marker_len_at(chars: &[char], i: usize, allow_question_mark: bool) -> usize {
    if chars[i..].starts_with(&MOJIBAKE_CHARS) {
        return MOJIBAKE_CHARS.len();
    }
    match chars[i] {
        REPLACEMENT_CHAR => 1,
        '?' if allow_question_mark => 1,
        _ => 0,
    }
}

fn repair_flanked_markers(text: &str, allow_question_mark: bool) -> Cow<'_, str> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        let len = marker_len_at(&chars, i, allow_question_mark);
        if len > 0 {
            let prev = out.chars().last().filter(|c| c.is_alphabetic());
            let next = chars.get(i + len).filter(|c| c.is_alphabetic());
            if let (Some(p), Some(n)) = (prev, next) {
                out.push(if p.is_uppercase() && n.is_uppercase() {
                    'Ñ'
                } else {
                    'ñ'
                });
                changed = true;
                i += len;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

fn replace_utf8_pairs(text: &str) -> Cow<'_, str> {
    if !text.contains('Ã') {
        return Cow::Borrowed(text);
    }
    let mut out = text.to_string();
    for (bad, good) in UTF8_AS_LATIN1 {
        if out.contains(bad) {
            out = out.replace(bad, good);
        }
    }
    Cow::Owned(out)
}

// ---------------------------------------------------------------------------
// Corrector
// ---------------------------------------------------------------------------

/// A value as it comes back from the legacy driver.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(s: &'a str) -> Self {
        RawValue::Text(s)
    }
}

impl<'a> From<&'a [u8]> for RawValue<'a> {
    fn from(b: &'a [u8]) -> Self {
        RawValue::Bytes(b)
    }
}

/// Applies the repair pipeline to values read from the legacy store.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingCorrector {
    charset: SourceCharset,
}

impl EncodingCorrector {
    pub fn new(charset: SourceCharset) -> Self {
        Self { charset }
    }

    /// Decode and repair a raw value.
    ///
    /// With no `field_name` the value is treated as free text. Non-textual
    /// fields are only touched when [`has_corruption_marker`] fires.
    pub fn decode<'a>(&self, raw: impl Into<RawValue<'a>>, field_name: Option<&str>) -> String {
        let text = match raw.into() {
            RawValue::Text(s) => s.to_string(),
            RawValue::Bytes(b) => decode_bytes(b, self.charset),
        };

        let scope = match field_name {
            None => Scope::Textual,
            Some(name) if is_textual_field(name) => Scope::Textual,
            Some(_) if has_corruption_marker(&text) => Scope::Guarded,
            Some(_) => return text,
        };

        correct_text(text, scope)
    }

    /// Shorthand for [`decode`](Self::decode) on an already-decoded string.
    pub fn decode_str(&self, text: &str, field_name: Option<&str>) -> String {
        self.decode(RawValue::Text(text), field_name)
    }
}

/// Run every rule until the text reaches a fixed point.
pub fn correct_text(mut text: String, scope: Scope) -> String {
    for _ in 0..MAX_PASSES {
        let mut pass = text.clone();
        for rule in CorrectionRule::PIPELINE {
            let rewritten = match rule.apply(&pass, scope) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(s) = rewritten {
                pass = s;
            }
        }
        if pass == text {
            break;
        }
        text = pass;
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
