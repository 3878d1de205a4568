//! Identity resolution: deciding whether two positions are the same security.
//!
//! Filings populate security identifiers inconsistently: a CUSIP may be
//! missing, padded, lower-cased, or reported without its check digit. The
//! resolver maps a single [`Position`] to an [`IdentityKey`]:
//!
//! 1. Primary path: the identifier, normalized and validated against the
//!    configured [`IdentifierScheme`]. Put/call rows keep an option suffix
//!    because filers reuse the underlying CUSIP for them.
//! 2. Fallback path: the normalized issuer name combined with the normalized
//!    security class, so a warrant and the common stock of one issuer stay
//!    distinct.
//!
//! Resolution is a pure function of one position and the scheme. There is no
//! cache and no cross-snapshot state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Position;

const ID_PREFIX: &str = "id:";
const NAME_PREFIX: &str = "name:";

/// Normalized key used to match a security across two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    fn from_identifier(code: &str, option: Option<&str>) -> Self {
        match option {
            Some(kind) => Self(format!("{ID_PREFIX}{code}|{kind}")),
            None => Self(format!("{ID_PREFIX}{code}")),
        }
    }

    fn from_name(name: &str, class: Option<&str>) -> Self {
        match class {
            Some(class) => Self(format!("{NAME_PREFIX}{name}|{class}")),
            None => Self(format!("{NAME_PREFIX}{name}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the key came from the name fallback rather than an identifier.
    pub fn is_name_fallback(&self) -> bool {
        self.0.starts_with(NAME_PREFIX)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which identifier code a filer uses, and therefore which codes are well-formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierScheme {
    /// 8-character issue code, optionally followed by a check digit.
    #[default]
    Cusip,
    /// 12-character international code.
    Isin,
    /// Any alphanumeric code up to 12 characters.
    Any,
}

impl IdentifierScheme {
    /// Canonical form of a normalized code, or `None` when it is malformed.
    ///
    /// CUSIPs key on the 8-character issue prefix so that a filing which drops
    /// the check digit still matches one that includes it.
    pub fn canonical(self, code: &str) -> Option<String> {
        let len = code.len();
        match self {
            IdentifierScheme::Cusip => match len {
                8 => Some(code.to_string()),
                9 => {
                    let (base, check) = code.split_at(8);
                    let expected = cusip_check_digit(base)?;
                    (check.chars().next() == Some(expected)).then(|| base.to_string())
                }
                _ => None,
            },
            IdentifierScheme::Isin => (len == 12).then(|| code.to_string()),
            IdentifierScheme::Any => (1..=12).contains(&len).then(|| code.to_string()),
        }
    }
}

impl std::str::FromStr for IdentifierScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cusip" => Ok(IdentifierScheme::Cusip),
            "isin" => Ok(IdentifierScheme::Isin),
            "any" => Ok(IdentifierScheme::Any),
            other => Err(format!("unknown identifier scheme '{other}' (cusip, isin, any)")),
        }
    }
}

/// A position yielded no key on either path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolvable {
    pub name: String,
}

/// Maps positions to identity keys under one identifier scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityResolver {
    scheme: IdentifierScheme,
}

impl IdentityResolver {
    pub fn new(scheme: IdentifierScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> IdentifierScheme {
        self.scheme
    }

    pub fn resolve(&self, position: &Position) -> Result<IdentityKey, Unresolvable> {
        let class = position
            .security_class
            .as_deref()
            .map(normalize_name)
            .filter(|c| !c.is_empty());

        let primary = position
            .identifier
            .as_deref()
            .map(normalize_identifier)
            .and_then(|code| self.scheme.canonical(&code));
        if let Some(code) = primary {
            let option = class.as_deref().filter(|c| is_option_class(c));
            return Ok(IdentityKey::from_identifier(&code, option));
        }

        let name = normalize_name(&position.name);
        if name.is_empty() {
            return Err(Unresolvable {
                name: position.name.clone(),
            });
        }
        Ok(IdentityKey::from_name(&name, class.as_deref()))
    }
}

/// Trim, upper-case, and drop every non-alphanumeric character.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Lower-case, strip punctuation, and collapse runs of whitespace.
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_option_class(class: &str) -> bool {
    matches!(class, "put" | "call")
}

/// Modulus-10 "double-add-double" check digit over the first 8 CUSIP characters.
pub fn cusip_check_digit(base: &str) -> Option<char> {
    if base.len() != 8 {
        return None;
    }
    let mut sum = 0u32;
    for (i, c) in base.chars().enumerate() {
        let mut v = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            '*' => 36,
            '@' => 37,
            '#' => 38,
            _ => return None,
        };
        if i % 2 == 1 {
            v *= 2;
        }
        sum += v / 10 + v % 10;
    }
    char::from_digit((10 - sum % 10) % 10, 10)
}
