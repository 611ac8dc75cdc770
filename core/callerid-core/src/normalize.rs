//! Phone number canonicalization.
//!
//! Directory rows store numbers in whatever shape the agent typed them
//! (`010-1234-5678`, `01012345678`, `+82 10 ...`), so matching always happens
//! on the digit sequence. The dashed form exists only because some directory
//! rows were saved dashed and the remote query is an exact-match `or`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct NormalizedNumber {
    /// Digits only. Empty means no match is possible.
    pub digits: String,
    /// `3-4-4` for 11 digits, `3-3-4` for 10 digits, otherwise `digits`.
    pub dashed: String,
}

impl NormalizedNumber {
    pub fn is_matchable(&self) -> bool {
        !self.digits.is_empty()
    }

    /// Exact-match candidates for the directory query, in priority order,
    /// without duplicates.
    pub fn candidates(&self, raw: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(3);
        for candidate in [self.dashed.as_str(), self.digits.as_str(), raw.trim()] {
            if !candidate.is_empty() && !out.iter().any(|existing| existing == candidate) {
                out.push(candidate.to_string());
            }
        }
        out
    }
}

/// Strips every non-digit and derives the dashed display form.
pub fn normalize(raw: &str) -> NormalizedNumber {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let dashed = match digits.len() {
        11 => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
        10 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        _ => digits.clone(),
    };
    NormalizedNumber { digits, dashed }
}

/// FFI entry point for the native layer.
#[uniffi::export]
pub fn normalize_number(raw: String) -> NormalizedNumber {
    normalize(&raw)
}
