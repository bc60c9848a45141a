//! Exception site model.
//!
//! One record per explored path that ended in a thrown exception while a
//! symbolic path condition was active.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::MethodContext;
use crate::normalize::format_condition;

/// Sentinel for provenance the engine could not resolve.
pub const UNKNOWN: &str = "unknown";

/// Source line of a throwing instruction: a 1-based line or unknown.
///
/// Serialized as a plain integer with `-1` for unknown. Any non-positive
/// value collapses to unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct LineNumber(Option<u32>);

impl LineNumber {
    pub const UNKNOWN: LineNumber = LineNumber(None);

    pub fn new(line: i64) -> Self {
        match u32::try_from(line) {
            Ok(n) if n > 0 => LineNumber(Some(n)),
            _ => LineNumber::UNKNOWN,
        }
    }

    pub fn get(&self) -> Option<u32> {
        self.0
    }
}

impl From<i64> for LineNumber {
    fn from(line: i64) -> Self {
        LineNumber::new(line)
    }
}

impl From<LineNumber> for i64 {
    fn from(line: LineNumber) -> Self {
        line.0.map_or(-1, i64::from)
    }
}

impl From<Option<u32>> for LineNumber {
    fn from(line: Option<u32>) -> Self {
        line.map_or(LineNumber::UNKNOWN, |n| LineNumber::new(i64::from(n)))
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// A recorded (exception, location, condition) triple.
///
/// Immutable after construction: `condition_friendly` is derived once from
/// `condition` and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionSite {
    thrown_exception: String,
    method_signature: String,
    line_number: LineNumber,
    condition: String,
    condition_friendly: String,
}

impl ExceptionSite {
    /// Build a site, normalizing `condition` with the method's names if known.
    pub fn new(
        thrown_exception: impl Into<String>,
        method_signature: impl Into<String>,
        line_number: LineNumber,
        condition: impl Into<String>,
        method: Option<&dyn MethodContext>,
    ) -> Self {
        let condition = condition.into();
        let condition_friendly = format_condition(&condition, method);
        Self {
            thrown_exception: thrown_exception.into(),
            method_signature: method_signature.into(),
            line_number,
            condition,
            condition_friendly,
        }
    }

    pub fn thrown_exception(&self) -> &str {
        &self.thrown_exception
    }

    pub fn method_signature(&self) -> &str {
        &self.method_signature
    }

    pub fn line_number(&self) -> LineNumber {
        self.line_number
    }

    /// Raw path condition as printed by the engine.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Readable condition (e.g. `value > this.balance`).
    pub fn condition_friendly(&self) -> &str {
        &self.condition_friendly
    }

    /// Single-line JSON form of this site.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for ExceptionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{} when {}",
            self.thrown_exception, self.method_signature, self.line_number, self.condition_friendly
        )
    }
}
