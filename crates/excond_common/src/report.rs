//! Run-scoped exception site report.
//!
//! Append-only while the run is live, serialized once when it finishes.
//! Sites keep event order.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::site::ExceptionSite;

/// Banner rule delimiting the report section.
pub const BANNER_RULE: &str = "========================================";
/// Title line printed under the opening rule.
pub const BANNER_TITLE: &str = "EXCEPTION CONDITIONS (symbolic path conditions):";

/// Ordered sequence of exception sites for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    sites: Vec<ExceptionSite>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, site: ExceptionSite) {
        self.sites.push(site);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExceptionSite> {
        self.sites.iter()
    }

    pub fn sites(&self) -> &[ExceptionSite] {
        &self.sites
    }

    /// Compact JSON array. Empty reports render as `[]`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.sites)?)
    }

    /// Indented JSON array for people reading the output.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.sites)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Full report section: opening banner, JSON array, closing rule.
    pub fn render_section(&self, pretty: bool) -> Result<String> {
        let body = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        Ok(format!(
            "{rule}\n{title}\n{body}\n{rule}\n",
            rule = BANNER_RULE,
            title = BANNER_TITLE,
            body = body
        ))
    }

    /// Pull the JSON array back out of a rendered section.
    pub fn from_section(section: &str) -> Result<Self> {
        let start = section.find(BANNER_TITLE).map_or(0, |i| i + BANNER_TITLE.len());
        let rest = &section[start..];
        let end = rest.rfind(BANNER_RULE).unwrap_or(rest.len());
        Self::from_json(rest[..end].trim())
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a ExceptionSite;
    type IntoIter = std::slice::Iter<'a, ExceptionSite>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

impl FromIterator<ExceptionSite> for Report {
    fn from_iter<I: IntoIterator<Item = ExceptionSite>>(iter: I) -> Self {
        Self {
            sites: iter.into_iter().collect(),
        }
    }
}
