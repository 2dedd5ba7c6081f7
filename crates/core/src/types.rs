//! Core type definitions for Studiomap

use serde::{Deserialize, Serialize};

use crate::{Result, StudiomapError};

/// Publication status of a company in the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    /// Company is running and listed as open
    #[default]
    Open,
    /// Company has closed down but is kept for history
    Closed,
}

impl CompanyStatus {
    /// Value stored in the `state` column of partners
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanyStatus {
    type Err = StudiomapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(StudiomapError::validation(format!(
                "Invalid company status: {}",
                s
            ))),
        }
    }
}

/// Partner (company) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(pub i64);

impl From<i64> for PartnerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PartnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Website user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of payload a listing page renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    /// Table of companies
    List,
    /// Markers on a map
    Map,
}

impl ListingKind {
    /// Public URL of the listing page for this kind
    pub fn url(&self) -> &'static str {
        match self {
            Self::List => LIST_URL,
            Self::Map => MAP_URL,
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// URL of the map listing page
pub const MAP_URL: &str = "/directory";
/// URL of the list listing page
pub const LIST_URL: &str = "/directory/list";
