use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{Error, Result};

pub type OsmId = u64;

/// Number of fixed decimal digits kept for node coordinates.
pub const COORD_DECIMALS: usize = 7;
const COORD_SCALE: u64 = 10_000_000;

/// A coordinate rounded to 7 decimal digits, held as an integer count of 1e-7 degrees.
/// Rounding works on the exact decimal value of the float, ties to even. A value that rounds
/// to zero from below keeps its sign for display but compares equal to zero.
#[derive(Debug, Clone, Copy)]
pub struct FixedCoord {
    units: i64,
    negative: bool,
}

impl FixedCoord {
    pub fn round(value: f64) -> Result<FixedCoord> {
        let text = format!("{:.*}", COORD_DECIMALS, value);
        let digits: String = text.chars().filter(|c| *c != '.').collect();
        let units = digits.parse::<i64>()
            .map_err(|_| Error::from(format!("coordinate {} is out of range", value)))?;
        Ok(FixedCoord {
            units,
            negative: text.starts_with('-'),
        })
    }
}

impl PartialEq for FixedCoord {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
    }
}

impl Eq for FixedCoord {}

impl Hash for FixedCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.units.hash(state);
    }
}

impl fmt::Display for FixedCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        let abs = self.units.unsigned_abs();
        write!(f, "{}{}.{:0width$}", sign, abs / COORD_SCALE, abs % COORD_SCALE, width = COORD_DECIMALS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: OsmId,
    pub lon: FixedCoord,
    pub lat: FixedCoord,
}

/// Tags in insertion order. Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }

    /// Returns false and leaves the tags untouched when the key is already set.
    pub fn insert_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.0.push((key.to_string(), value.to_string()));
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: OsmId,
    pub nodes: Vec<OsmId>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    Way,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Way => "way",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Outer,
    Inner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Outer => "outer",
            Role::Inner => "inner",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub member_type: MemberType,
    pub member_ref: OsmId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: OsmId,
    pub members: Vec<Member>,
    pub tags: Tags,
}

impl Relation {
    pub fn members_with_role(&self, role: Role) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(move |member| member.role == role)
    }
}
