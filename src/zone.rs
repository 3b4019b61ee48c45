//! Boundary zones and the line format they are configured in.
//!
//! One zone per line:
//!
//! ```text
//! p0x,p0y,p1x,p1y,r,g,b,testsbelow,show,showcar,label,prohibited|labels
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use nalgebra as na;
use std::str::FromStr;

use crate::bbox::{BBox, Ltwh};
use crate::error::Error;
use crate::geometry::Boundary;

const MIN_FIELDS: usize = 11;
const MAX_FIELDS: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDefinition {
    pub p0: na::Point2<f32>,
    pub p1: na::Point2<f32>,
    pub color: [u8; 3],
    pub testsbelow: bool,
    pub show: bool,
    pub showcar: bool,
    pub label: String,
    pub prohibited: Vec<String>,
    boundary: Boundary,
}

impl ZoneDefinition {
    pub fn new(
        p0: na::Point2<f32>,
        p1: na::Point2<f32>,
        testsbelow: bool,
        label: impl Into<String>,
        prohibited: Vec<String>,
    ) -> Result<Self, Error> {
        let label = label.into();
        let boundary = Boundary::through(p0, p1)
            .ok_or_else(|| Error::VerticalBoundary { label: label.clone() })?;

        Ok(Self {
            p0,
            p1,
            color: [255, 255, 255],
            testsbelow,
            show: true,
            showcar: true,
            label,
            prohibited,
            boundary,
        })
    }

    #[inline]
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// `true` when the box center lies on the side of the line this zone tests for.
    #[inline]
    pub fn covers(&self, bbox: &BBox<Ltwh>) -> bool {
        self.boundary.is_above(bbox) ^ self.testsbelow
    }

    #[inline]
    pub fn prohibits(&self, label: &str) -> bool {
        self.prohibited.iter().any(|p| p == label)
    }
}

fn field<T: FromStr>(name: &'static str, raw: &str) -> Result<T, Error> {
    raw.trim().parse().map_err(|_| Error::Field {
        field: name,
        value: raw.to_string(),
    })
}

fn color(name: &'static str, raw: &str) -> Result<u8, Error> {
    let v: i64 = field(name, raw)?;
    u8::try_from(v).map_err(|_| Error::ColorOutOfRange(v))
}

fn flag(name: &'static str, raw: &str) -> Result<bool, Error> {
    let v: i64 = field(name, raw)?;
    Ok(v != 0)
}

impl FromStr for ZoneDefinition {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end().splitn(MAX_FIELDS, ',').collect();
        if fields.len() < MIN_FIELDS {
            return Err(Error::FieldCount(fields.len()));
        }

        let p0 = na::Point2::new(field("p0x", fields[0])?, field("p0y", fields[1])?);
        let p1 = na::Point2::new(field("p1x", fields[2])?, field("p1y", fields[3])?);
        let rgb = [
            color("r", fields[4])?,
            color("g", fields[5])?,
            color("b", fields[6])?,
        ];

        let label = fields[10].trim();
        if label.is_empty() {
            return Err(Error::Field {
                field: "label",
                value: String::new(),
            });
        }

        let prohibited = fields
            .get(11)
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut zone = ZoneDefinition::new(p0, p1, flag("testsbelow", fields[7])?, label, prohibited)?;
        zone.color = rgb;
        zone.show = flag("show", fields[8])?;
        zone.showcar = flag("showcar", fields[9])?;

        Ok(zone)
    }
}

/// Parses a whole boundary resource. Any bad line rejects the whole text and
/// every bad line is reported with its 1-based number.
pub fn parse_zones(text: &str) -> Result<Vec<ZoneDefinition>, Error> {
    let mut zones = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match line.parse::<ZoneDefinition>() {
            Ok(zone) => zones.push(zone),
            Err(err) => errors.push(Error::Parse {
                line: idx + 1,
                reason: err.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(zones)
    } else {
        Err(Error::Rejected(errors))
    }
}
