use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A point on the globe, optionally labelled.
///
/// Locations are plain values. They deliberately do not implement
/// `PartialEq`: two locations are compared by the distance between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Check that both coordinates are finite and inside their ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(ValidationError::InvalidCoordinate(format!(
                "{}, {} is not a finite coordinate",
                self.latitude, self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Parse `"lat,lon"` (whitespace around either number is allowed).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let (lat, lon) = input.split_once(',').ok_or_else(|| {
            ValidationError::InvalidCoordinate(format!("expected 'lat,lon', got '{input}'"))
        })?;
        let parse_part = |part: &str, field: &str| {
            part.trim().parse::<f64>().map_err(|e| ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("'{}': {e}", part.trim()),
            })
        };
        let location = Self::new(parse_part(lat, "latitude")?, parse_part(lon, "longitude")?);
        location.validate()?;
        Ok(location)
    }

    /// Human-readable label: name, then address, then the raw coordinates.
    pub fn label(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(address) = self.address.as_deref().filter(|a| !a.is_empty()) {
            return address.to_string();
        }
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_spaces() {
        let loc = Location::parse(" 40.7128 , -74.0060 ").unwrap();
        assert_eq!(loc.latitude, 40.7128);
        assert_eq!(loc.longitude, -74.0060);
    }

    #[test]
    fn parse_rejects_garbage_and_out_of_range() {
        assert!(Location::parse("40.7").is_err());
        assert!(Location::parse("north,south").is_err());
        assert!(Location::parse("91,0").is_err());
        assert!(Location::parse("0,181").is_err());
    }

    #[test]
    fn validate_rejects_nan() {
        assert!(Location::new(f64::NAN, 0.0).validate().is_err());
        assert!(Location::new(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn label_prefers_name_then_address() {
        let base = Location::new(40.71281, -74.00601);
        assert_eq!(base.label(), "40.7128, -74.0060");
        let addressed = base.clone().with_address("Broadway 1");
        assert_eq!(addressed.label(), "Broadway 1");
        assert_eq!(addressed.with_name("Office").label(), "Office");
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_string(&Location::new(1.0, 2.0)).unwrap();
        assert_eq!(json, r#"{"latitude":1.0,"longitude":2.0}"#);
    }
}
