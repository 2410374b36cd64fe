use std::fmt;
use std::hash::Hash;

use crate::error::CoreError;

/// Identifies one independent ordered collection partition. Keys come from a
/// fixed set chosen at engine construction; the key's `Display` form names
/// the remote collection segment for that partition.
pub trait BucketKey: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Mon,
        Self::Tue,
        Self::Wed,
        Self::Thu,
        Self::Fri,
        Self::Sat,
        Self::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
            Self::Sun => "sun",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "mon" => Ok(Self::Mon),
            "tue" => Ok(Self::Tue),
            "wed" => Ok(Self::Wed),
            "thu" => Ok(Self::Thu),
            "fri" => Ok(Self::Fri),
            "sat" => Ok(Self::Sat),
            "sun" => Ok(Self::Sun),
            _ => Err(CoreError::InvalidData(format!("unknown weekday: {s}"))),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BucketKey for Weekday {}

/// Singleton key for editors whose collection is not partitioned (the
/// checklist creator uses one implicit bucket).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChecklistKey;

impl fmt::Display for ChecklistKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("items")
    }
}

impl BucketKey for ChecklistKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_codes_round_trip() {
        for day in Weekday::ALL {
            assert_eq!(Weekday::parse(day.as_str()).unwrap(), day);
        }
        assert!(Weekday::parse("monday").is_err());
    }

    #[test]
    fn all_covers_the_week_in_order() {
        assert_eq!(Weekday::ALL.len(), 7);
        assert_eq!(Weekday::ALL[0], Weekday::Mon);
        assert_eq!(Weekday::ALL[6], Weekday::Sun);
    }
}
