//! Query definition: what to ask the PI Web API for.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use piterm_types::{PitermError, Result};

/// Declares an enum whose variants map to the exact strings the PI Web
/// API expects, with case-insensitive parsing from user input.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The exact string the PI Web API expects on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Parse from user input, case-insensitively.
            pub fn parse(value: &str) -> Result<Self> {
                let lower = value.to_ascii_lowercase();
                $(
                    if lower == $wire.to_ascii_lowercase() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(PitermError::Validation(format!(
                    concat!("'{}' is not a valid ", stringify!($name)),
                    value
                )))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

wire_enum! {
    /// Which stream endpoint a query hits.
    QueryType {
        Recorded => "Recorded",
        Interpolated => "Interpolated",
        Summary => "Summary",
    }
}

wire_enum! {
    /// Aggregate computed by a summary query.
    SummaryType {
        Total => "Total",
        Average => "Average",
        Minimum => "Minimum",
        Maximum => "Maximum",
        StdDev => "StdDev",
        PopulationStdDev => "PopulationStdDev",
        Count => "Count",
    }
}

wire_enum! {
    /// Weighting applied when computing summary values.
    CalculationBasis {
        TimeWeighted => "TimeWeighted",
        EventWeighted => "EventWeighted",
        TimeWeightedContinuous => "TimeWeightedContinuous",
        TimeWeightedDiscrete => "TimeWeightedDiscrete",
        EventWeightedExcludeMostRecentEvent => "EventWeightedExcludeMostRecentEvent",
        EventWeightedExcludeEarliestEvent => "EventWeightedExcludeEarliestEvent",
        EventWeightedIncludeBothEnds => "EventWeightedIncludeBothEnds",
    }
}

wire_enum! {
    /// Which timestamp a summary interval reports.
    TimestampCalculation {
        Auto => "Auto",
        Earliest => "EarliestTime",
        MostRecent => "MostRecentTime",
    }
}

wire_enum! {
    /// Boundary handling for recorded queries.
    BoundaryType {
        Inside => "Inside",
        Outside => "Outside",
        Interpolated => "Interpolated",
    }
}

/// One query definition. The session keeps two of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub query_type: QueryType,
    pub api_base_url: String,
    pub pi_server: String,
    pub start_time: String,
    pub end_time: String,
    pub tags: Vec<String>,
    pub timezone: String,
    pub summary_type: SummaryType,
    pub calculation_basis: CalculationBasis,
    pub timestamp_calculation: TimestampCalculation,
    pub boundary_type: BoundaryType,
    pub interval: String,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            query_type: QueryType::Recorded,
            api_base_url: "https://piwebapi.domain.com".to_string(),
            pi_server: "piserver".to_string(),
            start_time: "*-1d".to_string(),
            end_time: "*".to_string(),
            tags: Vec::new(),
            timezone: "UTC".to_string(),
            summary_type: SummaryType::Average,
            calculation_basis: CalculationBasis::TimeWeighted,
            timestamp_calculation: TimestampCalculation::Auto,
            boundary_type: BoundaryType::Inside,
            interval: "1d".to_string(),
        }
    }
}

/// Split a user-supplied list on the first separator found.
///
/// Lists may be comma, semicolon, or pipe separated; a value containing
/// none of those is a single-element list.
pub fn split_list(input: &str) -> Vec<String> {
    let sep = if input.contains(',') {
        ','
    } else if input.contains(';') {
        ';'
    } else if input.contains('|') {
        '|'
    } else {
        return vec![input.to_string()];
    };
    input.split(sep).map(str::to_string).collect()
}
