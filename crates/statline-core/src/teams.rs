// Static MLB team directory: abbreviation -> full club name.
//
// Park factors are stored under full club names while hitter rows and
// opponent lists carry abbreviations, so every park-factor lookup goes
// through this table first.

use std::collections::HashMap;

/// Abbreviation/full-name pairs. Some clubs appear under more than one
/// abbreviation because data providers disagree (e.g. `CWS` vs `CHW`); each
/// abbreviation still maps to exactly one name.
const MLB_TEAMS: &[(&str, &str)] = &[
    ("ARI", "Arizona Diamondbacks"),
    ("AZ", "Arizona Diamondbacks"),
    ("ATL", "Atlanta Braves"),
    ("BAL", "Baltimore Orioles"),
    ("BOS", "Boston Red Sox"),
    ("CHC", "Chicago Cubs"),
    ("CWS", "Chicago White Sox"),
    ("CHW", "Chicago White Sox"),
    ("CIN", "Cincinnati Reds"),
    ("CLE", "Cleveland Guardians"),
    ("COL", "Colorado Rockies"),
    ("DET", "Detroit Tigers"),
    ("HOU", "Houston Astros"),
    ("KC", "Kansas City Royals"),
    ("KCR", "Kansas City Royals"),
    ("LAA", "Los Angeles Angels"),
    ("LAD", "Los Angeles Dodgers"),
    ("MIA", "Miami Marlins"),
    ("MIL", "Milwaukee Brewers"),
    ("MIN", "Minnesota Twins"),
    ("NYM", "New York Mets"),
    ("NYY", "New York Yankees"),
    ("OAK", "Oakland Athletics"),
    ("ATH", "Oakland Athletics"),
    ("PHI", "Philadelphia Phillies"),
    ("PIT", "Pittsburgh Pirates"),
    ("SD", "San Diego Padres"),
    ("SDP", "San Diego Padres"),
    ("SEA", "Seattle Mariners"),
    ("SF", "San Francisco Giants"),
    ("SFG", "San Francisco Giants"),
    ("STL", "St. Louis Cardinals"),
    ("TB", "Tampa Bay Rays"),
    ("TBR", "Tampa Bay Rays"),
    ("TEX", "Texas Rangers"),
    ("TOR", "Toronto Blue Jays"),
    ("WSH", "Washington Nationals"),
    ("WSN", "Washington Nationals"),
];

/// Immutable abbreviation -> full-name lookup. Build once at startup and
/// share by reference.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    by_abbrev: HashMap<String, String>,
}

impl TeamDirectory {
    /// The 30 MLB clubs, including the common alternate abbreviations.
    pub fn mlb() -> Self {
        Self::from_pairs(MLB_TEAMS.iter().copied())
    }

    /// Build a directory from explicit pairs. Abbreviations are matched
    /// case-insensitively; a later pair for the same abbreviation wins.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let by_abbrev = pairs
            .into_iter()
            .map(|(abbrev, name)| (normalize_abbrev(abbrev), name.to_string()))
            .collect();
        Self { by_abbrev }
    }

    /// Resolve an abbreviation to the full club name. Surrounding whitespace
    /// and case are ignored.
    pub fn full_name(&self, abbrev: &str) -> Option<&str> {
        self.by_abbrev.get(&normalize_abbrev(abbrev)).map(String::as_str)
    }
}

/// Canonical form of a team abbreviation as stored in the database: trimmed
/// and upper-cased.
pub fn normalize_abbrev(abbrev: &str) -> String {
    abbrev.trim().to_ascii_uppercase()
}
