// Error type shared by the bullpen and park-factor computations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

/// Failures that terminate a single analysis request.
///
/// Data-store failures are carried as `Store` so the caller sees the
/// underlying query context unchanged.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("hitter {hitter_id} not found")]
    NotFound { hitter_id: i64 },

    #[error("no team name mapping for abbreviation(s): {}", .abbrevs.join(", "))]
    UnmappedTeam { abbrevs: Vec<String> },

    #[error("no park factor rating stored for {team}")]
    MissingParkFactor { team: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("data store error: {0:#}")]
    Store(anyhow::Error),
}

impl StatsError {
    pub fn unmapped(abbrev: impl Into<String>) -> Self {
        Self::UnmappedTeam {
            abbrevs: vec![abbrev.into()],
        }
    }

    pub fn missing_park_factor(team: impl Into<String>) -> Self {
        Self::MissingParkFactor { team: team.into() }
    }
}

impl From<anyhow::Error> for StatsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_team_lists_every_abbreviation() {
        let err = StatsError::UnmappedTeam {
            abbrevs: vec!["ZZZ".into(), "QQQ".into()],
        };
        assert_eq!(
            err.to_string(),
            "no team name mapping for abbreviation(s): ZZZ, QQQ"
        );
    }

    #[test]
    fn store_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("disk I/O error").context("failed to query park factors");
        let err = StatsError::from(inner);
        let msg = err.to_string();
        assert!(msg.contains("failed to query park factors"), "{msg}");
        assert!(msg.contains("disk I/O error"), "{msg}");
    }
}
