//! Conflict resolution gate.
//!
//! Opened when both the local and the remote document changed since the last
//! sync point and their contents differ. While open, automatic pushes are
//! inert; only an explicit [`Resolution`] closes it.

use chrono::{DateTime, Utc};

use crate::models::DietState;

/// The user's choice for an open conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Overwrite the local state with the remote candidate.
    UseRemote,
    /// Overwrite the remote document with the local state.
    KeepLocal,
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "use-remote" => Ok(Resolution::UseRemote),
            "local" | "keep-local" => Ok(Resolution::KeepLocal),
            other => Err(format!("unknown resolution '{}' (expected remote or local)", other)),
        }
    }
}

/// What the UI shows while the gate is open.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictView {
    pub local: DietState,
    pub remote: DietState,
    pub remote_updated_at: Option<DateTime<Utc>>,
    pub local_updated_at_ms: i64,
}

/// The remote side of an open conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCandidate {
    pub state: DietState,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ConflictGate {
    candidate: Option<RemoteCandidate>,
    local_updated_at_ms: i64,
}

impl ConflictGate {
    pub fn is_open(&self) -> bool {
        self.candidate.is_some()
    }

    pub fn open(&mut self, candidate: RemoteCandidate, local_updated_at_ms: i64) {
        self.candidate = Some(candidate);
        self.local_updated_at_ms = local_updated_at_ms;
    }

    /// Closes the gate, handing back the remote candidate if it was open.
    pub fn close(&mut self) -> Option<RemoteCandidate> {
        self.candidate.take()
    }

    pub fn view(&self, local: &DietState) -> Option<ConflictView> {
        self.candidate.as_ref().map(|candidate| ConflictView {
            local: local.clone(),
            remote: candidate.state.clone(),
            remote_updated_at: Some(candidate.updated_at),
            local_updated_at_ms: self.local_updated_at_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> RemoteCandidate {
        RemoteCandidate {
            state: DietState::default().rename_diet("diet-1", "Remote"),
            updated_at: DateTime::from_timestamp_millis(1_800).unwrap(),
        }
    }

    #[test]
    fn test_gate_open_and_close() {
        let mut gate = ConflictGate::default();
        assert!(!gate.is_open());
        assert!(gate.view(&DietState::default()).is_none());

        gate.open(candidate(), 1_500);
        assert!(gate.is_open());
        let view = gate.view(&DietState::default()).unwrap();
        assert_eq!(view.local_updated_at_ms, 1_500);
        assert_eq!(view.remote.diets()[0].name, "Remote");

        assert!(gate.close().is_some());
        assert!(!gate.is_open());
        assert!(gate.close().is_none());
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!("remote".parse::<Resolution>(), Ok(Resolution::UseRemote));
        assert_eq!("Keep-Local".parse::<Resolution>(), Ok(Resolution::KeepLocal));
        assert!("both".parse::<Resolution>().is_err());
    }
}
