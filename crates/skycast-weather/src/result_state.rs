//! Outcome of the latest fetch, as seen by the display layer.

/// Latest fetch outcome. Exactly one variant is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultState<T> {
    /// No command issued yet
    #[default]
    Idle,
    Loading,
    Success(T),
    /// Human-readable, never empty
    Error(String),
}

impl<T> ResultState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// True for `Success` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_is_idle() {
        let state: ResultState<u32> = ResultState::default();
        assert_eq!(state, ResultState::Idle);
        assert!(!state.is_loading());
        assert!(!state.is_terminal());
    }

    #[test]
    fn terminal_variants() {
        assert!(ResultState::Success(1).is_terminal());
        assert!(ResultState::<u32>::Error("boom".into()).is_terminal());
        assert!(!ResultState::<u32>::Loading.is_terminal());
    }

    #[test]
    fn accessors() {
        assert_eq!(ResultState::Success(7).success(), Some(&7));
        assert_eq!(ResultState::<u32>::Loading.success(), None);
        assert_eq!(
            ResultState::<u32>::Error("Failed to find location".into()).error(),
            Some("Failed to find location")
        );
    }
}
