//! Score resolution
//!
//! Maps a selected word to a score delta and a continue/win verdict.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{GameState, Verdict};
use crate::config::{DecoyPolicy, GameConfig};

/// Why a selection was not resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("round is not active")]
    RoundInactive,
    #[error("token {0} is unknown or already resolved")]
    UnknownToken(u32),
}

/// Applied change for one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Actual change in score (0 when a decoy hits an empty score)
    pub score_delta: i32,
    pub verdict: Verdict,
}

/// Resolve a selection against the current state.
///
/// Rejected on an inactive round with the state untouched. Score stays within
/// `[0, win_score]`; reaching `win_score` yields [`Verdict::Win`].
pub fn resolve(
    state: GameState,
    text: &str,
    config: &GameConfig,
) -> Result<(GameState, Resolution), SelectError> {
    if !state.active {
        return Err(SelectError::RoundInactive);
    }

    if config.is_correct(text) {
        let score = (state.score + 1).min(config.win_score);
        let verdict = if score >= config.win_score {
            Verdict::Win
        } else {
            Verdict::Continue
        };
        let resolution = Resolution {
            score_delta: score as i32 - state.score as i32,
            verdict,
        };
        return Ok((GameState { score, ..state }, resolution));
    }

    let score = match config.decoy_policy {
        DecoyPolicy::Penalty => state.score.saturating_sub(1),
        DecoyPolicy::Ignore => state.score,
    };
    let resolution = Resolution {
        score_delta: score as i32 - state.score as i32,
        verdict: Verdict::Continue,
    };
    Ok((GameState { score, ..state }, resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DECOY: &str = "パリパリ";

    fn active_with_score(config: &GameConfig, score: u32) -> GameState {
        GameState {
            score,
            ..GameState::begin(config)
        }
    }

    #[test]
    fn test_correct_word_increments() {
        let config = GameConfig::default();
        let (state, res) = resolve(GameState::begin(&config), "バリバリ", &config).unwrap();
        assert_eq!(state.score(), 1);
        assert_eq!(res.score_delta, 1);
        assert_eq!(res.verdict, Verdict::Continue);
    }

    #[test]
    fn test_win_at_threshold() {
        let config = GameConfig::default();
        let state = active_with_score(&config, config.win_score - 1);
        let (state, res) = resolve(state, "バリバリ", &config).unwrap();
        assert_eq!(state.score(), config.win_score);
        assert_eq!(res.verdict, Verdict::Win);
    }

    #[test]
    fn test_decoy_at_zero_stays_zero() {
        let config = GameConfig::default();
        let (state, res) = resolve(GameState::begin(&config), DECOY, &config).unwrap();
        assert_eq!(state.score(), 0);
        assert_eq!(res.score_delta, 0);
        assert_eq!(res.verdict, Verdict::Continue);
    }

    #[test]
    fn test_decoy_penalty() {
        let config = GameConfig::default();
        let (state, res) = resolve(active_with_score(&config, 2), "ハリハリ", &config).unwrap();
        assert_eq!(state.score(), 1);
        assert_eq!(res.score_delta, -1);
    }

    #[test]
    fn test_decoy_ignored_without_penalty() {
        let config = GameConfig {
            decoy_policy: DecoyPolicy::Ignore,
            ..GameConfig::default()
        };
        let (state, res) = resolve(active_with_score(&config, 2), DECOY, &config).unwrap();
        assert_eq!(state.score(), 2);
        assert_eq!(res.score_delta, 0);
    }

    #[test]
    fn test_inactive_round_rejected() {
        let config = GameConfig::default();
        let idle = GameState::idle(&config);
        assert_eq!(
            resolve(idle, "バリバリ", &config),
            Err(SelectError::RoundInactive)
        );
    }

    proptest! {
        #[test]
        fn prop_score_stays_bounded(picks in proptest::collection::vec(0usize..3, 0..64)) {
            let config = GameConfig::default();
            let mut state = GameState::begin(&config);
            for pick in picks {
                let word = config.vocabulary[pick].clone();
                let (next, res) = resolve(state, &word, &config).unwrap();
                prop_assert!(next.score() <= config.win_score);
                prop_assert_eq!(next.score() as i32 - state.score() as i32, res.score_delta);
                state = next;
                if res.verdict == Verdict::Win {
                    // Round ends here; nothing may resolve afterwards.
                    state = state.finish();
                    prop_assert!(resolve(state, &word, &config).is_err());
                    break;
                }
            }
        }
    }
}
