//! Text polarity scoring

use regex::Regex;
use std::collections::HashMap;

use crate::error::{EngineError, Result};

/// Maps free text to a polarity in [-1, 1]
#[cfg_attr(test, mockall::automock)]
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// Word lists for the lexicon scorer
mod lexicon {
    pub const POSITIVE: &[(&str, f64)] = &[
        ("amazing", 0.7),
        ("beat", 0.4),
        ("best", 0.6),
        ("boost", 0.4),
        ("breakout", 0.5),
        ("bull", 0.6),
        ("bullish", 0.8),
        ("buy", 0.4),
        ("calls", 0.3),
        ("excellent", 0.8),
        ("gain", 0.5),
        ("gains", 0.5),
        ("good", 0.5),
        ("great", 0.7),
        ("green", 0.4),
        ("growth", 0.5),
        ("happy", 0.5),
        ("love", 0.6),
        ("moon", 0.7),
        ("optimism", 0.5),
        ("optimistic", 0.5),
        ("outperform", 0.6),
        ("positive", 0.5),
        ("profit", 0.5),
        ("profits", 0.5),
        ("rally", 0.6),
        ("record", 0.3),
        ("recovery", 0.4),
        ("rocket", 0.6),
        ("solid", 0.4),
        ("strong", 0.5),
        ("surge", 0.6),
        ("tendies", 0.5),
        ("undervalued", 0.5),
        ("up", 0.2),
        ("upgrade", 0.5),
        ("win", 0.5),
        ("winning", 0.5),
    ];

    pub const NEGATIVE: &[(&str, f64)] = &[
        ("awful", -0.8),
        ("bad", -0.5),
        ("bagholder", -0.6),
        ("bankrupt", -0.9),
        ("bankruptcy", -0.9),
        ("bear", -0.6),
        ("bearish", -0.8),
        ("collapse", -0.8),
        ("crash", -0.8),
        ("decline", -0.5),
        ("disappointing", -0.6),
        ("down", -0.2),
        ("downgrade", -0.5),
        ("drop", -0.4),
        ("dump", -0.6),
        ("fall", -0.4),
        ("fear", -0.5),
        ("fraud", -0.9),
        ("hate", -0.6),
        ("lawsuit", -0.5),
        ("lose", -0.5),
        ("losing", -0.5),
        ("loss", -0.5),
        ("losses", -0.5),
        ("miss", -0.4),
        ("negative", -0.5),
        ("overvalued", -0.5),
        ("plunge", -0.7),
        ("puts", -0.3),
        ("recession", -0.6),
        ("red", -0.4),
        ("risk", -0.3),
        ("scam", -0.8),
        ("sell", -0.4),
        ("tank", -0.6),
        ("tanking", -0.6),
        ("terrible", -0.8),
        ("underperform", -0.6),
        ("weak", -0.5),
        ("worried", -0.4),
        ("worst", -0.7),
    ];

    pub const INTENSIFIERS: &[(&str, f64)] = &[
        ("absolutely", 1.3),
        ("extremely", 1.5),
        ("highly", 1.3),
        ("incredibly", 1.5),
        ("really", 1.2),
        ("so", 1.2),
        ("super", 1.3),
        ("totally", 1.2),
        ("very", 1.3),
    ];

    pub const NEGATIONS: &[&str] = &[
        "cannot", "hardly", "neither", "never", "no", "nobody", "none", "nor", "not", "nothing",
        "without",
    ];
}

/// How many preceding tokens a negation reaches across
const NEGATION_SCOPE: usize = 3;
const NEGATION_FACTOR: f64 = -0.5;

/// Lexicon-based scorer with intensifier and negation handling
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    token: Regex,
    words: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
}

impl LexiconScorer {
    pub fn new() -> Result<Self> {
        let token = Regex::new(r"[a-z][a-z0-9']*")
            .map_err(|e| EngineError::Other(format!("invalid token pattern: {e}")))?;

        Ok(Self {
            token,
            words: lexicon::POSITIVE
                .iter()
                .chain(lexicon::NEGATIVE)
                .copied()
                .collect(),
            intensifiers: lexicon::INTENSIFIERS.iter().copied().collect(),
        })
    }

    fn is_negation(token: &str) -> bool {
        lexicon::NEGATIONS.contains(&token) || token.ends_with("n't")
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self.token.find_iter(&lowered).map(|m| m.as_str()).collect();

        let matched: Vec<f64> = tokens
            .iter()
            .enumerate()
            .filter_map(|(i, token)| {
                let base = *self.words.get(*token)?;
                let mut value = base;

                if let Some(factor) = i
                    .checked_sub(1)
                    .and_then(|prev| self.intensifiers.get(tokens[prev]))
                {
                    value *= factor;
                }

                let scope = &tokens[i.saturating_sub(NEGATION_SCOPE)..i];
                if scope.iter().any(|t| Self::is_negation(t)) {
                    value *= NEGATION_FACTOR;
                }

                Some(value)
            })
            .collect();

        if matched.is_empty() {
            return 0.0;
        }

        let mean = matched.iter().sum::<f64>() / matched.len() as f64;
        mean.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> LexiconScorer {
        LexiconScorer::new().unwrap()
    }

    #[test]
    fn test_no_matches_is_neutral() {
        assert_eq!(scorer().polarity(""), 0.0);
        assert_eq!(scorer().polarity("Earnings call is on Thursday"), 0.0);
    }

    #[test]
    fn test_single_words() {
        assert!((scorer().polarity("Great quarter") - 0.7).abs() < 1e-12);
        assert!((scorer().polarity("This is a SCAM") + 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_negation_flips_and_dampens() {
        assert!((scorer().polarity("not great") + 0.35).abs() < 1e-12);
        assert!((scorer().polarity("the stock is not looking good") + 0.25).abs() < 1e-12);
        assert!((scorer().polarity("it isn't bad") - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_intensifier_scales() {
        assert!((scorer().polarity("very strong") - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(scorer().polarity("extremely bullish"), 1.0);
        assert_eq!(scorer().polarity("extremely bankrupt"), -1.0);
    }

    #[test]
    fn test_mixed_text_averages() {
        assert!(scorer().polarity("bullish then crash").abs() < 1e-12);
    }
}
