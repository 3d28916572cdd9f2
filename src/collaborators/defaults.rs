//! Default crossover and diversity implementations.

use std::collections::HashSet;

use async_trait::async_trait;

use super::{Crossover, DiversityLevel, DiversityMetrics, DiversitySnapshot};
use crate::error::CollaboratorError;

/// Sentence-level crossover.
///
/// Splits both parents into sentences and produces two children by
/// alternating sentences, the first child starting from parent A and the
/// second from parent B. Leftover sentences of the longer parent are
/// appended to both.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceCrossover;

impl SentenceCrossover {
    fn sentences(text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if matches!(ch, '.' | '!' | '?' | '\n') {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
                current.clear();
            }
        }
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        out
    }

    fn interleave(first: &[String], second: &[String]) -> String {
        let len = first.len().max(second.len());
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            let source = if i % 2 == 0 { first } else { second };
            let fallback = if i % 2 == 0 { second } else { first };
            if let Some(s) = source.get(i).or_else(|| fallback.get(i)) {
                parts.push(s.as_str());
            }
        }
        parts.join(" ")
    }

    /// Recombines two prompts synchronously.
    pub fn recombine(&self, prompt_a: &str, prompt_b: &str) -> Vec<String> {
        let a = Self::sentences(prompt_a);
        let b = Self::sentences(prompt_b);
        if a.is_empty() || b.is_empty() {
            return vec![prompt_a.to_string(), prompt_b.to_string()];
        }
        vec![Self::interleave(&a, &b), Self::interleave(&b, &a)]
    }
}

#[async_trait]
impl Crossover for SentenceCrossover {
    async fn combine(
        &self,
        prompt_a: &str,
        prompt_b: &str,
    ) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.recombine(prompt_a, prompt_b))
    }
}

/// Word-set Jaccard diversity.
///
/// Pairwise distance is `1 - |A ∩ B| / |A ∪ B|` over lowercase word sets;
/// the snapshot reports the mean over all pairs and buckets it into a
/// [`DiversityLevel`] using ascending thresholds.
#[derive(Debug, Clone)]
pub struct TextDiversity {
    /// Upper bounds for critical, low, moderate and healthy; anything
    /// above the last is excellent.
    pub thresholds: [f64; 4],
}

impl Default for TextDiversity {
    fn default() -> Self {
        Self {
            thresholds: [0.1, 0.25, 0.45, 0.7],
        }
    }
}

impl TextDiversity {
    fn words(text: &str) -> HashSet<String> {
        text.split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }

    fn distance(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
        let union = a.union(b).count();
        if union == 0 {
            return 0.0;
        }
        1.0 - a.intersection(b).count() as f64 / union as f64
    }

    pub fn level_for(&self, diversity: f64) -> DiversityLevel {
        let [critical, low, moderate, healthy] = self.thresholds;
        if diversity < critical {
            DiversityLevel::Critical
        } else if diversity < low {
            DiversityLevel::Low
        } else if diversity < moderate {
            DiversityLevel::Moderate
        } else if diversity < healthy {
            DiversityLevel::Healthy
        } else {
            DiversityLevel::Excellent
        }
    }
}

impl DiversityMetrics for TextDiversity {
    fn calculate(&self, prompts: &[&str]) -> DiversitySnapshot {
        let sets: Vec<HashSet<String>> = prompts.iter().map(|p| Self::words(p)).collect();
        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                total += Self::distance(&sets[i], &sets[j]);
                pairs += 1;
            }
        }
        let pairwise_diversity = if pairs == 0 { 0.0 } else { total / pairs as f64 };
        DiversitySnapshot {
            level: self.level_for(pairwise_diversity),
            pairwise_diversity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_split() {
        let s = SentenceCrossover::sentences("One. Two!  Three?\nFour");
        assert_eq!(s, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[tokio::test]
    async fn test_crossover_alternates_sentences() {
        let children = SentenceCrossover
            .combine("A1. A2. A3.", "B1. B2.")
            .await
            .unwrap();
        assert_eq!(children, vec!["A1. B2. A3.", "B1. A2. A3."]);
    }

    #[test]
    fn test_crossover_empty_parent_returns_parents() {
        let children = SentenceCrossover.recombine("", "Only B.");
        assert_eq!(children, vec!["".to_string(), "Only B.".to_string()]);
    }

    #[test]
    fn test_identical_prompts_are_critical() {
        let snap = TextDiversity::default().calculate(&["same words here", "same words here"]);
        assert_eq!(snap.pairwise_diversity, 0.0);
        assert_eq!(snap.level, DiversityLevel::Critical);
    }

    #[test]
    fn test_disjoint_prompts_are_excellent() {
        let snap = TextDiversity::default().calculate(&["alpha beta", "gamma delta"]);
        assert!((snap.pairwise_diversity - 1.0).abs() < 1e-12);
        assert_eq!(snap.level, DiversityLevel::Excellent);
    }

    #[test]
    fn test_levels_are_monotonic() {
        let d = TextDiversity::default();
        let levels: Vec<DiversityLevel> = [0.0, 0.2, 0.3, 0.5, 0.9]
            .iter()
            .map(|&x| d.level_for(x))
            .collect();
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_single_prompt_has_no_pairs() {
        let snap = TextDiversity::default().calculate(&["lonely"]);
        assert_eq!(snap.pairwise_diversity, 0.0);
    }
}
