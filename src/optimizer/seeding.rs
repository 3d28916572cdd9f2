//! Initial population construction and the fallback text mutation.

use std::collections::HashSet;

use rand::Rng;

/// Prompt used when the caller supplies no seeds.
pub const DEFAULT_PROMPT: &str =
    "You are a careful assistant. Read the task, work through it step by step, and give a precise final answer.";

/// Instruction suffixes appended to seeds to create variants.
pub const INSTRUCTION_SUFFIXES: &[&str] = &[
    "Think step by step before answering.",
    "Be concise and precise.",
    "Double-check your answer before responding.",
    "Explain your reasoning briefly, then state the answer.",
    "Focus on the exact requirements of the task.",
    "If the task is ambiguous, state your assumptions.",
];

/// Seeds and variants making up the initial population.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeedPlan {
    pub(crate) seeds: Vec<String>,
    /// `(prompt, index into seeds)` pairs.
    pub(crate) variants: Vec<(String, usize)>,
}

/// Builds exactly `size` distinct prompts from `seeds`.
///
/// Seeds are trimmed and de-duplicated; empty seeds are dropped. Extra seeds
/// beyond `size` are ignored. Missing slots are filled round-robin with
/// suffix variants of the seeds.
pub(crate) fn plan(seeds: &[String], size: usize) -> SeedPlan {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> = seeds
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .take(size)
        .collect();
    if unique.is_empty() && size > 0 {
        seen.insert(DEFAULT_PROMPT.to_string());
        unique.push(DEFAULT_PROMPT.to_string());
    }

    let mut variants = Vec::new();
    let mut round = 0usize;
    while unique.len() + variants.len() < size {
        for (idx, seed) in unique.iter().enumerate() {
            if unique.len() + variants.len() >= size {
                break;
            }
            let text = variant_text(seed, round);
            if seen.insert(text.clone()) {
                variants.push((text, idx));
            }
        }
        round += 1;
    }

    SeedPlan {
        seeds: unique,
        variants,
    }
}

fn variant_text(seed: &str, round: usize) -> String {
    let suffix = INSTRUCTION_SUFFIXES[round % INSTRUCTION_SUFFIXES.len()];
    let cycle = round / INSTRUCTION_SUFFIXES.len();
    if cycle == 0 {
        format!("{seed}\n\n{suffix}")
    } else {
        format!("{seed}\n\n{suffix} (variant {})", cycle + 1)
    }
}

/// Appends a random instruction suffix not already present in `prompt`.
///
/// Used as the mutation operator when no reflector is configured.
pub(crate) fn perturb<R: Rng>(prompt: &str, rng: &mut R) -> String {
    let fresh: Vec<&str> = INSTRUCTION_SUFFIXES
        .iter()
        .copied()
        .filter(|s| !prompt.contains(s))
        .collect();
    if fresh.is_empty() {
        let suffix = INSTRUCTION_SUFFIXES[rng.random_range(0..INSTRUCTION_SUFFIXES.len())];
        return format!("{prompt}\n\n{suffix} (revision {})", rng.random_range(2..1000u32));
    }
    let suffix = fresh[rng.random_range(0..fresh.len())];
    format!("{prompt}\n\n{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_size_from_seeds() {
        let plan = plan(&strings(&["a", "b", "c"]), 3);
        assert_eq!(plan.seeds, strings(&["a", "b", "c"]));
        assert!(plan.variants.is_empty());
    }

    #[test]
    fn test_extra_seeds_truncated() {
        let plan = plan(&strings(&["a", "b", "c"]), 2);
        assert_eq!(plan.seeds, strings(&["a", "b"]));
    }

    #[test]
    fn test_dedup_and_trim() {
        let plan = plan(&strings(&[" a ", "a", "", "b"]), 2);
        assert_eq!(plan.seeds, strings(&["a", "b"]));
    }

    #[test]
    fn test_variants_round_robin() {
        let plan = plan(&strings(&["a", "b"]), 6);
        assert_eq!(plan.seeds.len(), 2);
        assert_eq!(plan.variants.len(), 4);
        let parents: Vec<usize> = plan.variants.iter().map(|(_, p)| *p).collect();
        assert_eq!(parents, vec![0, 1, 0, 1]);
        assert!(plan.variants[0].0.starts_with("a\n\n"));
    }

    #[test]
    fn test_no_seeds_uses_default() {
        let plan = plan(&[], 4);
        assert_eq!(plan.seeds, vec![DEFAULT_PROMPT.to_string()]);
        assert_eq!(plan.variants.len(), 3);
    }

    #[test]
    fn test_all_prompts_distinct_for_large_sizes() {
        let plan = plan(&strings(&["only"]), 40);
        let mut all: HashSet<String> = plan.seeds.iter().cloned().collect();
        for (text, _) in &plan.variants {
            assert!(all.insert(text.clone()), "duplicate variant: {text}");
        }
        assert_eq!(all.len(), 40);
    }

    #[test]
    fn test_perturb_adds_new_suffix() {
        let mut rng = StdRng::seed_from_u64(3);
        let mutated = perturb("base", &mut rng);
        assert!(mutated.starts_with("base\n\n"));
        assert!(INSTRUCTION_SUFFIXES.iter().any(|s| mutated.contains(s)));

        let saturated = INSTRUCTION_SUFFIXES.join(" ");
        let again = perturb(&saturated, &mut rng);
        assert_ne!(again, saturated);
        assert!(again.contains("(revision"));
    }
}
