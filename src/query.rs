// src/query.rs
//! Query expansion: turn a few seed phrases into a bounded, deduplicated
//! list of provider-flavored query variants. Pure function, no error paths.

use std::collections::HashSet;

/// Fixed platform-tag vocabulary appended to each seed, in emission order.
const PLATFORM_TAGS: &[&str] = &["reddit", "youtube", "blog", "2024", "2025"];

/// Fixed synonym vocabulary combined with the niche.
const SYNONYMS: &[&str] = &[
    "growth strategies",
    "follower growth case study",
    "engagement tactics",
    "content strategy",
    "audience building",
];

/// Expand seeds into at most `max_queries` variants, in order: the seeds
/// themselves, each seed with a platform tag, each synonym with the niche.
/// First-seen order is preserved; duplicates are dropped.
pub fn expand(seed_queries: &[String], niche: &str, max_queries: usize) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();

    let mut push = |q: String, out: &mut Vec<String>| {
        let key = q.trim().to_ascii_lowercase();
        if !key.is_empty() && seen.insert(key) {
            out.push(q.trim().to_string());
        }
    };

    for seed in seed_queries {
        if out.len() >= max_queries {
            return out;
        }
        push(seed.clone(), &mut out);
    }

    for seed in seed_queries {
        for tag in PLATFORM_TAGS {
            if out.len() >= max_queries {
                return out;
            }
            push(format!("{seed} {tag}"), &mut out);
        }
    }

    let niche = niche.trim();
    if !niche.is_empty() {
        for syn in SYNONYMS {
            if out.len() >= max_queries {
                return out;
            }
            push(format!("{niche} {syn}"), &mut out);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seeds_come_first_in_order() {
        let out = expand(&seeds(&["a", "b"]), "fitness", 50);
        assert_eq!(&out[..2], &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn no_duplicates_and_bounded() {
        let out = expand(&seeds(&["fitness tips", "Fitness Tips", "fitness tips "]), "fitness", 12);
        assert!(out.len() <= 12);
        let mut lowered: Vec<String> = out.iter().map(|s| s.to_ascii_lowercase()).collect();
        lowered.sort();
        lowered.dedup();
        assert_eq!(lowered.len(), out.len(), "duplicates in {out:?}");
    }

    #[test]
    fn truncates_exactly_at_max() {
        let out = expand(&seeds(&["a", "b", "c"]), "fitness", 4);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn empty_input_yields_niche_synonyms_only() {
        let out = expand(&[], "fitness", 3);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|q| q.starts_with("fitness")));
    }

    #[test]
    fn fully_empty_input_is_empty_output() {
        assert!(expand(&[], "", 10).is_empty());
    }
}
