//! Score fusion (§4.9 step 5): normalize each ranked list to `[0,1]` by its
//! own max score, then combine with configurable weights.

use std::cmp::Ordering;
use std::collections::HashMap;

use lorekeeper_core::config::FusionConfig;

/// A fused score for one id, retaining the source-list scores for tie-break
/// and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub id: String,
    pub fused: f32,
    pub lexical_raw: f32,
}

fn normalize(scores: &[(String, f32)]) -> HashMap<String, f32> {
    let max = scores.iter().map(|(_, s)| *s).fold(0.0f32, f32::max);
    if max <= 0.0 {
        return HashMap::new();
    }
    scores.iter().map(|(id, s)| (id.clone(), s / max)).collect()
}

/// Fuse lexical and vector result lists. Ids missing from a (non-empty) list
/// contribute 0 from that side; a list whose max score is zero is dropped
/// entirely and contributes nothing.
#[must_use]
pub fn fuse(
    lexical: &[(String, f32)],
    vector: &[(String, f32)],
    config: &FusionConfig,
) -> Vec<FusedScore> {
    let lex_norm = normalize(lexical);
    let vec_norm = normalize(vector);
    let lex_raw: HashMap<&str, f32> = lexical.iter().map(|(id, s)| (id.as_str(), *s)).collect();

    let mut ids: Vec<String> = lex_norm.keys().chain(vec_norm.keys()).cloned().collect();
    ids.sort();
    ids.dedup();

    let mut fused: Vec<FusedScore> = ids
        .into_iter()
        .map(|id| {
            let lex = lex_norm.get(&id).copied().unwrap_or(0.0);
            let vec_score = vec_norm.get(&id).copied().unwrap_or(0.0);
            let score = config.alpha_lexical * lex + config.beta_vector * vec_score;
            let lexical_raw = lex_raw.get(id.as_str()).copied().unwrap_or(0.0);
            FusedScore {
                id,
                fused: score,
                lexical_raw,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.fused
            .partial_cmp(&a.fused)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.lexical_raw.partial_cmp(&a.lexical_raw).unwrap_or(Ordering::Equal))
            .then_with(|| a.id.cmp(&b.id))
    });

    fused
}
