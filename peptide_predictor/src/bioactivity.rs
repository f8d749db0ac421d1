// src/bioactivity.rs

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Result};
use rayon::prelude::*;
use serde_json::json;
use tracing::debug;

use crate::api_handler::ApiHandler;
use crate::models::{
    classify_motif, MotifClass, PeptideCandidate, ScoreSource, OPTIMAL_PEPTIDE_MAX_LENGTH,
    OPTIMAL_PEPTIDE_MIN_LENGTH,
};

pub const PEPTIDERANKER_API_URL: &str = "http://peptideranker.ilincs.org/api/predict";
pub const PEPTIDERANKER_TIMEOUT: Duration = Duration::from_secs(10);

const HYDROPHOBIC_AA: &str = "ALIVMFWP";
const HYDROPHOBICITY_WEIGHT: f64 = 30.0;
const CHARGE_BONUS: f64 = 10.0;
const OPTIMAL_LENGTH_BONUS: f64 = 35.0;
const SHORT_LENGTH_PENALTY: f64 = 10.0;
const LONG_LENGTH_PENALTY: f64 = 15.0;
const CYSTEINE_BONUS: f64 = 8.0;
const PROLINE_BONUS: f64 = 7.0;
const PROLINE_PENALTY: f64 = 5.0;
const MAX_PROLINES: usize = 2;
const DIVERSITY_BONUS: f64 = 5.0;
const MIN_DISTINCT_RESIDUES: usize = 6;

const AMIDATION_CONTEXT_BONUS: f64 = 25.0;
const AMIDATION_CHAIN_MOTIF_BONUS: f64 = 10.0;
const KNOWN_MOTIF_BONUS: f64 = 15.0;
const TERMINAL_NO_AMIDATION_PENALTY: f64 = 20.0;
const SHORT_UNREMARKABLE_PENALTY: f64 = 15.0;
const OVER_BASIC_PENALTY: f64 = 10.0;

/// Literature motif cores whose presence marks a known bioactive family.
const KNOWN_MOTIF_FAMILIES: [(&str, &str); 3] = [
    ("YGGF", "opioid"),
    ("HFRW", "melanocortin"),
    ("FMRF", "RFamide"),
];

/// Remote scorer seam. Implementations return a probability in [0, 1];
/// any error degrades the candidate to the heuristic path.
pub trait BioactivityOracle: Sync {
    fn predict(&self, peptide: &str) -> Result<f64>;
}

/// Client for a PeptideRanker-style prediction endpoint.
pub struct PeptideRankerClient {
    api: ApiHandler,
}

impl PeptideRankerClient {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            api: ApiHandler::new(url, PEPTIDERANKER_TIMEOUT)?,
        })
    }
}

impl BioactivityOracle for PeptideRankerClient {
    fn predict(&self, peptide: &str) -> Result<f64> {
        if peptide.len() < 2 {
            bail!("peptide too short to score remotely");
        }
        let response = self.api.post_json("", &json!({ "sequence": peptide }))?;
        match response.get("score").and_then(|s| s.as_f64()) {
            Some(score) => Ok(score),
            None => bail!("response carries no score field"),
        }
    }
}

/// Physicochemical fallback score in [0, 100]. The empty sequence is 0.
pub fn calculate_heuristic(peptide: &str) -> f64 {
    if peptide.is_empty() {
        return 0.0;
    }

    let length = peptide.len();
    let mut score = 0.0;

    let hydro_count = peptide.chars().filter(|c| HYDROPHOBIC_AA.contains(*c)).count();
    score += hydro_count as f64 / length as f64 * HYDROPHOBICITY_WEIGHT;

    if peptide.chars().any(|c| matches!(c, 'K' | 'R' | 'H')) {
        score += CHARGE_BONUS;
    }
    if peptide.chars().any(|c| matches!(c, 'D' | 'E')) {
        score += CHARGE_BONUS;
    }

    if (OPTIMAL_PEPTIDE_MIN_LENGTH..=OPTIMAL_PEPTIDE_MAX_LENGTH).contains(&length) {
        score += OPTIMAL_LENGTH_BONUS;
    } else if length < OPTIMAL_PEPTIDE_MIN_LENGTH {
        score -= SHORT_LENGTH_PENALTY;
    } else if length > 100 {
        score -= LONG_LENGTH_PENALTY;
    }

    if peptide.contains('C') {
        score += CYSTEINE_BONUS;
    }

    let proline_count = peptide.chars().filter(|c| *c == 'P').count();
    if proline_count <= MAX_PROLINES {
        score += PROLINE_BONUS;
    } else {
        score -= PROLINE_PENALTY;
    }

    let distinct: HashSet<char> = peptide.chars().collect();
    if distinct.len() >= MIN_DISTINCT_RESIDUES {
        score += DIVERSITY_BONUS;
    }

    score.clamp(0.0, 100.0)
}

fn followed_by_basic(full_sequence: &str, end: usize) -> bool {
    matches!(full_sequence.as_bytes().get(end), Some(b'K' | b'R'))
}

fn has_amidation_signature(candidate: &PeptideCandidate) -> bool {
    candidate.sequence.ends_with('G')
        || classify_motif(&candidate.motif_c) == Some(MotifClass::AmidationTerminal)
}

/// Biological-context layer on top of the heuristic: amidation readiness,
/// known family motifs, and composition penalties.
fn context_adjustments(candidate: &PeptideCandidate, full_sequence: &str) -> f64 {
    let body = &candidate.sequence;
    let mut adjustment = 0.0;

    if body.ends_with('G') && followed_by_basic(full_sequence, candidate.end) {
        adjustment += AMIDATION_CONTEXT_BONUS;
        if classify_motif(&candidate.motif_c) == Some(MotifClass::AmidationTerminal) {
            adjustment += AMIDATION_CHAIN_MOTIF_BONUS;
        }
    }

    for (motif, family) in KNOWN_MOTIF_FAMILIES {
        if body.contains(motif) {
            debug!("candidate at {} carries {family} motif {motif}", candidate.start);
            adjustment += KNOWN_MOTIF_BONUS;
        }
    }

    if candidate.end == full_sequence.len() && !body.ends_with('G') {
        adjustment -= TERMINAL_NO_AMIDATION_PENALTY;
    }

    if body.len() < OPTIMAL_PEPTIDE_MIN_LENGTH && !has_amidation_signature(candidate) {
        adjustment -= SHORT_UNREMARKABLE_PENALTY;
    }

    let basic_count = body.chars().filter(|c| matches!(c, 'K' | 'R')).count();
    if basic_count * 2 > body.len() {
        adjustment -= OVER_BASIC_PENALTY;
    }

    adjustment
}

/// Scores one candidate: remote first, heuristic plus context on any
/// failure. Always clamped to [0, 100].
pub fn score_candidate(
    candidate: &PeptideCandidate,
    full_sequence: &str,
    oracle: Option<&dyn BioactivityOracle>,
) -> (f64, ScoreSource) {
    if let Some(oracle) = oracle {
        match oracle.predict(&candidate.sequence) {
            Ok(probability) => {
                return ((probability * 100.0).clamp(0.0, 100.0), ScoreSource::Remote);
            }
            Err(e) => {
                debug!("remote scoring failed for candidate at {}: {e}", candidate.start);
            }
        }
    }
    let score = calculate_heuristic(&candidate.sequence) + context_adjustments(candidate, full_sequence);
    (score.clamp(0.0, 100.0), ScoreSource::Heuristic)
}

/// Scatter/gather over the candidate batch: one scoring task per candidate,
/// each failure degrading only its own candidate to the heuristic path.
pub fn score_batch(
    candidates: &mut [PeptideCandidate],
    full_sequence: &str,
    oracle: Option<&dyn BioactivityOracle>,
) {
    let scores: Vec<(f64, ScoreSource)> = candidates
        .par_iter()
        .map(|candidate| score_candidate(candidate, full_sequence, oracle))
        .collect();
    for (candidate, (score, source)) in candidates.iter_mut().zip(scores) {
        candidate.bioactivity_score = score;
        candidate.bioactivity_source = source;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionMode;

    struct FixedOracle(f64);
    impl BioactivityOracle for FixedOracle {
        fn predict(&self, _peptide: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingOracle;
    impl BioactivityOracle for FailingOracle {
        fn predict(&self, _peptide: &str) -> Result<f64> {
            bail!("connection refused")
        }
    }

    fn candidate(full: &str, start: usize, end: usize, motif_c: &str) -> PeptideCandidate {
        PeptideCandidate::new(full, start, end, "KR".into(), motif_c.into(), DetectionMode::Permissive)
    }

    #[test]
    fn empty_sequence_scores_zero() {
        assert_eq!(calculate_heuristic(""), 0.0);
    }

    #[test]
    fn heuristic_stays_clamped() {
        assert!((0.0..=100.0).contains(&calculate_heuristic("A")));
        assert!((0.0..=100.0).contains(&calculate_heuristic(&"ALIVMFW".repeat(20))));
        assert!((0.0..=100.0).contains(&calculate_heuristic("PPPP")));
    }

    #[test]
    fn heuristic_rewards_optimal_composition() {
        // 10 aa, hydrophobic mix, both charges, a cysteine, diverse.
        let strong = calculate_heuristic("ALKDECFWIV");
        // 3 aa homopolymer.
        let weak = calculate_heuristic("GGG");
        assert!(strong > weak);
        assert!(strong > 60.0);
    }

    #[test]
    fn proline_overuse_flips_bonus_to_penalty() {
        let modest = calculate_heuristic("AAPAAPAAA");
        let heavy = calculate_heuristic("AAPAPPAAP");
        assert!(modest > heavy);
    }

    #[test]
    fn remote_score_wins_when_available() {
        let full = "AAAAAGALKDECFWIVAAAA";
        let c = candidate(full, 5, 16, "KR");
        let oracle = FixedOracle(0.8);
        let (score, source) = score_candidate(&c, full, Some(&oracle as &dyn BioactivityOracle));
        assert_eq!(source, ScoreSource::Remote);
        assert!((score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn remote_failure_degrades_to_heuristic() {
        let full = "AAAAAGALKDECFWIVAAAA";
        let c = candidate(full, 5, 16, "KR");
        let (score, source) =
            score_candidate(&c, full, Some(&FailingOracle as &dyn BioactivityOracle));
        assert_eq!(source, ScoreSource::Heuristic);
        let (expected, _) = score_candidate(&c, full, None);
        assert_eq!(score, expected);
    }

    #[test]
    fn amidation_context_raises_score() {
        let full = "AAAAAFLWIDEGKRAA";
        let amidated = candidate(full, 5, 12, "KR"); // FLWIDEG followed by KR
        let plain = candidate(full, 5, 11, "KR"); // FLWIDE followed by G
        let (with_bonus, _) = score_candidate(&amidated, full, None);
        let (without, _) = score_candidate(&plain, full, None);
        assert!(with_bonus > without);
    }

    #[test]
    fn known_family_motif_raises_score() {
        let full = "AAAAAYGGFMRFAAAAAAAA";
        let opioid = candidate(full, 5, 12, "KR"); // YGGFMRF
        let scrambled = candidate(full, 5, 12, "KR");
        let mut shuffled = scrambled.clone();
        shuffled.sequence = "YGFGMRF".to_string();
        let (hit, _) = score_candidate(&opioid, full, None);
        let (miss, _) = score_candidate(&shuffled, full, None);
        assert!(hit > miss);
    }

    #[test]
    fn terminal_candidate_without_glycine_is_penalized() {
        let full = "AAAAAGGGGGFLWIDEK";
        let terminal = candidate(full, 10, 17, "END"); // FLWIDEK at protein end
        let internal = candidate(full, 5, 12, "KR");
        let mut internal = internal;
        internal.sequence = terminal.sequence.clone();
        let (t, _) = score_candidate(&terminal, full, None);
        let (i, _) = score_candidate(&internal, full, None);
        assert!(t < i);
    }

    #[test]
    fn over_basic_candidate_is_penalized() {
        let balanced = calculate_heuristic("KRAAGDE");
        let c_full = "KRKRKAA";
        let over_basic = candidate(c_full, 0, 5, "KR");
        let (score, _) = score_candidate(&over_basic, c_full, None);
        assert!(score < balanced + 50.0); // sanity: penalty keeps it bounded
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn batch_scoring_fills_every_candidate() {
        let full = "AAAAAGALKDECFWIVAAKRFLWIDEGAA";
        let mut batch = vec![candidate(full, 5, 16, "KR"), candidate(full, 20, 27, "KR")];
        score_batch(&mut batch, full, Some(&FailingOracle as &dyn BioactivityOracle));
        for c in &batch {
            assert_eq!(c.bioactivity_source, ScoreSource::Heuristic);
            assert!((0.0..=100.0).contains(&c.bioactivity_score));
        }
    }
}
