// src/amphipathic.rs

use std::collections::BTreeMap;

use serde::Serialize;

const BASIC_AA: [char; 3] = ['K', 'R', 'H'];
const LIPOPHILIC_AA: [char; 8] = ['A', 'V', 'L', 'I', 'M', 'F', 'W', 'Y'];

/// Basic/lipophilic composition of a peptide. The coverage score is the
/// percentage of residues that are either basic or lipophilic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmphipathicProfile {
    pub amphipathic_score: f64,
    pub basic_count: usize,
    pub lipophilic_count: usize,
    pub basic_ratio: f64,
    pub lipophilic_ratio: f64,
    pub other_count: usize,
    pub other_ratio: f64,
    pub basic_details: BTreeMap<char, usize>,
    pub lipophilic_details: BTreeMap<char, usize>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn tally(sequence: &str, residues: &[char]) -> (usize, BTreeMap<char, usize>) {
    let mut details = BTreeMap::new();
    let mut total = 0;
    for aa in residues {
        let count = sequence.chars().filter(|c| c == aa).count();
        if count > 0 {
            details.insert(*aa, count);
            total += count;
        }
    }
    (total, details)
}

pub fn calculate(sequence: &str) -> AmphipathicProfile {
    if sequence.is_empty() {
        return AmphipathicProfile {
            amphipathic_score: 0.0,
            basic_count: 0,
            lipophilic_count: 0,
            basic_ratio: 0.0,
            lipophilic_ratio: 0.0,
            other_count: 0,
            other_ratio: 0.0,
            basic_details: BTreeMap::new(),
            lipophilic_details: BTreeMap::new(),
        };
    }

    let total_length = sequence.len() as f64;
    let (basic_count, basic_details) = tally(sequence, &BASIC_AA);
    let (lipophilic_count, lipophilic_details) = tally(sequence, &LIPOPHILIC_AA);
    let other_count = sequence.len() - basic_count - lipophilic_count;

    let basic_ratio = basic_count as f64 / total_length * 100.0;
    let lipophilic_ratio = lipophilic_count as f64 / total_length * 100.0;
    let other_ratio = other_count as f64 / total_length * 100.0;

    AmphipathicProfile {
        amphipathic_score: round1(basic_ratio + lipophilic_ratio),
        basic_count,
        lipophilic_count,
        basic_ratio: round1(basic_ratio),
        lipophilic_ratio: round1(lipophilic_ratio),
        other_count,
        other_ratio: round1(other_ratio),
        basic_details,
        lipophilic_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_combines_basic_and_lipophilic() {
        // 2 basic (K, R), 2 lipophilic (L, F), 4 other.
        let profile = calculate("KLRFSSGG");
        assert_eq!(profile.basic_count, 2);
        assert_eq!(profile.lipophilic_count, 2);
        assert_eq!(profile.other_count, 4);
        assert_eq!(profile.amphipathic_score, 50.0);
        assert_eq!(profile.basic_details.get(&'K'), Some(&1));
    }

    #[test]
    fn empty_sequence_scores_zero() {
        let profile = calculate("");
        assert_eq!(profile.amphipathic_score, 0.0);
        assert_eq!(profile.other_count, 0);
    }
}
