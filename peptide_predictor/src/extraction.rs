// src/extraction.rs

use std::cmp::Ordering;

use crate::models::{CleavageSite, DetectionMode, MotifClass, PeptideCandidate, Provenance};

const MIN_BODY_LENGTH: usize = 4;

// Combinatorial enumeration bounds and confidence weights.
const COMBINATORIAL_MIN_LENGTH: usize = 4;
const COMBINATORIAL_MAX_LENGTH: usize = 50;
const N_TERMINAL_STRONG_BONUS: f64 = 50.0;
const N_TERMINAL_SINGLE_BONUS: f64 = 15.0;
const C_TERMINAL_AMIDATION_BONUS: f64 = 50.0;
const TERMINAL_SIGNATURE_BONUS: f64 = 30.0;
const TERMINAL_GLYCINE_BONUS: f64 = 15.0;
const AMIDATION_CONFIDENCE_FLOOR: f64 = 90.0;
const MIN_CONFIDENCE: f64 = 30.0;
const MAX_OVERLAP_FRACTION: f64 = 0.70;
const MAX_CANDIDATES: usize = 50;

// PCSK5/6/7 products: the mature domain runs to the protein's end, the
// prodomain fills the span between signal and motif.
const MIN_MATURE_LENGTH: usize = 10;
const MIN_PRODOMAIN_LENGTH: usize = 20;

/// Label for the boundary preceding the first candidate.
pub const SIGNAL_BOUNDARY: &str = "SIGNAL";
/// Label for the boundary after the trailing candidate.
pub const END_BOUNDARY: &str = "END";

/// Partitions `sequence` into candidate fragments using `sites`. The
/// strict/permissive modes fail closed (empty result) below `min_sites`.
pub fn extract(
    sequence: &str,
    sites: &[CleavageSite],
    signal_length: usize,
    min_spacing: usize,
    min_sites: usize,
    mode: DetectionMode,
) -> Vec<PeptideCandidate> {
    match mode {
        DetectionMode::Strict | DetectionMode::Permissive => {
            if sites.len() < min_sites {
                return Vec::new();
            }
            sequential_walk(sequence, sites, signal_length, min_spacing, mode)
        }
        DetectionMode::UltraPermissive => combinatorial(sequence, sites, mode),
        DetectionMode::Pcsk567 => domain_split(sequence, sites, signal_length, mode),
    }
}

/// Cursor walk: each site's `index` closes the candidate ending there (motif
/// residues are excised), and the cursor jumps past the motif. In strict
/// mode a rejected gap leaves the cursor in place, absorbing the motif into
/// the next body.
fn sequential_walk(
    sequence: &str,
    sites: &[CleavageSite],
    signal_length: usize,
    min_spacing: usize,
    mode: DetectionMode,
) -> Vec<PeptideCandidate> {
    let strict = mode == DetectionMode::Strict;
    let mut peptides = Vec::new();
    let mut cursor = signal_length;
    let mut motif_n = SIGNAL_BOUNDARY.to_string();

    for site in sites {
        if site.index < cursor {
            continue;
        }
        let gap = site.index - cursor;
        let accepted = if strict {
            gap >= min_spacing && gap >= MIN_BODY_LENGTH
        } else {
            gap > 0
        };
        if accepted {
            peptides.push(PeptideCandidate::new(
                sequence,
                cursor,
                site.index,
                motif_n.clone(),
                site.motif.clone(),
                mode,
            ));
        }
        if accepted || !strict {
            cursor = site.position;
            motif_n = site.motif.clone();
        }
    }

    let tail = sequence.len().saturating_sub(cursor);
    let tail_ok = if strict { tail >= MIN_BODY_LENGTH } else { tail > 0 };
    if tail_ok {
        peptides.push(PeptideCandidate::new(
            sequence,
            cursor,
            sequence.len(),
            motif_n,
            END_BOUNDARY.to_string(),
            mode,
        ));
    }

    peptides
}

fn ends_with_amidation_signature(body: &str) -> bool {
    let bytes = body.as_bytes();
    let tail_matches = |n: usize| {
        bytes.len() >= n
            && matches!(bytes[bytes.len() - n], b'K' | b'R')
            && matches!(bytes[bytes.len() - n + 1], b'F' | b'Y')
    };
    // ...[KR][FY] or ...[KR][FY]G
    tail_matches(2) || (bytes.ends_with(b"G") && tail_matches(3))
}

fn length_band_bonus(length: usize) -> f64 {
    match length {
        5..=15 => 20.0,
        16..=30 => 10.0,
        31..=100 => 0.0,
        _ if length > 100 => -30.0,
        _ => 0.0,
    }
}

fn confidence_for_pair(n_site: &CleavageSite, c_site: &CleavageSite, body: &str) -> f64 {
    let mut confidence = 0.0;

    confidence += match n_site.motif_class() {
        Some(MotifClass::SingleBasic) => N_TERMINAL_SINGLE_BONUS,
        Some(_) => N_TERMINAL_STRONG_BONUS,
        None => 0.0,
    };

    let amidation_linked = c_site.motif_class() == Some(MotifClass::AmidationTerminal);
    if amidation_linked {
        confidence += C_TERMINAL_AMIDATION_BONUS;
    }
    if ends_with_amidation_signature(body) {
        confidence += TERMINAL_SIGNATURE_BONUS;
    } else if body.ends_with('G') {
        confidence += TERMINAL_GLYCINE_BONUS;
    }
    confidence += length_band_bonus(body.len());

    if amidation_linked && confidence < AMIDATION_CONFIDENCE_FLOOR {
        confidence = AMIDATION_CONFIDENCE_FLOOR;
    }
    confidence.clamp(0.0, 100.0)
}

fn overlap_fraction(a: &PeptideCandidate, b: &PeptideCandidate) -> f64 {
    let shared_start = a.start.max(b.start);
    let shared_end = a.end.min(b.end);
    if shared_end <= shared_start {
        return 0.0;
    }
    let shared = (shared_end - shared_start) as f64;
    shared / a.length.min(b.length) as f64
}

/// Enumerates every ordered site pair, scores each candidate, drops the weak
/// ones, and removes highly overlapping duplicates.
fn combinatorial(
    sequence: &str,
    sites: &[CleavageSite],
    mode: DetectionMode,
) -> Vec<PeptideCandidate> {
    let mut candidates: Vec<PeptideCandidate> = Vec::new();

    for i in 0..sites.len() {
        for j in (i + 1)..sites.len() {
            let n_site = &sites[i];
            let c_site = &sites[j];
            let start = n_site.position;
            // An amidation-terminal motif stays inside the body to preserve
            // the active C-terminus; any other motif is excised.
            let end = if c_site.motif_class() == Some(MotifClass::AmidationTerminal) {
                c_site.position
            } else {
                c_site.index
            };
            if end <= start {
                continue;
            }
            let length = end - start;
            if !(COMBINATORIAL_MIN_LENGTH..=COMBINATORIAL_MAX_LENGTH).contains(&length) {
                continue;
            }
            let body = &sequence[start..end];
            let confidence = confidence_for_pair(n_site, c_site, body);
            if confidence < MIN_CONFIDENCE {
                continue;
            }
            let mut candidate = PeptideCandidate::new(
                sequence,
                start,
                end,
                n_site.motif.clone(),
                c_site.motif.clone(),
                mode,
            );
            candidate.confidence = Some(confidence);
            candidates.push(candidate);
        }
    }

    // Rank first so that dedup always drops the lower-confidence member of
    // an overlapping pair, first-kept winning ties.
    candidates.sort_by(|a, b| {
        let ca = a.confidence.unwrap_or(0.0);
        let cb = b.confidence.unwrap_or(0.0);
        cb.partial_cmp(&ca)
            .unwrap_or(Ordering::Equal)
            .then(a.length.cmp(&b.length))
    });

    let mut kept: Vec<PeptideCandidate> = Vec::new();
    for candidate in candidates {
        let duplicate = kept
            .iter()
            .any(|k| overlap_fraction(k, &candidate) > MAX_OVERLAP_FRACTION);
        if !duplicate {
            kept.push(candidate);
            if kept.len() == MAX_CANDIDATES {
                break;
            }
        }
    }
    kept
}

/// PCSK5/6/7 extraction emits two fragments per site: the mature form from
/// the cleavage point to the sequence end and the prodomain between the
/// signal region and the motif.
fn domain_split(
    sequence: &str,
    sites: &[CleavageSite],
    signal_length: usize,
    mode: DetectionMode,
) -> Vec<PeptideCandidate> {
    let mut peptides = Vec::new();
    for site in sites {
        if sequence.len() >= site.position + MIN_MATURE_LENGTH {
            let mut mature = PeptideCandidate::new(
                sequence,
                site.position,
                sequence.len(),
                site.motif.clone(),
                END_BOUNDARY.to_string(),
                mode,
            );
            mature.provenance = Some(Provenance::MatureForm);
            peptides.push(mature);
        }
        if site.index >= signal_length + MIN_PRODOMAIN_LENGTH {
            let mut prodomain = PeptideCandidate::new(
                sequence,
                signal_length,
                site.index,
                SIGNAL_BOUNDARY.to_string(),
                site.motif.clone(),
                mode,
            );
            prodomain.provenance = Some(Provenance::Prodomain);
            peptides.push(prodomain);
        }
    }
    peptides
}
