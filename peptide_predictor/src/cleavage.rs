// src/cleavage.rs

use fancy_regex::Regex as FancyRegex;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, warn};

use crate::models::{CleavageSite, DetectionMode};

// Dibasic patterns reject a disallowed follower, and the strict variant also
// rejects a basic residue immediately before the motif. A motif at the very
// end of the sequence has no follower to test and is not a site.
static STRICT_SITE: Lazy<Option<FancyRegex>> =
    Lazy::new(|| compile_lookaround(r"(?<!K|R)(?:KK|KR|RR|RK)(?=[^RKILPVH])"));
static PERMISSIVE_SITE: Lazy<Option<FancyRegex>> =
    Lazy::new(|| compile_lookaround(r"(?:KK|KR|RR|RK)(?=[^RKILPVH])"));

// A basic residue, then F or Y, optionally extended by the amidation glycine.
static AMIDATION_SITE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"[KR][FY]G?"));

// R-X-(K/R)-R, the PCSK5/6/7 recognition site. Cleavage consumes the whole
// motif.
static FOUR_RESIDUE_SITE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"R[A-Z](?:K|R)R"));

/// How far back from an amidation-terminal motif to look for its paired
/// upstream cleavage point.
const AMIDATION_PAIRING_WINDOW: usize = 50;

fn compile_lookaround(pattern: &str) -> Option<FancyRegex> {
    match FancyRegex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            error!("invalid cleavage pattern {pattern:?}: {e}");
            None
        }
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            error!("invalid cleavage pattern {pattern:?}: {e}");
            None
        }
    }
}

/// Scans `sequence` for convertase recognition sites under `mode`. The
/// signal region (`signal_length` leading residues) is never a cleavage
/// target. Sites are returned in ascending `index` order. A malformed
/// pattern yields an empty result, never a panic.
pub fn find_sites(
    sequence: &str,
    mode: DetectionMode,
    signal_length: usize,
    min_spacing: usize,
) -> Vec<CleavageSite> {
    if signal_length >= sequence.len() {
        return Vec::new();
    }
    let region = &sequence[signal_length..];
    match mode {
        DetectionMode::Strict => dibasic_sites(region, signal_length, Some(min_spacing), &STRICT_SITE),
        DetectionMode::Permissive => dibasic_sites(region, signal_length, None, &PERMISSIVE_SITE),
        DetectionMode::UltraPermissive => ultra_permissive_sites(region, signal_length),
        DetectionMode::Pcsk567 => four_residue_sites(region, signal_length),
    }
}

fn dibasic_sites(
    region: &str,
    offset: usize,
    min_spacing: Option<usize>,
    pattern: &Lazy<Option<FancyRegex>>,
) -> Vec<CleavageSite> {
    let Some(re) = pattern.as_ref() else {
        return Vec::new();
    };
    let mut sites: Vec<CleavageSite> = Vec::new();
    for found in re.find_iter(region) {
        let m = match found {
            Ok(m) => m,
            Err(e) => {
                warn!("cleavage scan aborted: {e}");
                break;
            }
        };
        let index = offset + m.start();
        // Strict mode drops (not flags) matches too close to the previous
        // accepted cleavage point, so acceptance depends on scan order.
        if let (Some(spacing), Some(last)) = (min_spacing, sites.last()) {
            if index - last.position < spacing {
                continue;
            }
        }
        sites.push(CleavageSite {
            position: index + 2,
            motif: m.as_str().to_string(),
            index,
        });
    }
    sites
}

fn is_isolated_basic(bytes: &[u8], p: usize) -> bool {
    matches!(bytes[p], b'K' | b'R')
        && (p == 0 || !matches!(bytes[p - 1], b'K' | b'R'))
        && (p + 1 >= bytes.len() || !matches!(bytes[p + 1], b'K' | b'R'))
}

/// Two-pass scan. Pass 1 anchors every amidation-terminal motif and pairs it
/// with the nearest preceding isolated K/R; pass 2 marks every isolated K/R
/// left over. The merged list is sorted by index.
fn ultra_permissive_sites(region: &str, offset: usize) -> Vec<CleavageSite> {
    let Some(re) = AMIDATION_SITE.as_ref() else {
        return Vec::new();
    };
    let bytes = region.as_bytes();
    let mut consumed = vec![false; bytes.len()];
    let mut sites: Vec<CleavageSite> = Vec::new();

    for m in re.find_iter(region) {
        sites.push(CleavageSite {
            position: offset + m.end(),
            motif: m.as_str().to_string(),
            index: offset + m.start(),
        });
        for slot in &mut consumed[m.start()..m.end()] {
            *slot = true;
        }
        let window_start = m.start().saturating_sub(AMIDATION_PAIRING_WINDOW);
        for p in (window_start..m.start()).rev() {
            if !consumed[p] && is_isolated_basic(bytes, p) {
                consumed[p] = true;
                sites.push(CleavageSite {
                    position: offset + p + 1,
                    motif: region[p..p + 1].to_string(),
                    index: offset + p,
                });
                break;
            }
        }
    }

    for p in 0..bytes.len() {
        if !consumed[p] && is_isolated_basic(bytes, p) {
            sites.push(CleavageSite {
                position: offset + p + 1,
                motif: region[p..p + 1].to_string(),
                index: offset + p,
            });
        }
    }

    sites.sort_by_key(|s| s.index);
    sites.dedup_by_key(|s| s.index);
    sites
}

fn four_residue_sites(region: &str, offset: usize) -> Vec<CleavageSite> {
    let Some(re) = FOUR_RESIDUE_SITE.as_ref() else {
        return Vec::new();
    };
    re.find_iter(region)
        .map(|m| CleavageSite {
            position: offset + m.start() + 4,
            motif: m.as_str().to_string(),
            index: offset + m.start(),
        })
        .collect()
}
