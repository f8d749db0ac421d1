// src/models.rs

use serde::Serialize;

use crate::amphipathic::AmphipathicProfile;
use crate::ptm::PtmAnnotation;
use crate::uniprot::MatchStatus;

/// Peptide lengths considered biologically typical for products of the
/// dibasic convertases (PCSK1/3 class).
pub const OPTIMAL_PEPTIDE_MIN_LENGTH: usize = 5;
pub const OPTIMAL_PEPTIDE_MAX_LENGTH: usize = 25;

/// Mature domains released by the PCSK5/6/7 class are whole protein domains,
/// so their typical window is far wider.
pub const DOMAIN_PEPTIDE_MIN_LENGTH: usize = 10;
pub const DOMAIN_PEPTIDE_MAX_LENGTH: usize = 150;

/// Detection policy for a single analysis. Selected once per request and
/// immutable for its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionMode {
    #[serde(rename = "strict")]
    Strict,
    #[serde(rename = "permissive")]
    Permissive,
    #[serde(rename = "ultra-permissive")]
    UltraPermissive,
    #[serde(rename = "pcsk567")]
    Pcsk567,
}

impl DetectionMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "strict" => Some(Self::Strict),
            "permissive" => Some(Self::Permissive),
            "ultra-permissive" => Some(Self::UltraPermissive),
            "pcsk567" => Some(Self::Pcsk567),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Permissive => "permissive",
            Self::UltraPermissive => "ultra-permissive",
            Self::Pcsk567 => "pcsk567",
        }
    }

    /// The dibasic modes share the short optimal window; the PCSK5/6/7 mode
    /// releases whole domains.
    pub fn in_range(&self, length: usize) -> bool {
        match self {
            Self::Pcsk567 => (DOMAIN_PEPTIDE_MIN_LENGTH..=DOMAIN_PEPTIDE_MAX_LENGTH).contains(&length),
            _ => (OPTIMAL_PEPTIDE_MIN_LENGTH..=OPTIMAL_PEPTIDE_MAX_LENGTH).contains(&length),
        }
    }
}

/// A convertase recognition site. `index` is the offset of the first motif
/// residue, `position` the offset immediately after the motif (the cleavage
/// point). Offsets are zero-based into the parent sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleavageSite {
    pub position: usize,
    pub motif: String,
    pub index: usize,
}

impl CleavageSite {
    pub fn motif_class(&self) -> Option<MotifClass> {
        classify_motif(&self.motif)
    }
}

/// Structural class of a cleavage motif.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotifClass {
    /// KK, KR, RR, RK
    Dibasic,
    /// An isolated K or R
    SingleBasic,
    /// [KR][FY] optionally followed by G, marking an amidated C-terminus
    AmidationTerminal,
    /// R-X-[K/R]-R, the PCSK5/6/7 recognition site
    FourResidue,
}

fn is_basic(c: char) -> bool {
    c == 'K' || c == 'R'
}

/// Classifies motif text; returns `None` for boundary labels such as
/// `SIGNAL` and `END` that are not motifs.
pub fn classify_motif(motif: &str) -> Option<MotifClass> {
    let chars: Vec<char> = motif.chars().collect();
    match chars.as_slice() {
        [c] if is_basic(*c) => Some(MotifClass::SingleBasic),
        [a, b] if is_basic(*a) && is_basic(*b) => Some(MotifClass::Dibasic),
        [a, b] if is_basic(*a) && matches!(*b, 'F' | 'Y') => Some(MotifClass::AmidationTerminal),
        [a, b, 'G'] if is_basic(*a) && matches!(*b, 'F' | 'Y') => Some(MotifClass::AmidationTerminal),
        [a, _, c, 'R'] if *a == 'R' && is_basic(*c) => Some(MotifClass::FourResidue),
        _ => None,
    }
}

/// Origin of a fragment in PCSK5/6/7 mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    #[serde(rename = "mature_form")]
    MatureForm,
    #[serde(rename = "prodomain")]
    Prodomain,
}

/// Where a candidate's bioactivity score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Remote,
    Heuristic,
    None,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Heuristic => "heuristic",
            Self::None => "none",
        }
    }
}

/// One candidate peptide fragment. Created by the extractor and enriched in
/// place by the scorer and annotator. `start`/`end` are zero-based offsets
/// into the parent sequence, `end` exclusive.
#[derive(Debug, Clone)]
pub struct PeptideCandidate {
    pub sequence: String,
    pub start: usize,
    pub end: usize,
    pub length: usize,
    pub in_range: bool,
    pub motif_n: String,
    pub motif_c: String,
    pub bioactivity_score: f64,
    pub bioactivity_source: ScoreSource,
    pub confidence: Option<f64>,
    pub provenance: Option<Provenance>,
    pub ptms: Vec<PtmAnnotation>,
    pub modified_sequence: Option<String>,
    pub amphipathic: Option<AmphipathicProfile>,
    pub uniprot_status: MatchStatus,
    pub uniprot_name: Option<String>,
    pub uniprot_note: Option<String>,
    pub uniprot_accession: Option<String>,
}

impl PeptideCandidate {
    pub fn new(
        sequence: &str,
        start: usize,
        end: usize,
        motif_n: String,
        motif_c: String,
        mode: DetectionMode,
    ) -> Self {
        let body = &sequence[start..end];
        Self {
            sequence: body.to_string(),
            start,
            end,
            length: body.len(),
            in_range: mode.in_range(body.len()),
            motif_n,
            motif_c,
            bioactivity_score: 0.0,
            bioactivity_source: ScoreSource::None,
            confidence: None,
            provenance: None,
            ptms: Vec::new(),
            modified_sequence: None,
            amphipathic: None,
            uniprot_status: MatchStatus::Unknown,
            uniprot_name: None,
            uniprot_note: None,
            uniprot_accession: None,
        }
    }

    /// External view with 1-based coordinates. The internal exclusive `end`
    /// equals the 1-based offset of the last residue, so only `start` shifts.
    pub fn to_report(&self) -> PeptideReport {
        PeptideReport {
            sequence: self.sequence.clone(),
            start: self.start + 1,
            end: self.end,
            length: self.length,
            in_range: self.in_range,
            cleavage_motif_n: self.motif_n.clone(),
            cleavage_motif_c: self.motif_c.clone(),
            bioactivity_score: self.bioactivity_score,
            bioactivity_source: self.bioactivity_source,
            confidence: self.confidence,
            peptide_type: self.provenance,
            ptms: self.ptms.clone(),
            modified_sequence: self.modified_sequence.clone(),
            amphipathic: self.amphipathic.clone(),
            uniprot_status: self.uniprot_status,
            uniprot_name: self.uniprot_name.clone(),
            uniprot_note: self.uniprot_note.clone(),
            uniprot_accession: self.uniprot_accession.clone(),
        }
    }
}

/// Serialized form of a candidate, 1-based positions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeptideReport {
    pub sequence: String,
    pub start: usize,
    pub end: usize,
    pub length: usize,
    pub in_range: bool,
    pub cleavage_motif_n: String,
    pub cleavage_motif_c: String,
    pub bioactivity_score: f64,
    pub bioactivity_source: ScoreSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peptide_type: Option<Provenance>,
    pub ptms: Vec<PtmAnnotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_sequence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amphipathic: Option<AmphipathicProfile>,
    pub uniprot_status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniprot_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniprot_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniprot_accession: Option<String>,
}

/// Full result of analyzing one protein sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub sequence_length: usize,
    pub cleavage_sites_count: usize,
    pub peptides: Vec<PeptideReport>,
    pub peptides_in_range: usize,
    pub top_peptides: Vec<PeptideReport>,
    pub cleavage_sites: Vec<CleavageSite>,
    pub mode: DetectionMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motif_classification() {
        assert_eq!(classify_motif("KR"), Some(MotifClass::Dibasic));
        assert_eq!(classify_motif("RR"), Some(MotifClass::Dibasic));
        assert_eq!(classify_motif("K"), Some(MotifClass::SingleBasic));
        assert_eq!(classify_motif("RF"), Some(MotifClass::AmidationTerminal));
        assert_eq!(classify_motif("KYG"), Some(MotifClass::AmidationTerminal));
        assert_eq!(classify_motif("RSRR"), Some(MotifClass::FourResidue));
        assert_eq!(classify_motif("SIGNAL"), None);
        assert_eq!(classify_motif("END"), None);
    }

    #[test]
    fn report_positions_are_one_based() {
        let cand = PeptideCandidate::new("MKAAAG", 1, 4, "SIGNAL".into(), "KR".into(), DetectionMode::Permissive);
        let report = cand.to_report();
        assert_eq!(report.sequence, "KAA");
        assert_eq!(report.start, 2);
        assert_eq!(report.end, 4);
    }

    #[test]
    fn in_range_windows_differ_by_mode() {
        assert!(DetectionMode::Strict.in_range(10));
        assert!(!DetectionMode::Strict.in_range(110));
        assert!(DetectionMode::Pcsk567.in_range(110));
        assert!(!DetectionMode::Pcsk567.in_range(4));
    }
}
