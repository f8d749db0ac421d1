// src/ptm.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// The six modification signatures the annotator recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PtmKind {
    #[serde(rename = "C-terminal amidation")]
    CTerminalAmidation,
    #[serde(rename = "N-terminal pyroglutamate")]
    NTerminalPyroglutamate,
    #[serde(rename = "Disulfide bonds")]
    DisulfideBonds,
    #[serde(rename = "Ghrelin acylation")]
    GhrelinAcylation,
    #[serde(rename = "Tyrosine O-sulfation")]
    TyrosineSulfation,
    #[serde(rename = "N-glycosylation")]
    NGlycosylation,
}

/// One detected modification. Positions are 1-based within the candidate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PtmAnnotation {
    #[serde(rename = "type")]
    pub kind: PtmKind,
    pub enzyme: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motif: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub description: String,
}

impl PtmAnnotation {
    fn new(kind: PtmKind, enzyme: &'static str, description: String) -> Self {
        Self {
            kind,
            enzyme,
            motif: None,
            residue: None,
            position: None,
            positions: Vec::new(),
            count: None,
            description,
        }
    }
}

static GLYCOSYLATION_MOTIF: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"N[^P][ST]").ok());

/// Sulfated tyrosines need an acidic neighborhood: this many residues either
/// side of the Y, holding at least two D/E.
const SULFATION_WINDOW: usize = 5;
const SULFATION_MIN_ACIDIC: usize = 2;

/// Runs all six independent checks. `full_sequence`/`peptide_end` give the
/// flanking protein context the amidation check needs; without them that
/// check is skipped, never scored as absent evidence.
pub fn annotate(
    peptide: &str,
    full_sequence: Option<&str>,
    peptide_end: Option<usize>,
) -> Vec<PtmAnnotation> {
    let mut ptms = Vec::new();

    if let (Some(full), Some(end)) = (full_sequence, peptide_end) {
        if let Some(amidation) = detect_c_terminal_amidation(peptide, full, end) {
            ptms.push(amidation);
        }
    }
    if let Some(pyroglu) = detect_n_terminal_pyroglutamate(peptide) {
        ptms.push(pyroglu);
    }
    if let Some(disulfide) = detect_disulfide_bonds(peptide) {
        ptms.push(disulfide);
    }
    if let Some(acylation) = detect_ghrelin_acylation(peptide) {
        ptms.push(acylation);
    }
    ptms.extend(detect_tyrosine_sulfation(peptide));
    ptms.extend(detect_n_glycosylation(peptide));
    ptms
}

/// The peptide must end in G and the residues immediately after it in the
/// parent protein must open with one or two basics; PAM then converts the
/// glycine into the amide. `peptide_end` is the zero-based exclusive end,
/// which addresses the first residue past the peptide directly.
pub fn detect_c_terminal_amidation(
    peptide: &str,
    full_sequence: &str,
    peptide_end: usize,
) -> Option<PtmAnnotation> {
    if !peptide.ends_with('G') || peptide_end >= full_sequence.len() {
        return None;
    }
    let window_end = (peptide_end + 3).min(full_sequence.len());
    let after = &full_sequence[peptide_end..window_end];

    let basic_prefix = ["RR", "RK", "KR", "KK", "R", "K"]
        .iter()
        .find(|p| after.starts_with(**p))?;
    let motif = format!("G{basic_prefix}");

    let mut ptm = PtmAnnotation::new(
        PtmKind::CTerminalAmidation,
        "PAM",
        format!("{motif} -> -NH2"),
    );
    ptm.motif = Some(motif);
    Some(ptm)
}

pub fn detect_n_terminal_pyroglutamate(peptide: &str) -> Option<PtmAnnotation> {
    let first = peptide.chars().next()?;
    let enzyme = match first {
        'Q' => "QPCT",
        'E' => "QPCTL",
        _ => return None,
    };
    let mut ptm = PtmAnnotation::new(
        PtmKind::NTerminalPyroglutamate,
        enzyme,
        format!("{first} -> pGlu"),
    );
    ptm.residue = Some(first.to_string());
    ptm.position = Some(1);
    Some(ptm)
}

pub fn detect_disulfide_bonds(peptide: &str) -> Option<PtmAnnotation> {
    let positions: Vec<usize> = peptide
        .char_indices()
        .filter(|(_, c)| *c == 'C')
        .map(|(i, _)| i + 1)
        .collect();
    if positions.len() < 2 {
        return None;
    }
    let pair_count = positions.len() / 2;
    let mut ptm = PtmAnnotation::new(
        PtmKind::DisulfideBonds,
        "PDI / ER oxidoreductases",
        format!("{} Cys (>={pair_count} bonds)", positions.len()),
    );
    ptm.count = Some(pair_count);
    ptm.positions = positions;
    Some(ptm)
}

pub fn detect_ghrelin_acylation(peptide: &str) -> Option<PtmAnnotation> {
    if !peptide.starts_with("GSSF") {
        return None;
    }
    let mut ptm = PtmAnnotation::new(
        PtmKind::GhrelinAcylation,
        "GOAT (MBOAT4)",
        "Ser3 octanoylation".to_string(),
    );
    ptm.residue = Some("Ser3".to_string());
    ptm.position = Some(3);
    Some(ptm)
}

pub fn detect_tyrosine_sulfation(peptide: &str) -> Vec<PtmAnnotation> {
    let chars: Vec<char> = peptide.chars().collect();
    let mut sulfations = Vec::new();
    for (i, aa) in chars.iter().enumerate() {
        if *aa != 'Y' {
            continue;
        }
        let start = i.saturating_sub(SULFATION_WINDOW);
        let end = (i + SULFATION_WINDOW + 1).min(chars.len());
        let acidic = chars[start..end]
            .iter()
            .filter(|c| matches!(c, 'D' | 'E'))
            .count();
        if acidic >= SULFATION_MIN_ACIDIC {
            let position = i + 1;
            let mut ptm = PtmAnnotation::new(
                PtmKind::TyrosineSulfation,
                "TPST1/TPST2",
                format!("Y{position} -> Y(SO3)"),
            );
            ptm.residue = Some(format!("Y{position}"));
            ptm.position = Some(position);
            sulfations.push(ptm);
        }
    }
    sulfations
}

pub fn detect_n_glycosylation(peptide: &str) -> Vec<PtmAnnotation> {
    let Some(re) = GLYCOSYLATION_MOTIF.as_ref() else {
        return Vec::new();
    };
    re.find_iter(peptide)
        .map(|m| {
            let position = m.start() + 1;
            let mut ptm = PtmAnnotation::new(
                PtmKind::NGlycosylation,
                "Oligosaccharyltransferase",
                format!("N{position} glycosylation"),
            );
            ptm.motif = Some(m.as_str().to_string());
            ptm.position = Some(position);
            ptm
        })
        .collect()
}

/// Renders the annotated sequence. Works over a per-residue slot vector:
/// the length-changing amidation edit runs first, then the N-terminal
/// substitutions, then position-indexed ones, so no edit can shift the
/// indices a later edit relies on.
pub fn generate_modified_sequence(sequence: &str, ptms: &[PtmAnnotation]) -> String {
    if ptms.is_empty() {
        return sequence.to_string();
    }

    let mut slots: Vec<String> = sequence.chars().map(|c| c.to_string()).collect();
    let mut amidated = false;

    if ptms.iter().any(|p| p.kind == PtmKind::CTerminalAmidation) {
        if slots.last().map(String::as_str) == Some("G") {
            slots.pop();
        }
        amidated = true;
    }

    for ptm in ptms {
        match ptm.kind {
            PtmKind::NTerminalPyroglutamate => {
                if let Some(first) = slots.first_mut() {
                    *first = "pGlu".to_string();
                }
            }
            PtmKind::GhrelinAcylation => {
                if let Some(first) = slots.first_mut() {
                    *first = "G(C8:0)".to_string();
                }
            }
            _ => {}
        }
    }

    for ptm in ptms {
        match ptm.kind {
            PtmKind::TyrosineSulfation => {
                if let Some(slot) = ptm.position.and_then(|p| slots.get_mut(p - 1)) {
                    if slot == "Y" {
                        *slot = "Y(SO3)".to_string();
                    }
                }
            }
            PtmKind::NGlycosylation => {
                if let Some(slot) = ptm.position.and_then(|p| slots.get_mut(p - 1)) {
                    if slot == "N" {
                        *slot = "N(GlcNAc)".to_string();
                    }
                }
            }
            PtmKind::DisulfideBonds => {
                for (n, cys_pos) in ptm.positions.iter().enumerate() {
                    if let Some(slot) = slots.get_mut(cys_pos - 1) {
                        if slot == "C" {
                            *slot = format!("C{}", n + 1);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut rendered = slots.concat();
    if amidated {
        rendered.push_str("-NH2");
    }
    rendered
}
