// src/analysis.rs

use std::cmp::Ordering;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::amphipathic;
use crate::bioactivity::{self, BioactivityOracle};
use crate::cleavage;
use crate::extraction;
use crate::models::{AnalysisReport, DetectionMode, PeptideCandidate};
use crate::ptm;
use crate::sequence;
use crate::uniprot::{match_known_peptide, AnnotatedPeptide, RecommendedParams};

const TOP_PEPTIDES: usize = 5;

/// Parameters for one analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    pub mode: DetectionMode,
    pub signal_length: usize,
    pub min_cleavage_sites: usize,
    pub min_spacing: usize,
    pub max_peptide_length: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Strict,
            signal_length: 20,
            min_cleavage_sites: 4,
            min_spacing: 5,
            max_peptide_length: 100,
        }
    }
}

impl AnalysisParams {
    pub fn from_recommended(mode: DetectionMode, recommended: &RecommendedParams) -> Self {
        Self {
            mode,
            signal_length: recommended.signal_peptide_length,
            min_cleavage_sites: recommended.min_cleavage_sites,
            min_spacing: recommended.min_cleavage_spacing,
            max_peptide_length: recommended.max_peptide_length,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_cleavage_sites < 1 {
            bail!("minCleavageSites must be at least 1");
        }
        if self.min_spacing < 1 {
            bail!("minCleavageSpacing must be at least 1");
        }
        if self.max_peptide_length < 10 {
            bail!("maxPeptideLength must be at least 10");
        }
        Ok(())
    }
}

/// Optional protein-level context for the scoring and cross-check stages.
pub struct ProteinContext<'a> {
    pub accession: &'a str,
    pub annotated_peptides: &'a [AnnotatedPeptide],
}

fn positions_address_sequence(candidate: &PeptideCandidate, sequence: &str) -> bool {
    candidate.start < candidate.end
        && candidate.end <= sequence.len()
        && &sequence[candidate.start..candidate.end] == candidate.sequence
}

/// Runs the full pipeline over one raw sequence: validate, detect, extract,
/// score, annotate, rank. Collaborator failures degrade per candidate; input
/// errors are returned to the caller.
pub fn analyze_sequence(
    raw_sequence: &str,
    params: &AnalysisParams,
    oracle: Option<&dyn BioactivityOracle>,
    context: Option<&ProteinContext>,
) -> Result<AnalysisReport> {
    params.validate()?;

    let clean = sequence::clean_sequence(raw_sequence);
    sequence::validate_characters(&clean)?;
    sequence::validate_length(&clean, params.signal_length + 10)?;

    let sites = cleavage::find_sites(&clean, params.mode, params.signal_length, params.min_spacing);
    let mut peptides = extraction::extract(
        &clean,
        &sites,
        params.signal_length,
        params.min_spacing,
        params.min_cleavage_sites,
        params.mode,
    );

    // Mature domains released by PCSK5/6/7 are long by design, so the
    // max-length filter applies to the dibasic modes only.
    if params.mode != DetectionMode::Pcsk567 {
        peptides.retain(|p| p.length <= params.max_peptide_length);
    }

    info!(
        "{} cleavage sites, {} candidate peptides ({} mode)",
        sites.len(),
        peptides.len(),
        params.mode.as_str()
    );

    bioactivity::score_batch(&mut peptides, &clean, oracle);

    for peptide in &mut peptides {
        peptide.amphipathic = Some(amphipathic::calculate(&peptide.sequence));

        if let Some(context) = context {
            let matched = match_known_peptide(&peptide.sequence, context.annotated_peptides);
            peptide.uniprot_status = matched.status;
            peptide.uniprot_name = matched.name;
            peptide.uniprot_note = matched.note;
            if peptide.uniprot_status != crate::uniprot::MatchStatus::Unknown {
                peptide.uniprot_accession = Some(context.accession.to_string());
            }
        }

        // A candidate whose coordinates no longer address the parent
        // sequence keeps an empty PTM set and the batch continues.
        if !positions_address_sequence(peptide, &clean) {
            warn!(
                "candidate at {}..{} does not address the sequence, skipping PTM annotation",
                peptide.start, peptide.end
            );
            peptide.ptms = Vec::new();
            peptide.modified_sequence = None;
            continue;
        }

        peptide.ptms = ptm::annotate(&peptide.sequence, Some(clean.as_str()), Some(peptide.end));
        peptide.modified_sequence = if peptide.ptms.is_empty() {
            None
        } else {
            Some(ptm::generate_modified_sequence(&peptide.sequence, &peptide.ptms))
        };
    }

    peptides.sort_by(|a, b| {
        b.bioactivity_score
            .partial_cmp(&a.bioactivity_score)
            .unwrap_or(Ordering::Equal)
    });

    let peptides_in_range = peptides.iter().filter(|p| p.in_range).count();
    let reports: Vec<_> = peptides.iter().map(|p| p.to_report()).collect();
    let top_peptides = reports.iter().take(TOP_PEPTIDES).cloned().collect();

    Ok(AnalysisReport {
        sequence_length: clean.len(),
        cleavage_sites_count: sites.len(),
        peptides: reports,
        peptides_in_range,
        top_peptides,
        cleavage_sites: sites,
        mode: params.mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreSource;
    use anyhow::bail;

    const TOY_PROHORMONE: &str = "MKTLLLTLVVVTIVCLDLGYTGGGGKRAAAAAAAAAAKRNNNNNNNNNNKR";

    fn strict_params() -> AnalysisParams {
        AnalysisParams {
            mode: DetectionMode::Strict,
            signal_length: 9,
            min_cleavage_sites: 2,
            min_spacing: 5,
            max_peptide_length: 100,
        }
    }

    struct FailingOracle;
    impl BioactivityOracle for FailingOracle {
        fn predict(&self, _peptide: &str) -> Result<f64> {
            bail!("unreachable host")
        }
    }

    #[test]
    fn end_to_end_toy_prohormone() {
        let report = analyze_sequence(TOY_PROHORMONE, &strict_params(), None, None).unwrap();
        assert_eq!(report.sequence_length, 51);
        assert_eq!(report.cleavage_sites_count, 2);
        assert_eq!(report.peptides.len(), 3);
        assert_eq!(report.mode, DetectionMode::Strict);

        // Candidates are ranked by score and all heuristic-sourced.
        for pair in report.peptides.windows(2) {
            assert!(pair[0].bioactivity_score >= pair[1].bioactivity_score);
        }
        assert!(report
            .peptides
            .iter()
            .all(|p| p.bioactivity_source == ScoreSource::Heuristic));

        // 1-based positions: the first body starts right after the signal.
        let first = report
            .peptides
            .iter()
            .find(|p| p.sequence == "VVTIVCLDLGYTGGGG")
            .unwrap();
        assert_eq!(first.start, 10);
        assert_eq!(first.end, 25);
    }

    #[test]
    fn analysis_is_idempotent() {
        let a = analyze_sequence(TOY_PROHORMONE, &strict_params(), None, None).unwrap();
        let b = analyze_sequence(TOY_PROHORMONE, &strict_params(), None, None).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn oracle_failure_never_aborts_the_batch() {
        let report = analyze_sequence(
            TOY_PROHORMONE,
            &strict_params(),
            Some(&FailingOracle as &dyn BioactivityOracle),
            None,
        )
        .unwrap();
        assert_eq!(report.peptides.len(), 3);
        assert!(report
            .peptides
            .iter()
            .all(|p| p.bioactivity_source == ScoreSource::Heuristic));
    }

    #[test]
    fn rejects_bad_alphabet_and_short_input() {
        assert!(analyze_sequence("MKTXXXZZZ", &strict_params(), None, None).is_err());
        assert!(analyze_sequence("MKTLLL", &strict_params(), None, None).is_err());
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut params = strict_params();
        params.min_spacing = 0;
        assert!(analyze_sequence(TOY_PROHORMONE, &params, None, None).is_err());
        let mut params = strict_params();
        params.max_peptide_length = 5;
        assert!(analyze_sequence(TOY_PROHORMONE, &params, None, None).is_err());
    }

    #[test]
    fn cross_check_labels_known_peptides() {
        let annotated = vec![AnnotatedPeptide {
            name: "Decapeptide A".to_string(),
            start: 28,
            end: 37,
            sequence: "AAAAAAAAAA".to_string(),
        }];
        let context = ProteinContext {
            accession: "P99999",
            annotated_peptides: &annotated,
        };
        let report =
            analyze_sequence(TOY_PROHORMONE, &strict_params(), None, Some(&context)).unwrap();
        let known = report
            .peptides
            .iter()
            .find(|p| p.sequence == "AAAAAAAAAA")
            .unwrap();
        assert_eq!(known.uniprot_status, crate::uniprot::MatchStatus::Exact);
        assert_eq!(known.uniprot_accession.as_deref(), Some("P99999"));
    }

    #[test]
    fn amphipathic_profile_is_attached() {
        let report = analyze_sequence(TOY_PROHORMONE, &strict_params(), None, None).unwrap();
        assert!(report.peptides.iter().all(|p| p.amphipathic.is_some()));
    }

    // GDF11 (UniProt O95390), a literature substrate of the PCSK5/6/7
    // class: one RSRR site releasing a ~110 aa mature domain.
    const GDF11: &str = concat!(
        "MVLAAPLLLGFLLLALELRPRGEAAEGPAAAAAAAAAAAGVGGERSSRPAPSVAPEPD",
        "GCPVCVWRQHSRELRLESIKSQILSKLRLKEAPNISREVVKQLLPKAPPLQQILDLHDF",
        "QGDALQPEDFLEEDEYHATTETVISMAQETDPAVQTDGSPLCCHFHFSPKVMFTKVLKA",
        "QLWVYLRPVPRPATVYLQILRLKPLTGEGTAGGGGGGRRHIRIRSLKIELHSRSGHWQSI",
        "DFKQVLHSWFRQPQSNWGIEINAFDPSGTDLAVTSLGPGAEGLHPFMELRVLENTKRSRR",
        "NLGLDCDEHSSESRCCRYPLTVDFEAFGWDWIIAPKRYKANYCSGQCEYMFMQKYPTHT",
        "HLVQQANPRGSAGPCCTPTKMSPINMLYFNDKQQIIYGKIPGMVVDRCGCS",
    );

    #[test]
    fn gdf11_releases_mature_domain_after_rsrr() {
        let params = AnalysisParams {
            mode: DetectionMode::Pcsk567,
            signal_length: 18,
            min_cleavage_sites: 1,
            min_spacing: 1,
            max_peptide_length: 100,
        };
        let report = analyze_sequence(GDF11, &params, None, None).unwrap();
        assert_eq!(report.cleavage_sites_count, 1);
        assert_eq!(report.cleavage_sites[0].motif, "RSRR");

        let mature = report
            .peptides
            .iter()
            .find(|p| p.peptide_type == Some(crate::models::Provenance::MatureForm))
            .expect("mature form");
        assert!(mature.sequence.starts_with("NLGLD"));
        assert!((100..=120).contains(&mature.length));
        assert!(mature.in_range);

        let prodomain = report
            .peptides
            .iter()
            .find(|p| p.peptide_type == Some(crate::models::Provenance::Prodomain))
            .expect("prodomain");
        assert!(prodomain.length > 120);
        assert!(!prodomain.in_range);
    }

    #[test]
    fn fasta_input_is_cleaned_before_analysis() {
        let fasta = format!(">sp|P99999|TEST_HUMAN Test protein\n{TOY_PROHORMONE}");
        let report = analyze_sequence(&fasta, &strict_params(), None, None).unwrap();
        assert_eq!(report.sequence_length, 51);
    }
}
