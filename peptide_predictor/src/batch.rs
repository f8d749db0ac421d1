// src/batch.rs

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{analyze_sequence, AnalysisParams, ProteinContext};
use crate::bioactivity::BioactivityOracle;
use crate::models::{AnalysisReport, DetectionMode};
use crate::uniprot::ProteinResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProteinStatus {
    Success,
    Error,
    NotFound,
}

/// Outcome of analyzing one requested protein.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinAnalysis {
    pub status: ProteinStatus,
    pub protein_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gene_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fasta_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch-level summary across all requested proteins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_proteins: usize,
    pub unique_proteins: usize,
    pub successful_proteins: usize,
    pub failed_proteins: usize,
    pub not_found: Vec<String>,
    pub results: Vec<ProteinAnalysis>,
    pub mode: DetectionMode,
}

/// Drops repeated accessions while keeping first-seen order.
pub fn dedupe_preserving_order(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Analyzes one resolved protein with its own recommended parameters. A
/// failure here affects only this protein's entry in the batch.
pub fn analyze_protein(
    resolver: &mut ProteinResolver,
    accession: &str,
    mode: DetectionMode,
    oracle: Option<&dyn BioactivityOracle>,
) -> ProteinAnalysis {
    let Some(protein) = resolver.get_protein(accession) else {
        return ProteinAnalysis {
            status: ProteinStatus::NotFound,
            protein_id: accession.to_string(),
            gene_name: None,
            protein_name: None,
            fasta_header: None,
            report: None,
            error: Some(format!("protein {accession} not found or not secreted")),
        };
    };

    let params = AnalysisParams::from_recommended(mode, &protein.recommended_params);
    info!(
        "analyzing {} ({}) with signal={}, sites={}, spacing={}",
        protein.gene_name,
        protein.accession,
        params.signal_length,
        params.min_cleavage_sites,
        params.min_spacing
    );

    let context = ProteinContext {
        accession: &protein.accession,
        annotated_peptides: &protein.annotated_peptides,
    };

    match analyze_sequence(&protein.sequence, &params, oracle, Some(&context)) {
        Ok(report) => ProteinAnalysis {
            status: ProteinStatus::Success,
            protein_id: protein.accession.clone(),
            gene_name: Some(protein.gene_name.clone()),
            protein_name: Some(protein.protein_name.clone()),
            fasta_header: Some(protein.fasta_header.clone()),
            report: Some(report),
            error: None,
        },
        Err(e) => {
            warn!("analysis failed for {accession}: {e}");
            ProteinAnalysis {
                status: ProteinStatus::Error,
                protein_id: protein.accession.clone(),
                gene_name: Some(protein.gene_name),
                protein_name: Some(protein.protein_name),
                fasta_header: None,
                report: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Sequential loop over the requested accessions. No protein's failure stops
/// its siblings.
pub fn analyze_batch(
    resolver: &mut ProteinResolver,
    protein_ids: &[String],
    mode: DetectionMode,
    oracle: Option<&dyn BioactivityOracle>,
) -> BatchSummary {
    let unique = dedupe_preserving_order(protein_ids);
    if unique.len() < protein_ids.len() {
        info!(
            "removed {} duplicate accession(s)",
            protein_ids.len() - unique.len()
        );
    }

    let mut results = Vec::new();
    let mut not_found = Vec::new();

    for accession in &unique {
        let analysis = analyze_protein(resolver, accession, mode, oracle);
        if analysis.status == ProteinStatus::NotFound {
            not_found.push(accession.clone());
        }
        results.push(analysis);
    }

    let successful = results
        .iter()
        .filter(|r| r.status == ProteinStatus::Success)
        .count();
    let failed = results
        .iter()
        .filter(|r| r.status == ProteinStatus::Error)
        .count();

    BatchSummary {
        total_proteins: protein_ids.len(),
        unique_proteins: unique.len(),
        successful_proteins: successful,
        failed_proteins: failed,
        not_found,
        results,
        mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let ids = vec![
            "P01189".to_string(),
            "O95390".to_string(),
            "P01189".to_string(),
            "P01308".to_string(),
            "O95390".to_string(),
        ];
        assert_eq!(
            dedupe_preserving_order(&ids),
            vec!["P01189".to_string(), "O95390".to_string(), "P01308".to_string()]
        );
    }
}
