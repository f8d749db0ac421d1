// src/uniprot.rs

use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api_handler::ApiHandler;
use crate::cache::ProteinCache;

pub const UNIPROT_BASE_URL: &str = "https://rest.uniprot.org/uniprotkb";
const UNIPROT_TIMEOUT: Duration = Duration::from_secs(15);
const ENTRY_FIELDS: &str = "accession,gene_names,protein_name,sequence,length,ft_signal,ft_peptide,ft_propep";
const DEFAULT_SIGNAL_END: usize = 20;

static ACCESSION_FORMAT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[OPQ][0-9][A-Z0-9]{3}[0-9]$|^[A-NR-Z][0-9]([A-Z][A-Z0-9]{2}[0-9]){1,2}$").ok()
});

/// True when `query` looks like a UniProt accession rather than a gene name.
pub fn is_accession(query: &str) -> bool {
    ACCESSION_FORMAT
        .as_ref()
        .map(|re| re.is_match(&query.to_uppercase()))
        .unwrap_or(false)
}

// ---- wire format -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<UniProtEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniProtEntry {
    primary_accession: Option<String>,
    #[serde(default)]
    genes: Vec<GeneEntry>,
    protein_description: Option<ProteinDescription>,
    sequence: Option<SequenceBlock>,
    #[serde(default)]
    features: Vec<FeatureEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneEntry {
    gene_name: Option<NameValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProteinDescription {
    recommended_name: Option<RecommendedName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedName {
    full_name: Option<NameValue>,
}

#[derive(Debug, Deserialize)]
struct NameValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SequenceBlock {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureEntry {
    #[serde(rename = "type")]
    feature_type: String,
    description: Option<String>,
    location: Option<FeatureLocation>,
}

#[derive(Debug, Deserialize)]
struct FeatureLocation {
    start: Option<FeaturePosition>,
    end: Option<FeaturePosition>,
}

#[derive(Debug, Deserialize)]
struct FeaturePosition {
    value: Option<usize>,
}

// ---- resolved records ------------------------------------------------------

/// A peptide or propeptide annotated on the entry, 1-based coordinates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedPeptide {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub sequence: String,
}

/// Analysis parameters derived from the entry's own annotation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedParams {
    pub signal_peptide_length: usize,
    pub min_cleavage_sites: usize,
    pub min_cleavage_spacing: usize,
    pub max_peptide_length: usize,
}

/// A resolved secreted protein.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinRecord {
    pub accession: String,
    pub gene_name: String,
    pub protein_name: String,
    pub length: usize,
    pub sequence: String,
    pub signal_peptide_end: usize,
    pub recommended_params: RecommendedParams,
    pub fasta_header: String,
    pub annotated_peptides: Vec<AnnotatedPeptide>,
}

/// Thresholds mirror the curation heuristics of the reference dataset: more
/// annotated peptides demand more cleavage sites, longer precursors allow
/// wider spacing.
pub fn calculate_recommended_params(
    length: usize,
    signal_end: usize,
    num_peptides: usize,
) -> RecommendedParams {
    let estimated_sites = num_peptides as f64 * 1.5;
    let min_cleavage_sites = if estimated_sites > 12.0 {
        5
    } else if estimated_sites > 8.0 {
        4
    } else if estimated_sites > 5.0 {
        3
    } else {
        2
    };

    let min_cleavage_spacing = if length < 150 {
        3
    } else if length < 300 {
        4
    } else {
        5
    };

    RecommendedParams {
        signal_peptide_length: signal_end,
        min_cleavage_sites,
        min_cleavage_spacing,
        max_peptide_length: 100,
    }
}

fn parse_entry(entry: &UniProtEntry) -> Option<ProteinRecord> {
    let accession = entry.primary_accession.clone()?;
    let sequence = entry.sequence.as_ref()?.value.clone();
    if sequence.is_empty() {
        return None;
    }

    let gene_name = entry
        .genes
        .first()
        .and_then(|g| g.gene_name.as_ref())
        .map(|n| n.value.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    let protein_name = entry
        .protein_description
        .as_ref()
        .and_then(|d| d.recommended_name.as_ref())
        .and_then(|r| r.full_name.as_ref())
        .map(|n| n.value.clone())
        .unwrap_or_else(|| "Unknown protein".to_string());

    let signal_peptide_end = entry
        .features
        .iter()
        .find(|f| f.feature_type == "Signal")
        .and_then(|f| f.location.as_ref())
        .and_then(|l| l.end.as_ref())
        .and_then(|p| p.value)
        .unwrap_or(DEFAULT_SIGNAL_END);

    let mut annotated_peptides = Vec::new();
    for feature in &entry.features {
        if feature.feature_type != "Peptide" && feature.feature_type != "Propeptide" {
            continue;
        }
        let Some(location) = feature.location.as_ref() else {
            continue;
        };
        let (Some(start), Some(end)) = (
            location.start.as_ref().and_then(|p| p.value),
            location.end.as_ref().and_then(|p| p.value),
        ) else {
            continue;
        };
        if start == 0 || end == 0 || start > sequence.len() || end > sequence.len() || start > end {
            continue;
        }
        annotated_peptides.push(AnnotatedPeptide {
            name: feature
                .description
                .clone()
                .unwrap_or_else(|| "Peptide".to_string()),
            start,
            end,
            sequence: sequence[start - 1..end].to_string(),
        });
    }

    let recommended_params =
        calculate_recommended_params(sequence.len(), signal_peptide_end, annotated_peptides.len());
    let fasta_header = format!(">sp|{accession}|{gene_name}_HUMAN {protein_name}");

    Some(ProteinRecord {
        accession,
        gene_name,
        protein_name,
        length: sequence.len(),
        sequence,
        signal_peptide_end,
        recommended_params,
        fasta_header,
        annotated_peptides,
    })
}

// ---- known-peptide cross-check ---------------------------------------------

/// How a candidate relates to the entry's annotated peptides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Exact,
    Partial,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct PeptideMatch {
    pub status: MatchStatus,
    pub name: Option<String>,
    pub note: Option<String>,
}

impl PeptideMatch {
    pub fn unknown() -> Self {
        Self {
            status: MatchStatus::Unknown,
            name: None,
            note: None,
        }
    }
}

/// Matches a candidate against annotated peptides at three precision levels:
/// exact, fragment of an annotated peptide, or extension of one.
pub fn match_known_peptide(peptide: &str, annotated: &[AnnotatedPeptide]) -> PeptideMatch {
    for known in annotated {
        if peptide == known.sequence {
            return PeptideMatch {
                status: MatchStatus::Exact,
                name: Some(known.name.clone()),
                note: None,
            };
        }
        if let Some(at) = known.sequence.find(peptide) {
            let note = if at == 0 {
                "N-terminal fragment"
            } else if at + peptide.len() == known.sequence.len() {
                "C-terminal fragment"
            } else {
                "Internal fragment"
            };
            return PeptideMatch {
                status: MatchStatus::Partial,
                name: Some(known.name.clone()),
                note: Some(note.to_string()),
            };
        }
        if peptide.contains(&known.sequence) {
            return PeptideMatch {
                status: MatchStatus::Partial,
                name: Some(known.name.clone()),
                note: Some("Extended form".to_string()),
            };
        }
    }
    PeptideMatch::unknown()
}

// ---- resolver --------------------------------------------------------------

/// Fetches secreted human proteins from the UniProt REST API, consulting the
/// injected cache before the network.
pub struct ProteinResolver {
    api: ApiHandler,
    cache: ProteinCache,
}

impl ProteinResolver {
    pub fn new(cache: ProteinCache) -> Result<Self> {
        Ok(Self {
            api: ApiHandler::new(UNIPROT_BASE_URL, UNIPROT_TIMEOUT)?,
            cache,
        })
    }

    /// Search by gene name or accession; only reviewed, secreted human
    /// entries qualify.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ProteinRecord>> {
        let field = if is_accession(query) { "accession" } else { "gene" };
        let uniprot_query = format!(
            "({field}:{}) AND (organism_id:9606) AND (reviewed:true) AND (cc_subcellular_location:Secreted)",
            query.to_uppercase()
        );
        info!("searching UniProt: {uniprot_query}");

        let limit = limit.to_string();
        let value = self.api.get_json(
            "/search",
            &[
                ("query", uniprot_query.as_str()),
                ("format", "json"),
                ("size", limit.as_str()),
                ("fields", ENTRY_FIELDS),
            ],
        )?;
        let response: SearchResponse = serde_json::from_value(value)?;
        Ok(response.results.iter().filter_map(parse_entry).collect())
    }

    /// Resolve one accession, serving from cache when fresh. Network or
    /// parse failures surface as "not found" rather than aborting a batch.
    pub fn get_protein(&mut self, accession: &str) -> Option<ProteinRecord> {
        let cache_key = format!("protein_{accession}");
        if let Some(record) = self.cache.get(&cache_key) {
            info!("cache hit: {accession}");
            return Some(record.clone());
        }

        let endpoint = format!("/{accession}");
        let value = match self
            .api
            .get_json(&endpoint, &[("format", "json"), ("fields", ENTRY_FIELDS)])
        {
            Ok(value) => value,
            Err(e) => {
                warn!("protein fetch failed for {accession}: {e}");
                return None;
            }
        };
        let entry: UniProtEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("unexpected UniProt payload for {accession}: {e}");
                return None;
            }
        };

        let record = parse_entry(&entry)?;
        self.cache.insert(&cache_key, record.clone());
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accession_format_detection() {
        assert!(is_accession("P01189"));
        assert!(is_accession("O95390"));
        assert!(is_accession("q9y5y9"));
        assert!(!is_accession("POMC"));
        assert!(!is_accession("INS"));
    }

    #[test]
    fn entry_parsing_extracts_signal_and_peptides() {
        let payload = serde_json::json!({
            "primaryAccession": "P01189",
            "genes": [{ "geneName": { "value": "POMC" } }],
            "proteinDescription": {
                "recommendedName": { "fullName": { "value": "Pro-opiomelanocortin" } }
            },
            "sequence": { "value": "MPRSCCSRSGALLLALLLQASMEVRGWCLESSQCQDLTTESNLLECIRACKPDLS", "length": 55 },
            "features": [
                {
                    "type": "Signal",
                    "location": { "start": { "value": 1 }, "end": { "value": 26 } }
                },
                {
                    "type": "Peptide",
                    "description": "NPP",
                    "location": { "start": { "value": 27 }, "end": { "value": 55 } }
                },
                {
                    "type": "Chain",
                    "description": "ignored",
                    "location": { "start": { "value": 1 }, "end": { "value": 55 } }
                }
            ]
        });
        let entry: UniProtEntry = serde_json::from_value(payload).unwrap();
        let record = parse_entry(&entry).unwrap();
        assert_eq!(record.accession, "P01189");
        assert_eq!(record.gene_name, "POMC");
        assert_eq!(record.signal_peptide_end, 26);
        assert_eq!(record.annotated_peptides.len(), 1);
        assert_eq!(record.annotated_peptides[0].name, "NPP");
        assert_eq!(record.annotated_peptides[0].sequence.len(), 55 - 26);
        assert!(record.fasta_header.starts_with(">sp|P01189|POMC_HUMAN"));
    }

    #[test]
    fn entry_without_sequence_is_rejected() {
        let entry: UniProtEntry =
            serde_json::from_value(serde_json::json!({ "primaryAccession": "P00000" })).unwrap();
        assert!(parse_entry(&entry).is_none());
    }

    #[test]
    fn recommended_params_scale_with_annotation() {
        let few = calculate_recommended_params(120, 20, 1);
        assert_eq!(few.min_cleavage_sites, 2);
        assert_eq!(few.min_cleavage_spacing, 3);

        let many = calculate_recommended_params(400, 25, 10);
        assert_eq!(many.min_cleavage_sites, 5);
        assert_eq!(many.min_cleavage_spacing, 5);
        assert_eq!(many.signal_peptide_length, 25);
        assert_eq!(many.max_peptide_length, 100);
    }

    fn annotated(name: &str, sequence: &str) -> AnnotatedPeptide {
        AnnotatedPeptide {
            name: name.to_string(),
            start: 1,
            end: sequence.len(),
            sequence: sequence.to_string(),
        }
    }

    #[test]
    fn known_peptide_match_levels() {
        let known = vec![annotated("Met-enkephalin", "YGGFM")];

        let exact = match_known_peptide("YGGFM", &known);
        assert_eq!(exact.status, MatchStatus::Exact);
        assert_eq!(exact.name.as_deref(), Some("Met-enkephalin"));

        let fragment = match_known_peptide("YGGF", &known);
        assert_eq!(fragment.status, MatchStatus::Partial);
        assert_eq!(fragment.note.as_deref(), Some("N-terminal fragment"));

        let tail = match_known_peptide("GGFM", &known);
        assert_eq!(tail.note.as_deref(), Some("C-terminal fragment"));

        let inner = match_known_peptide("GGF", &known);
        assert_eq!(inner.note.as_deref(), Some("Internal fragment"));

        let extended = match_known_peptide("YGGFMRF", &known);
        assert_eq!(extended.status, MatchStatus::Partial);
        assert_eq!(extended.note.as_deref(), Some("Extended form"));

        let none = match_known_peptide("AAAA", &known);
        assert_eq!(none.status, MatchStatus::Unknown);
    }
}
