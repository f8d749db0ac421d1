// src/sequence.rs

use anyhow::{bail, Result};

/// The 20 standard residues plus the stop symbol.
const VALID_AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY*";

/// Strips FASTA headers and whitespace and uppercases the residues.
pub fn clean_sequence(raw: &str) -> String {
    let mut clean = raw.trim().to_uppercase();
    if clean.starts_with('>') {
        clean = clean.lines().skip(1).collect();
    }
    clean.retain(|c| !c.is_whitespace());
    clean
}

/// Rejects any symbol outside the amino-acid alphabet.
pub fn validate_characters(sequence: &str) -> Result<()> {
    let mut invalid: Vec<char> = sequence
        .chars()
        .filter(|c| !VALID_AMINO_ACIDS.contains(*c))
        .collect();
    invalid.sort_unstable();
    invalid.dedup();
    if !invalid.is_empty() {
        let listed: Vec<String> = invalid.iter().map(|c| c.to_string()).collect();
        bail!("invalid characters in sequence: {}", listed.join(", "));
    }
    Ok(())
}

/// A sequence must extend at least 10 residues past the signal region.
pub fn validate_length(sequence: &str, min_length: usize) -> Result<()> {
    if sequence.len() < min_length {
        bail!(
            "sequence too short: {} aa (minimum {} aa)",
            sequence.len(),
            min_length
        );
    }
    Ok(())
}

/// A parsed FASTA block. `id` and `name` are extracted from headers of the
/// form `>sp|P01308|INS_HUMAN Insulin` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub sequence: String,
    pub header: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
}

pub fn parse_fasta(fasta_text: &str) -> FastaRecord {
    let mut header = None;
    let mut id = None;
    let mut name = None;
    let mut sequence_lines: Vec<&str> = Vec::new();

    for line in fasta_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('>') {
            let rest = rest.trim();
            header = Some(rest.to_string());
            let mut parts = rest.split('|');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(_db), Some(accession), Some(tail)) => {
                    id = Some(accession.to_string());
                    name = tail
                        .split_once(' ')
                        .map(|(_, n)| n.trim().to_string())
                        .filter(|n| !n.is_empty());
                }
                _ => {
                    name = Some(rest.to_string());
                }
            }
        } else {
            sequence_lines.push(line);
        }
    }

    FastaRecord {
        sequence: sequence_lines.concat().to_uppercase(),
        header,
        id,
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_header_and_whitespace() {
        let raw = ">sp|P01189|POMC_HUMAN\nmkt llt\nAAA\r\n";
        assert_eq!(clean_sequence(raw), "MKTLLTAAA");
    }

    #[test]
    fn rejects_invalid_alphabet() {
        assert!(validate_characters("MKTLLB").is_err());
        assert!(validate_characters("MKTLL*").is_ok());
    }

    #[test]
    fn rejects_short_sequence() {
        assert!(validate_length("MKT", 30).is_err());
        assert!(validate_length("MKTLLLTLVVVTIVCLDLGYTAAAAAAAAA", 30).is_ok());
    }

    #[test]
    fn parses_uniprot_style_header() {
        let record = parse_fasta(">sp|P01308|INS_HUMAN Insulin\nMALWMRLLPL\nLALLALWGPD");
        assert_eq!(record.id.as_deref(), Some("P01308"));
        assert_eq!(record.name.as_deref(), Some("Insulin"));
        assert_eq!(record.sequence, "MALWMRLLPLLALLALWGPD");
    }

    #[test]
    fn parses_headerless_block() {
        let record = parse_fasta("MALWMRLLPL");
        assert!(record.header.is_none());
        assert_eq!(record.sequence, "MALWMRLLPL");
    }
}
