// src/main.rs

mod amphipathic;
mod analysis;
mod api_handler;
mod batch;
mod bioactivity;
mod cache;
mod cleavage;
mod extraction;
mod models;
mod ptm;
mod sequence;
mod uniprot;

use std::env;
use std::fs;
use std::process::ExitCode;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::{analyze_sequence, AnalysisParams};
use crate::batch::{analyze_batch, ProteinStatus};
use crate::bioactivity::{BioactivityOracle, PeptideRankerClient, PEPTIDERANKER_API_URL};
use crate::cache::ProteinCache;
use crate::models::{AnalysisReport, DetectionMode};
use crate::uniprot::ProteinResolver;

const MAX_PEPTIDES_TO_DISPLAY: usize = 5;
const SEARCH_LIMIT: usize = 10;

fn usage() -> ExitCode {
    eprintln!("usage: peptide_predictor [MODE] <ACCESSION>...");
    eprintln!("       peptide_predictor [MODE] --fasta <FILE>");
    eprintln!("       peptide_predictor search <GENE-OR-ACCESSION>");
    eprintln!("MODE is one of strict, permissive, ultra-permissive, pcsk567 (default strict)");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1).peekable();

    if args.peek().map(String::as_str) == Some("search") {
        args.next();
        let Some(query) = args.next() else {
            return usage();
        };
        return run_search(&query);
    }

    let mode = match args.peek().and_then(|a| DetectionMode::parse(a)) {
        Some(mode) => {
            args.next();
            mode
        }
        None => DetectionMode::Strict,
    };

    let rest: Vec<String> = args.collect();
    match rest.split_first() {
        Some((flag, paths)) if flag.as_str() == "--fasta" => match paths {
            [path] => run_fasta(path, mode),
            _ => usage(),
        },
        Some(_) => run_accessions(&rest, mode),
        None => usage(),
    }
}

fn build_oracle() -> Option<PeptideRankerClient> {
    match PeptideRankerClient::new(PEPTIDERANKER_API_URL) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("bioactivity service unavailable, heuristic scoring only: {e}");
            None
        }
    }
}

fn run_search(query: &str) -> ExitCode {
    let resolver = match ProteinResolver::new(ProteinCache::default()) {
        Ok(resolver) => resolver,
        Err(e) => {
            eprintln!("Failed to initialize the protein resolver: {e}");
            return ExitCode::FAILURE;
        }
    };
    match resolver.search(query, SEARCH_LIMIT) {
        Ok(proteins) if proteins.is_empty() => {
            println!("No secreted human proteins match {query:?}");
            ExitCode::SUCCESS
        }
        Ok(proteins) => {
            for protein in &proteins {
                println!(
                    "{}  {}  {} aa  signal {} aa  {}",
                    protein.accession,
                    protein.gene_name,
                    protein.length,
                    protein.signal_peptide_end,
                    protein.protein_name
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Search failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_fasta(path: &str, mode: DetectionMode) -> ExitCode {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Cannot read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let record = sequence::parse_fasta(&text);
    if let Some(name) = &record.name {
        info!("analyzing {name} from {path}");
    }

    let params = AnalysisParams {
        mode,
        ..AnalysisParams::default()
    };
    let oracle = build_oracle();
    let oracle_ref = oracle.as_ref().map(|c| c as &dyn BioactivityOracle);

    match analyze_sequence(&record.sequence, &params, oracle_ref, None) {
        Ok(report) => {
            let label = record
                .id
                .or(record.name)
                .or(record.header)
                .unwrap_or_else(|| path.to_string());
            print_report(&label, &report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Analysis failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_accessions(accessions: &[String], mode: DetectionMode) -> ExitCode {
    info!("Starting peptide prediction ({} mode)", mode.as_str());

    let oracle = build_oracle();
    let oracle_ref = oracle.as_ref().map(|c| c as &dyn BioactivityOracle);

    let mut resolver = match ProteinResolver::new(ProteinCache::default()) {
        Ok(resolver) => resolver,
        Err(e) => {
            eprintln!("Failed to initialize the protein resolver: {e}");
            return ExitCode::FAILURE;
        }
    };

    let summary = analyze_batch(&mut resolver, accessions, mode, oracle_ref);

    for result in &summary.results {
        println!("{}", "-".repeat(60));
        match result.status {
            ProteinStatus::NotFound => {
                println!("{}: not found or not secreted", result.protein_id);
                continue;
            }
            ProteinStatus::Error => {
                println!(
                    "{}: analysis failed: {}",
                    result.protein_id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
                continue;
            }
            ProteinStatus::Success => {}
        }

        let Some(report) = result.report.as_ref() else {
            continue;
        };
        let label = format!(
            "{} ({}) - {}",
            result.gene_name.as_deref().unwrap_or("?"),
            result.protein_id,
            result.protein_name.as_deref().unwrap_or("?")
        );
        print_report(&label, report);
    }

    println!("{}", "-".repeat(60));
    println!(
        "Batch: {} requested, {} unique, {} successful, {} failed, {} not found",
        summary.total_proteins,
        summary.unique_proteins,
        summary.successful_proteins,
        summary.failed_proteins,
        summary.not_found.len()
    );

    ExitCode::SUCCESS
}

fn print_report(label: &str, report: &AnalysisReport) {
    println!("{label}");
    println!("Sequence length: {} aa", report.sequence_length);
    println!("Cleavage sites: {}", report.cleavage_sites_count);
    println!(
        "Candidate peptides: {} ({} in optimal range)",
        report.peptides.len(),
        report.peptides_in_range
    );

    for (i, peptide) in report.top_peptides.iter().enumerate() {
        println!(
            "Peptide {}: {} ({} aa, {}..{}, score {:.1} [{}])",
            i + 1,
            peptide.sequence,
            peptide.length,
            peptide.start,
            peptide.end,
            peptide.bioactivity_score,
            peptide.bioactivity_source.as_str()
        );
        for ptm in &peptide.ptms {
            println!("  PTM: {}", ptm.description);
        }
        if let Some(modified) = &peptide.modified_sequence {
            println!("  Modified: {modified}");
        }
    }
    if report.peptides.len() > MAX_PEPTIDES_TO_DISPLAY {
        println!(
            "...and {} more peptides",
            report.peptides.len() - MAX_PEPTIDES_TO_DISPLAY
        );
    }
}
