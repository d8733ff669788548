use anyhow::{Context, Result, anyhow, bail};
use protein_crosswalk::{
    alignment_job::AlignmentSession,
    codon_mapping::build_genome_transcript_mapping,
    config::CrosswalkConfig,
    pairwise::{AlignmentStats, LocalAligner, alignment_stats},
    resolver::{StructureTranscriptLink, check_ungapped, strip_trailing_stops},
    transcript::TranscriptFeature,
    Alignment, AlignmentAlgorithm, GenomeRange, version_cli_text,
};
use serde::{Deserialize, Serialize};
use std::{env, fs};

fn usage() {
    eprintln!(
        "Usage:\n  \
  crosswalk_cli --version\n  \
  crosswalk_cli [--config PATH] align SEQ1 SEQ2 [ALGORITHM]\n  \
  crosswalk_cli [--config PATH] crosswalk '<link-json>'\n  \
  crosswalk_cli [--config PATH] residue-to-genome '<link-json>' RESIDUE [END_RESIDUE]\n  \
  crosswalk_cli [--config PATH] genome-to-residue '<link-json>' COORD\n  \
  crosswalk_cli [--config PATH] config show|init PATH\n\n  \
  link-json: {{\"transcript\": {{...}}, \"transcriptSequence\": \"...\", \"structureSequence\": \"...\"}}\n  \
  Tip: pass @file instead of an inline sequence or JSON value; RUST_LOG=debug traces a run"
    );
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRequest {
    transcript: TranscriptFeature,
    transcript_sequence: String,
    structure_sequence: String,
}

#[derive(Serialize)]
struct AlignOutput {
    algorithm: AlignmentAlgorithm,
    alignment: Alignment,
    stats: AlignmentStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkSummary {
    ref_name: String,
    strand: i8,
    identity: bool,
    mapped_structure_residues: usize,
    transcript_residues: usize,
    alignment: Option<Alignment>,
    structure_to_transcript: std::collections::BTreeMap<usize, usize>,
}

fn load_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .map(|text| text.trim().to_string())
            .with_context(|| format!("Could not read argument file '{path}'")),
        None => Ok(value.to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn parse_global_config_arg(args: &[String]) -> (Option<String>, usize) {
    if args.len() >= 3 && args[1] == "--config" {
        return (Some(args[2].clone()), 3);
    }
    (None, 1)
}

fn load_config(path: Option<&str>) -> Result<CrosswalkConfig> {
    let mut config = match path {
        Some(path) => CrosswalkConfig::load_from_path(path)?,
        None => CrosswalkConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn build_link(config: &CrosswalkConfig, json: &str) -> Result<StructureTranscriptLink> {
    let request: LinkRequest =
        serde_json::from_str(&load_arg(json)?).context("Invalid link JSON")?;
    let mapping = build_genome_transcript_mapping(&request.transcript)?;
    match LocalAligner::for_algorithm(config.algorithm) {
        Some(aligner) => Ok(StructureTranscriptLink::new(
            mapping,
            &request.transcript_sequence,
            &request.structure_sequence,
            aligner,
        )?),
        None => {
            check_ungapped(&request.transcript_sequence, &request.structure_sequence)?;
            let structure = strip_trailing_stops(&request.structure_sequence);
            let transcript = strip_trailing_stops(&request.transcript_sequence);
            if structure.eq_ignore_ascii_case(transcript) {
                return Ok(StructureTranscriptLink::new(
                    mapping,
                    transcript,
                    structure,
                    LocalAligner::Global,
                )?);
            }
            let alignment = align_in_session(config, structure, transcript)?;
            Ok(StructureTranscriptLink::from_alignment(mapping, alignment)?)
        }
    }
}

fn align_in_session(config: &CrosswalkConfig, seq1: &str, seq2: &str) -> Result<Alignment> {
    let mut session = AlignmentSession::new(config.clone())?;
    session.request(seq1, seq2);
    let alignment = session.wait()?;
    if let Some(progress) = session.last_progress() {
        log::info!("{}", progress.message);
    }
    Ok(alignment)
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| anyhow!("Invalid {what} '{value}', expected a non-negative integer"))
}

fn main() {
    env_logger::Builder::from_default_env().init();
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        bail!("Missing command");
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", version_cli_text());
        return Ok(());
    }

    let (config_path, cmd_idx) = parse_global_config_arg(&args);
    if args.len() <= cmd_idx {
        usage();
        bail!("Missing command");
    }
    let command = &args[cmd_idx];

    match command.as_str() {
        "align" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                bail!("align requires: SEQ1 SEQ2 [ALGORITHM]");
            }
            let mut config = load_config(config_path.as_deref())?;
            if let Some(name) = args.get(cmd_idx + 3) {
                config.algorithm = AlignmentAlgorithm::from_name(name)
                    .ok_or_else(|| anyhow!("Unknown alignment algorithm '{name}'"))?;
                config.validate()?;
            }
            let seq1 = load_arg(&args[cmd_idx + 1])?;
            let seq2 = load_arg(&args[cmd_idx + 2])?;
            let alignment = align_in_session(&config, &seq1, &seq2)?;
            print_json(&AlignOutput {
                algorithm: config.algorithm,
                stats: alignment_stats(&alignment),
                alignment,
            })
        }
        "crosswalk" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                bail!("Missing link JSON");
            }
            let config = load_config(config_path.as_deref())?;
            let link = build_link(&config, &args[cmd_idx + 1])?;
            print_json(&LinkSummary {
                ref_name: link.mapping.ref_name.clone(),
                strand: link.mapping.strand.as_i8(),
                identity: link.is_identity(),
                mapped_structure_residues: link.structure_to_transcript.len(),
                transcript_residues: link.mapping.residue_count(),
                alignment: link.alignment.clone(),
                structure_to_transcript: link.structure_to_transcript.clone(),
            })
        }
        "residue-to-genome" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                bail!("residue-to-genome requires: LINK_JSON RESIDUE [END_RESIDUE]");
            }
            let config = load_config(config_path.as_deref())?;
            let link = build_link(&config, &args[cmd_idx + 1])?;
            let residue: usize = parse_number(&args[cmd_idx + 2], "residue")?;
            match args.get(cmd_idx + 3) {
                Some(end) => {
                    let end: usize = parse_number(end, "end residue")?;
                    if end < residue {
                        bail!("End residue {end} is before start residue {residue}");
                    }
                    print_json(&link.structure_span_to_genome_ranges(residue..end + 1))
                }
                None => {
                    let range: Option<GenomeRange> = link.structure_residue_to_genome_range(residue);
                    print_json(&range)
                }
            }
        }
        "genome-to-residue" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                bail!("genome-to-residue requires: LINK_JSON COORD");
            }
            let config = load_config(config_path.as_deref())?;
            let link = build_link(&config, &args[cmd_idx + 1])?;
            let coord: u64 = parse_number(&args[cmd_idx + 2], "genome coordinate")?;
            print_json(&link.genome_to_structure_residue(coord))
        }
        "config" => {
            let sub = args.get(cmd_idx + 1).map(String::as_str);
            match sub {
                Some("show") => print_json(&load_config(config_path.as_deref())?),
                Some("init") => {
                    let target = args
                        .get(cmd_idx + 2)
                        .ok_or_else(|| anyhow!("config init requires a target PATH"))?;
                    CrosswalkConfig::default().save_to_path(target)?;
                    println!("Wrote default configuration to '{target}'");
                    Ok(())
                }
                _ => {
                    usage();
                    bail!("config requires 'show' or 'init PATH'");
                }
            }
        }
        _ => {
            usage();
            Err(anyhow!("Unknown command '{command}'"))
        }
    }
}
