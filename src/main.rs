//! rust_metagene command-line interface

use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use rust_metagene::cli::{Cli, Commands};
use rust_metagene::enrichment::translate_ranked;
use rust_metagene::io::{write_de_results, write_duplicates, write_loadings, write_pathway_table};
use rust_metagene::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["run", "enrich", "drug-matrix", "associate", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_metagene {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            reference,
            full,
            pathways,
            identifiers,
            namespace,
            drugs,
            drug,
            threshold,
            min_genes,
            output,
            keep_raw_names,
            threads,
        }) => run_pipeline_command(
            &reference,
            &full,
            &pathways,
            &identifiers,
            &namespace,
            &drugs,
            &drug,
            threshold,
            min_genes,
            &output,
            keep_raw_names,
            threads,
        ),
        Some(Commands::Enrich {
            expression,
            groups,
            case,
            control,
            gmt,
            gmt_namespace,
            identifiers,
            hierarchy,
            gene_alpha,
            pathway_alpha,
            min_size,
            max_size,
            de_output,
            output,
            keep_raw_names,
            threads,
        }) => run_enrich(
            &expression,
            &groups,
            &case,
            &control,
            &gmt,
            &gmt_namespace,
            identifiers.as_deref(),
            hierarchy.as_deref(),
            EnrichmentParams {
                gene_alpha,
                pathway_alpha,
                min_set_size: min_size,
                max_set_size: max_size,
            },
            de_output.as_deref(),
            &output,
            keep_raw_names,
            threads,
        ),
        Some(Commands::DrugMatrix {
            drugs,
            drug,
            output,
            duplicates,
            keep_raw_names,
        }) => run_drug_matrix(&drugs, &drug, &output, duplicates.as_deref(), keep_raw_names),
        Some(Commands::Associate {
            correlations,
            threshold,
            output,
            prefix,
        }) => run_associate(&correlations, threshold, &output, &prefix),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("rust_metagene v{}", VERSION);
    println!("Run `rust_metagene -h` for usage or `rust_metagene --help` for detailed information.");
}

fn print_short_help() {
    println!("rust_metagene v{}", VERSION);
    println!();
    println!("Usage: rust_metagene <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run          Metagene projection and drug association pipeline");
    println!("  enrich       Differential expression and pathway over-representation");
    println!("  drug-matrix  Build the drug x cell line response matrix");
    println!("  associate    Recompute associations at a new threshold");
    println!();
    println!("Run `rust_metagene <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("rust_metagene v{}", VERSION);
    println!("Pathway metagene projection and drug-response association");
    println!();
    println!("Usage: rust_metagene <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run          Metagene projection and drug association pipeline");
    println!("                 - Pathway gene sets resolved through an identifier map");
    println!("                 - Rank-1 SVD metagene fitted on the reference cohort");
    println!("                 - Projection onto the full cohort without refitting");
    println!("                 - Spearman correlation against drug responses");
    println!("  enrich       Welch t-test and hypergeometric gene-set test");
    println!("  drug-matrix  Build the drug x cell line response matrix");
    println!("  associate    Recompute associations at a new threshold");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  rust_metagene enrich -e reference.tsv -g groups.tsv --case sensitive \\");
    println!("    --control resistant --gmt reactome.gmt -i biomart.tsv -o pathways.tsv");
    println!();
    println!("  rust_metagene run -r reference.tsv -f ccle.tsv -p pathways.tsv \\");
    println!("    -i biomart.tsv -d gdsc.csv --drug Dasatinib -o results/");
    println!();
    println!("  rust_metagene associate -c results/correlations.tsv --threshold 0.6 -o results/");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn configure_threads(threads: usize) {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }
}

fn run_pipeline_command(
    reference_path: &str,
    full_path: &str,
    pathways_path: &str,
    identifiers_path: &str,
    namespace: &str,
    drugs_path: &str,
    drug_filter: &[String],
    threshold: f64,
    min_genes: usize,
    output_dir: &str,
    keep_raw_names: bool,
    threads: usize,
) -> Result<()> {
    configure_threads(threads);
    let canonical = !keep_raw_names;
    let pathway_namespace: GeneNamespace = namespace.parse()?;

    info!("Loading reference cohort from: {}", reference_path);
    let reference = read_expression_matrix(reference_path, canonical)?;
    info!("  {} genes, {} samples", reference.n_genes(), reference.n_samples());

    info!("Loading full cohort from: {}", full_path);
    let full = read_expression_matrix(full_path, canonical)?;
    info!("  {} genes, {} samples", full.n_genes(), full.n_samples());

    info!("Loading pathways from: {}", pathways_path);
    let pathways = read_pathway_table(pathways_path)?;

    info!("Loading identifier map from: {}", identifiers_path);
    let identifiers = read_identifier_map(identifiers_path)?;

    info!("Loading drug responses from: {}", drugs_path);
    let observations = read_drug_responses(drugs_path, canonical)?;

    let inputs = PipelineInputs {
        reference,
        full,
        pathways,
        identifiers,
        pathway_namespace,
        observations,
    };
    let params = PipelineParams {
        metagene: MetageneParams {
            min_genes,
            ..Default::default()
        },
        association: AssociationParams { threshold },
        drugs: drug_filter.to_vec(),
    };
    let output = run_pipeline(inputs, &params)?;

    let dir = Path::new(output_dir);
    std::fs::create_dir_all(dir)?;
    info!("Writing results to: {}", dir.display());
    write_labeled_matrix(dir.join("metagenes_reference.tsv"), "pathway", &output.metagenes.reference)?;
    write_labeled_matrix(dir.join("metagenes_full.tsv"), "pathway", &output.metagenes.full)?;
    write_loadings(dir.join("metagene_loadings.tsv"), &output.metagenes)?;
    write_labeled_matrix(dir.join("correlations.tsv"), "pathway", &output.correlations.matrix)?;
    write_associations(dir, "", &output.associations)?;
    if !output.drugs.duplicates().is_empty() {
        write_duplicates(dir.join("duplicate_observations.tsv"), output.drugs.duplicates())?;
    }
    write_json(dir.join("summary.json"), &output.summary)?;

    println!("\n{}", output.summary);
    info!("Done!");
    Ok(())
}

fn run_enrich(
    expression_path: &str,
    groups_path: &str,
    case: &str,
    control: &str,
    gmt_path: &str,
    gmt_namespace: &str,
    identifiers_path: Option<&str>,
    hierarchy_path: Option<&str>,
    params: EnrichmentParams,
    de_output: Option<&str>,
    output_path: &str,
    keep_raw_names: bool,
    threads: usize,
) -> Result<()> {
    configure_threads(threads);
    let gmt_namespace: GeneNamespace = gmt_namespace.parse()?;

    info!("Loading expression matrix from: {}", expression_path);
    let expression = read_expression_matrix(expression_path, !keep_raw_names)?;
    info!("  {} genes, {} samples", expression.n_genes(), expression.n_samples());

    info!("Loading sample groups from: {}", groups_path);
    let partition = SamplePartition::new(read_sample_groups(groups_path, !keep_raw_names)?, case, control)?;

    info!("Testing {} vs {} (Welch t-test)...", case, control);
    let ranked = WelchTTest.test(&expression, &partition)?;
    if let Some(path) = de_output {
        info!("Writing gene results to: {}", path);
        write_de_results(path, &ranked)?;
    }

    let ranked = if gmt_namespace == GeneNamespace::Ensembl {
        ranked
    } else {
        let path = identifiers_path.ok_or_else(|| MetageneError::InvalidInput {
            reason: format!("--identifiers is required for a {} gene-set database", gmt_namespace),
        })?;
        info!("Loading identifier map from: {}", path);
        let identifiers = read_identifier_map(path)?;
        translate_ranked(&ranked, &identifiers, GeneNamespace::Ensembl, gmt_namespace)
    };

    info!("Loading gene-set database from: {}", gmt_path);
    let database = read_gmt(gmt_path)?;
    info!("  {} gene sets", database.len());

    let method = OverRepresentation::new(params);
    let mut records = method.enrich(&ranked, &database)?;
    info!("{} enriched pathways", records.len());

    if let Some(path) = hierarchy_path {
        info!("Loading pathway hierarchy from: {}", path);
        let hierarchy = read_hierarchy(path)?;
        records = method.collapse(&records, &hierarchy);
        info!("  {} pathways after collapsing to parents", records.len());
    }

    info!("Writing pathway table to: {}", output_path);
    write_pathway_table(output_path, &records)?;
    info!("Done!");
    Ok(())
}

fn run_drug_matrix(
    drugs_path: &str,
    drug_filter: &[String],
    output_path: &str,
    duplicates_path: Option<&str>,
    keep_raw_names: bool,
) -> Result<()> {
    info!("Loading drug responses from: {}", drugs_path);
    let observations = read_drug_responses(drugs_path, !keep_raw_names)?;

    let mut matrix = build_drug_matrix(&observations)?;
    if !drug_filter.is_empty() {
        matrix = matrix.restrict_drugs(drug_filter)?;
    }
    info!(
        "  {} drugs x {} cell lines, {} observed, {} duplicates",
        matrix.drugs().len(),
        matrix.cell_lines().len(),
        matrix.n_observed(),
        matrix.duplicates().len()
    );

    info!("Writing drug-response matrix to: {}", output_path);
    write_labeled_matrix(output_path, "drug", matrix.matrix())?;
    if let Some(path) = duplicates_path {
        info!("Writing duplicate diagnostics to: {}", path);
        write_duplicates(path, matrix.duplicates())?;
    }
    info!("Done!");
    Ok(())
}

fn run_associate(correlations_path: &str, threshold: f64, output_dir: &str, prefix: &str) -> Result<()> {
    info!("Loading correlation matrix from: {}", correlations_path);
    let correlations = read_correlation_matrix(correlations_path)?;
    info!("  {} pathways x {} drugs", correlations.n_rows(), correlations.n_cols());

    let index = associations(&correlations, threshold)?;
    info!(
        "{} associations with |r| > {} ({} pathways, {} drugs)",
        index.n_pairs(),
        threshold,
        index.by_pathway.len(),
        index.by_drug.len()
    );

    std::fs::create_dir_all(output_dir)?;
    write_associations(output_dir, prefix, &index)?;
    info!("Done!");
    Ok(())
}
