//! Command-line interface for rust_metagene

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_metagene")]
#[command(version)]
#[command(about = "Pathway metagene projection and drug-response association")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full metagene / drug association pipeline
    #[command(
        about = "Run the full metagene / drug association pipeline",
        long_about = "Run the full metagene / drug association pipeline\n\n\
            Resolves enriched pathways to expression genes, fits one metagene per\n\
            pathway on the reference cohort, projects it onto the full cohort,\n\
            builds the drug x cell line response matrix and reports Spearman\n\
            associations above the threshold.",
        after_long_help = "\
Examples:
  # Dasatinib and all other GDSC drugs, leading edges in Entrez ids
  rust_metagene run -r reference.tsv -f ccle.tsv -p pathways.tsv \\
    -i biomart.tsv -d gdsc.csv -o results/

  # Dasatinib only, stricter threshold
  rust_metagene run -r reference.tsv -f ccle.tsv -p pathways.tsv \\
    -i biomart.tsv -d gdsc.csv --drug Dasatinib --threshold 0.5 -o results/"
    )]
    Run {
        /// Reference cohort expression matrix
        #[arg(short, long,
            long_help = "Reference cohort expression matrix (genes x samples).\n\
                First column = Ensembl gene ids, remaining columns = log-scale\n\
                normalised expression per cell line. TSV or CSV (auto-detected).")]
        reference: String,

        /// Full cohort expression matrix
        #[arg(short, long,
            long_help = "Full cohort expression matrix, same layout as --reference.\n\
                The metagenes are projected onto these samples.")]
        full: String,

        /// Pathway enrichment table
        #[arg(short, long,
            long_help = "Pathway enrichment table, most significant first.\n\
                Needs an id column and a gene list column (genes, core_enrichment,\n\
                geneID) with members separated by '/', ';' or ','.")]
        pathways: String,

        /// Gene identifier map (ensembl, entrez, symbol)
        #[arg(short, long)]
        identifiers: String,

        /// Namespace of pathway gene ids [default: entrez]
        #[arg(short, long, default_value = "entrez",
            long_help = "Namespace of the gene ids in the pathway table.\n\
                ensembl | entrez | symbol")]
        namespace: String,

        /// Long-format drug-response table
        #[arg(short, long,
            long_help = "Long-format drug-response table with columns drug, cell_line,\n\
                response (GDSC DRUG_NAME, CELL_LINE_NAME, AUC also accepted).")]
        drugs: String,

        /// Restrict to this drug (repeatable)
        #[arg(long, value_name = "NAME")]
        drug: Vec<String>,

        /// Association threshold on |r| [default: 0.4]
        #[arg(long, default_value = "0.4")]
        threshold: f64,

        /// Minimum resolved genes per pathway [default: 5]
        #[arg(long, default_value = "5")]
        min_genes: usize,

        /// Output directory [default: metagene_results]
        #[arg(short, long, default_value = "metagene_results")]
        output: String,

        /// Keep cell-line names as written
        #[arg(long,
            long_help = "Do not canonicalise cell-line names.\n\
                By default names are upper-cased and stripped of everything but\n\
                letters and digits, so HCC-1954 and hcc1954 match.")]
        keep_raw_names: bool,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,
    },

    /// Differential expression and over-representation analysis
    #[command(
        about = "Differential expression and over-representation analysis",
        long_about = "Differential expression and over-representation analysis\n\n\
            Welch t-test between two sample groups of an expression matrix,\n\
            followed by a hypergeometric test of the significant genes against\n\
            each gene set of a GMT database. Writes a pathway table for `run`.",
        after_long_help = "\
Examples:
  rust_metagene enrich -e reference.tsv -g groups.tsv --case sensitive \\
    --control resistant --gmt reactome.gmt -i biomart.tsv -o pathways.tsv"
    )]
    Enrich {
        /// Expression matrix (Ensembl gene ids)
        #[arg(short, long)]
        expression: String,

        /// Sample groups (sample, group)
        #[arg(short, long)]
        groups: String,

        /// Case group label
        #[arg(long)]
        case: String,

        /// Control group label
        #[arg(long)]
        control: String,

        /// Gene-set database in GMT format
        #[arg(long)]
        gmt: String,

        /// Namespace of GMT gene ids [default: entrez]
        #[arg(long, default_value = "entrez")]
        gmt_namespace: String,

        /// Identifier map, required when the GMT is not in Ensembl ids
        #[arg(short, long)]
        identifiers: Option<String>,

        /// Pathway hierarchy (child, parent) for collapsing
        #[arg(long)]
        hierarchy: Option<String>,

        /// Adjusted p cutoff for significant genes [default: 0.05]
        #[arg(long, default_value = "0.05")]
        gene_alpha: f64,

        /// Adjusted p cutoff for reported pathways [default: 0.05]
        #[arg(long, default_value = "0.05")]
        pathway_alpha: f64,

        /// Smallest gene set tested [default: 10]
        #[arg(long, default_value = "10")]
        min_size: usize,

        /// Largest gene set tested [default: 500]
        #[arg(long, default_value = "500")]
        max_size: usize,

        /// Also write per-gene test results here
        #[arg(long)]
        de_output: Option<String>,

        /// Output pathway table [default: pathways.tsv]
        #[arg(short, long, default_value = "pathways.tsv")]
        output: String,

        /// Keep sample names as written
        #[arg(long)]
        keep_raw_names: bool,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,
    },

    /// Build the dense drug x cell line response matrix
    DrugMatrix {
        /// Long-format drug-response table
        #[arg(short, long)]
        drugs: String,

        /// Restrict to this drug (repeatable)
        #[arg(long, value_name = "NAME")]
        drug: Vec<String>,

        /// Output matrix file
        #[arg(short, long)]
        output: String,

        /// Write duplicate (drug, cell line) diagnostics here
        #[arg(long)]
        duplicates: Option<String>,

        /// Keep cell-line names as written
        #[arg(long)]
        keep_raw_names: bool,
    },

    /// Recompute association lists from a correlation matrix
    #[command(
        about = "Recompute association lists from a correlation matrix",
        long_about = "Recompute association lists from a correlation matrix\n\n\
            Reads correlations.tsv written by `run` and writes the pathway and\n\
            drug association views for a new threshold."
    )]
    Associate {
        /// Correlation matrix (pathways x drugs)
        #[arg(short, long)]
        correlations: String,

        /// Association threshold on |r| [default: 0.4]
        #[arg(long, default_value = "0.4")]
        threshold: f64,

        /// Output directory [default: .]
        #[arg(short, long, default_value = ".")]
        output: String,

        /// File name prefix for the association tables
        #[arg(long, default_value = "")]
        prefix: String,
    },
}
