//! Input/Output for expression matrices, pathway tables and drug responses

mod matrix;
mod results;
mod tables;

pub use matrix::{
    read_correlation_matrix, read_expression_matrix, read_labeled_matrix, write_labeled_matrix,
};
pub use results::{write_json, ExcludedPathway, RunSummary};
pub use tables::{
    read_drug_responses, read_gmt, read_hierarchy, read_identifier_map, read_pathway_table,
    read_sample_groups, write_associations, write_de_results, write_duplicates,
    write_loadings, write_pathway_table,
};
