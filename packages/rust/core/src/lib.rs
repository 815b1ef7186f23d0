//! Enrichment pipeline for lessonpath.
//!
//! This crate turns raw video records into enriched records plus
//! per-domain learning pathways: prompting, response extraction, caching,
//! pacing, and pathway validation.

pub mod batch;
pub mod cache;
pub mod enricher;
pub mod extract;
pub mod pathways;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;
