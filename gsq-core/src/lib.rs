// gsq-core/src/lib.rs

// 1. Documentation
#![allow(missing_docs)] // On autorise le manque de doc pour le moment

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Contrats: DatasetSource, TableSink, Evaluator, CredentialProvider, HttpTransport
pub mod ports;

// 2. Domain (Cœur du métier)
// Métriques, histogrammes, violations, échantillonnage.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB, reqwest, credentials Azure ML, config YAML, évaluateurs.
pub mod infrastructure;

// 4. Application (Use Cases)
// Annotation par lots et orchestration du pipeline.
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use gsq_core::GsqError;
pub use error::GsqError;

#[cfg(test)]
pub(crate) mod test_support;
