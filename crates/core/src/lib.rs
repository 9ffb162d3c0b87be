//! Core document ingestion logic for Dossier.
//!
//! This crate contains the pipeline that turns an uploaded file into a
//! durably stored, integrity-verified PDF with a stable URL. It has no web
//! framework or database dependencies; persistence is reached through the
//! [`document::DocumentRecorder`] trait.
//!
//! # Modules
//!
//! - `conversion` - External converter orchestration with scoped temp files
//! - `storage` - B2-style object store client with a single-flight session
//! - `document` - Document record types and the recorder seam
//! - `ingestion` - The `validate → normalize → store → record` gateway

pub mod conversion;
pub mod document;
pub mod ingestion;
pub mod storage;
