//! Format normalization through external converter processes.
//!
//! Every accepted upload can be turned into a PDF. Raster images go through
//! an image converter, everything else through an office suite running
//! headless. Each invocation is a conversion job with its own
//! temp input and output files, removed when the job ends whatever the
//! outcome.

mod error;
mod normalizer;

pub use error::ConversionError;
pub use normalizer::{ConverterKind, FormatNormalizer, is_well_formed_pdf, normalized_extension};
