//! Offline pipeline turning the source PDF into indexed chunks.
//!
//! Every stage returns `Result<_, EtlError>`; a failing stage aborts the run.

mod error;
pub mod fetch;
pub mod runner;
pub mod stages;

pub use error::EtlError;
pub use fetch::{FetchOptions, fetch_pdf};
pub use runner::{EtlRunner, PdfSource};
pub use stages::{
    decode_chunks, encode_chunks, extract_chunks, index_chunks, load_chunks, publish_chunks,
    stage_pdf, validate_pdf,
};
