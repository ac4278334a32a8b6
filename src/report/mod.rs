//! Exporting a user's ledger as a PDF report.

mod endpoint;
mod layout;
mod pdf;

pub use endpoint::download_pdf;

use layout::build_report;
use pdf::render_pdf;
