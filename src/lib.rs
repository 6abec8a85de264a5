// Textbook Fees - Core Library
// Exposes the calculation engine for the CLI, the viewer, and tests

pub mod grid;       // Untyped cell grids
pub mod error;      // Input and batch diagnostics
pub mod normalize;  // Tier1 / Tier2 title normalization
pub mod extract;    // Book list + purchase log extraction
pub mod resolver;   // Price lookup cascade
pub mod aggregate;  // Per-student totals, money rounding
pub mod engine;     // One calculation pass
pub mod source;     // CSV / TSV / workbook readers
pub mod report;     // Terminal text report
pub mod export;     // Totals to txt / csv / xlsx

// Re-export commonly used types
pub use grid::{Cell, Grid};
pub use error::{FeeError, SheetKind, UnmatchedPurchase};
pub use normalize::{tier1, tier2};
pub use extract::{
    extract_books, extract_purchases,
    BookEntry, StudentPurchase, BookColumns, StudentColumns,
};
pub use resolver::{
    resolve_all, AmbiguityPolicy, MatchResult, MatchTier, PriceIndex, Resolution,
};
pub use aggregate::{aggregate, format_money, round_money, FeeSummary, StudentTotal, TOTAL_LABEL};
pub use engine::{calculate, calculate_with, CalcOptions, FeeReport};
pub use source::{
    detect_format, get_reader, read_grid,
    GridReader, SourceFormat, CsvGridReader, SpreadsheetGridReader,
};
pub use report::{render, TextReport, AMBIGUOUS_WARNING, VERIFY_REMINDER};
pub use export::{export_totals, render_text, ExportFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
