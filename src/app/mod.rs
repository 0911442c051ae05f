//! Application use cases: assembling, filtering, exporting and charting listings.

pub mod charts;
pub mod export;
pub mod filter;
pub mod listings;
mod session;

pub use charts::{histogram, map_points, preview, HistogramBin, MapPoint};
pub use export::{
    encode_csv, export_file_name, read_csv, write_export, CsvBlob, CsvExporter, CSV_MIME,
};
pub use filter::{apply_filter, unique_sorted, ZipCodeSet, ZipSelection};
pub use listings::{
    min_date, DateRange, ListingsAssembler, LISTINGS_ROW_LIMIT, LISTINGS_SQL, ZIP_CODES_SQL,
};
pub use session::DashboardSession;
