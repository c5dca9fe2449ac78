//! Exporting and importing all of a user's data as JSON.

mod export;
mod import;

pub use export::{UserDataExport, export_data_endpoint, export_user_data};
pub use import::{
    ImportResults, JSON_FILE_FIELD, SectionResult, import_data_endpoint, import_user_data,
    parse_import_document,
};
