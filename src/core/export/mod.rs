pub mod export_service;

pub use export_service::{
    build_table, Cell, ExportError, ExportSink, ExportTable, KEY_POINT_DELIMITER,
};
