pub mod google_auth;
pub mod sheets_sink;
pub mod xlsx_sink;

pub use google_auth::GoogleAuthenticator;
pub use sheets_sink::GoogleSheetsSink;
pub use xlsx_sink::XlsxSink;
