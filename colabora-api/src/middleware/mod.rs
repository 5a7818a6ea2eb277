/// Middleware modules for the API server
///
/// - `format`: JSON to XML response negotiation
/// - `role`: Global role guard for write routes

pub mod format;
pub mod role;
