use crate::errors::ServerError;
use crate::responses::ResultResp;
use astra::{Body, ResponseBuilder};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Serves workbook bytes as a download named `filename`.
pub fn xlsx_response(workbook: Vec<u8>, filename: &str) -> ResultResp {
    tracing::debug!(bytes = workbook.len(), filename, "sending workbook");

    ResponseBuilder::new()
        .status(200)
        .header("Content-Type", XLSX_CONTENT_TYPE)
        .header("Content-Length", workbook.len())
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename.replace('"', "")),
        )
        .body(Body::from(workbook))
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build workbook response");
            ServerError::InternalError
        })
}
