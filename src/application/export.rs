// Export pipeline - renders the loaded series to downloadable files
use crate::domain::device::DeviceInfo;
use crate::domain::error::TelemetryError;
use crate::domain::export::{ExportArtifact, artifact_name, flatten};
use crate::domain::telemetry::SeriesSet;
use crate::domain::time_range::TimeRange;
use crate::infrastructure::csv_export::{CSV_CONTENT_TYPE, render_csv};
use crate::infrastructure::pdf_export::{PDF_CONTENT_TYPE, PdfReport, render_pdf};

/// Both exporters take the same read-only snapshot and produce the same row
/// order. An empty set yields `None`: nothing to export, not an error.
pub struct ExportPipeline;

impl ExportPipeline {
    pub fn csv(
        device: &DeviceInfo,
        range: &TimeRange,
        series: &SeriesSet,
    ) -> Result<Option<ExportArtifact>, TelemetryError> {
        if series.is_empty() {
            tracing::debug!(device_id = %device.id, "Nothing to export as CSV");
            return Ok(None);
        }

        let rows = flatten(series);
        let bytes = render_csv(device, &rows)?;
        tracing::info!(device_id = %device.id, rows = rows.len(), "Exported CSV");

        Ok(Some(ExportArtifact {
            file_name: artifact_name(device, range, "csv"),
            content_type: CSV_CONTENT_TYPE,
            bytes,
        }))
    }

    pub fn pdf(
        device: &DeviceInfo,
        range: &TimeRange,
        series: &SeriesSet,
    ) -> Result<Option<ExportArtifact>, TelemetryError> {
        if series.is_empty() {
            tracing::debug!(device_id = %device.id, "Nothing to export as PDF");
            return Ok(None);
        }

        let rows = flatten(series);
        let bytes = render_pdf(&PdfReport {
            device,
            range,
            rows: &rows,
        });
        tracing::info!(device_id = %device.id, rows = rows.len(), "Exported PDF");

        Ok(Some(ExportArtifact {
            file_name: artifact_name(device, range, "pdf"),
            content_type: PDF_CONTENT_TYPE,
            bytes,
        }))
    }
}
