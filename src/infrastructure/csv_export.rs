// Delimited-text rendering of export rows
use crate::domain::device::DeviceInfo;
use crate::domain::error::TelemetryError;
use crate::domain::export::{EXPORT_HEADER, ExportRow};
use std::io::Write;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Writes the device preamble, the header and one record per row.
pub fn write_csv<W: Write>(
    device: &DeviceInfo,
    rows: &[ExportRow],
    writer: &mut csv::Writer<W>,
) -> Result<(), csv::Error> {
    writer.write_record(["Device Name", device.name.as_str()])?;
    writer.write_record(["Device ID", device.id.as_str()])?;
    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        writer.write_record([row.time.as_str(), row.key.as_str(), row.value.as_str()])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn render_csv(device: &DeviceInfo, rows: &[ExportRow]) -> Result<Vec<u8>, TelemetryError> {
    // the two-field preamble makes the record lengths uneven
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    write_csv(device, rows, &mut writer)?;

    writer
        .into_inner()
        .map_err(|e| TelemetryError::Export(e.to_string()))
}
