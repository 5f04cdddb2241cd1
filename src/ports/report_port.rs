//! Report generation port.

use std::io::Write;

use crate::domain::analytics::ResultsRecord;
use crate::domain::error::QuantsimError;

/// Renders a results record to a writer.
pub trait ReportPort {
    fn write(&self, results: &ResultsRecord, out: &mut dyn Write) -> Result<(), QuantsimError>;
}
