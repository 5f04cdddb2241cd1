//! JSON results output.

use std::io::Write;

use crate::domain::analytics::ResultsRecord;
use crate::domain::error::QuantsimError;
use crate::ports::report_port::ReportPort;

#[derive(Default)]
pub struct JsonReport {
    pub pretty: bool,
}

impl JsonReport {
    fn to_io(e: serde_json::Error) -> QuantsimError {
        QuantsimError::Io(std::io::Error::other(e))
    }
}

impl ReportPort for JsonReport {
    fn write(&self, results: &ResultsRecord, out: &mut dyn Write) -> Result<(), QuantsimError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, results).map_err(Self::to_io)?;
        } else {
            serde_json::to_writer(&mut *out, results).map_err(Self::to_io)?;
        }
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> ResultsRecord {
        ResultsRecord {
            strategy: "moving_average".into(),
            instruments: vec!["SPY".into()],
            starting_cash: 1000.0,
            final_cash: 1000.0,
            final_equity: 1000.0,
            total_return: 0.0,
            annual_return: 0.0,
            yearly_returns: BTreeMap::from([(2024, 0.0)]),
            sharpe_ratio: None,
            sqn: None,
            max_drawdown: 0.0,
            max_drawdown_money: 0.0,
            max_drawdown_len: 0,
            closed_trades: 0,
            fills: 0,
            trades_won: 0,
            trades_lost: 0,
            rejected_orders: 0,
            bars_processed: 30,
        }
    }

    #[test]
    fn undefined_ratios_serialize_as_null() {
        let mut buf = Vec::new();
        JsonReport::default().write(&sample(), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert!(value["sharpe_ratio"].is_null());
        assert!(value["sqn"].is_null());
        assert_eq!(value["final_cash"], 1000.0);
        assert_eq!(value["yearly_returns"]["2024"], 0.0);
    }
}
