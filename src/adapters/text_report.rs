//! Plain-text results summary.

use std::io::Write;

use crate::domain::analytics::ResultsRecord;
use crate::domain::error::QuantsimError;
use crate::ports::report_port::ReportPort;

pub struct TextReport;

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

impl TextReport {
    pub fn render(results: &ResultsRecord) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "Strategy: {} [{}]\n",
            results.strategy,
            results.instruments.join(", ")
        ));
        s.push_str(&format!("Bars: {}\n\n", results.bars_processed));
        s.push_str(&format!("Final Portfolio Value: {:.2}\n", results.final_equity));
        s.push_str(&format!("Final Cash: {:.2}\n", results.final_cash));
        s.push_str(&format!(
            "Total Return: {:.2}%\n\n",
            results.total_return * 100.0
        ));

        s.push_str(&format!(
            "Annual Return: {:.2}%\n",
            results.annual_return * 100.0
        ));
        for (year, ret) in &results.yearly_returns {
            s.push_str(&format!("  {}: {:.2}%\n", year, ret * 100.0));
        }
        s.push('\n');

        s.push_str(&format!("Sharpe Ratio: {}\n", fmt_opt(results.sharpe_ratio)));
        s.push_str(&format!("SQN: {}\n", fmt_opt(results.sqn)));
        s.push_str(&format!(
            "DrawDown: {:.2}% ({:.2}, {} bars)\n\n",
            results.max_drawdown, results.max_drawdown_money, results.max_drawdown_len
        ));

        s.push_str(&format!(
            "Trades: {} ({} won, {} lost)\n",
            results.closed_trades, results.trades_won, results.trades_lost
        ));
        s.push_str(&format!("Fills: {}\n", results.fills));
        s.push_str(&format!("Rejected Orders: {}\n", results.rejected_orders));
        s
    }
}

impl ReportPort for TextReport {
    fn write(&self, results: &ResultsRecord, out: &mut dyn Write) -> Result<(), QuantsimError> {
        out.write_all(Self::render(results).as_bytes())?;
        Ok(())
    }
}
