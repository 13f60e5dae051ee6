//! Price data access port.

use crate::domain::error::SimError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

pub trait PriceSource {
    /// Cleaned closes for `symbol` between `start_date` and `end_date`, inclusive.
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SimError>;

    fn list_symbols(&self) -> Result<Vec<String>, SimError>;

    /// First date, last date and number of usable closes, or `None` when the
    /// symbol has no data.
    fn data_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SimError> {
        let series = self.fetch_closes(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
        Ok(match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => Some((first, last, series.len())),
            _ => None,
        })
    }
}
