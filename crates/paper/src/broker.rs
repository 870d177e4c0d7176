use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use common::{OrderSide, Position, Trade};

/// Relative slack on the cash check for buys.
const ROUNDING_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("order quantity is zero")]
    ZeroQuantity,

    #[error("insufficient cash: need {needed:.2}, have {available:.2}")]
    InsufficientCash { needed: f64, available: f64 },

    #[error("no open position to sell")]
    NothingToSell,
}

/// Cash, position and fill history of one simulated account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerState {
    pub cash: f64,
    pub position: Position,
    pub trades: Vec<Trade>,
}

/// Simulated broker for a single symbol.
///
/// Fills happen immediately at the supplied price with configurable slippage.
/// Buys pay more and sells receive less. Cash only moves through fills.
#[derive(Debug)]
pub struct PaperBroker {
    state: BrokerState,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperBroker {
    pub fn new(symbol: impl Into<String>, starting_cash: f64, slippage_bps: f64) -> Self {
        Self {
            state: BrokerState {
                cash: starting_cash,
                position: Position::flat(symbol),
                trades: Vec::new(),
            },
            slippage_bps,
        }
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn position(&self) -> &Position {
        &self.state.position
    }

    pub fn trades(&self) -> &[Trade] {
        &self.state.trades
    }

    pub fn into_state(self) -> BrokerState {
        self.state
    }

    /// Execution price for `side` given the bar's reference price.
    pub fn fill_price(&self, side: OrderSide, price: f64) -> f64 {
        match side {
            OrderSide::Buy => price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => price * (1.0 - self.slippage_bps / 10_000.0),
        }
    }

    /// Whole units the current cash can buy at `price`.
    pub fn affordable_quantity(&self, price: f64) -> u64 {
        let fill = self.fill_price(OrderSide::Buy, price);
        if fill <= 0.0 || !fill.is_finite() {
            return 0;
        }
        (self.state.cash / fill).floor().max(0.0) as u64
    }

    /// Buy `quantity` units, adding to the position.
    pub fn buy(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        quantity: u64,
    ) -> Result<&Trade, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }
        let fill_price = self.fill_price(OrderSide::Buy, price);
        let cost = fill_price * quantity as f64;
        // `floor(cash / fill) * fill` can land a few ulps above cash.
        let tolerance = self.state.cash.abs() * ROUNDING_TOLERANCE;
        if cost > self.state.cash + tolerance {
            return Err(OrderError::InsufficientCash {
                needed: cost,
                available: self.state.cash,
            });
        }

        self.state.cash = (self.state.cash - cost).max(0.0);
        self.state.position.quantity += quantity;
        Ok(self.record(timestamp, OrderSide::Buy, fill_price, quantity))
    }

    /// Sell the entire position.
    pub fn sell_all(&mut self, timestamp: DateTime<Utc>, price: f64) -> Result<&Trade, OrderError> {
        let quantity = self.state.position.quantity;
        if quantity == 0 {
            return Err(OrderError::NothingToSell);
        }
        let fill_price = self.fill_price(OrderSide::Sell, price);

        self.state.cash += fill_price * quantity as f64;
        self.state.position.quantity = 0;
        Ok(self.record(timestamp, OrderSide::Sell, fill_price, quantity))
    }

    /// Value of the open position at `price`, without slippage.
    pub fn position_value(&self, price: f64) -> f64 {
        self.state.position.quantity as f64 * price
    }

    fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        side: OrderSide,
        price: f64,
        quantity: u64,
    ) -> &Trade {
        debug!(
            symbol = %self.state.position.symbol,
            side = %side,
            fill = price,
            qty = quantity,
            cash = self.state.cash,
            "Paper fill simulated"
        );
        self.state.trades.push(Trade {
            timestamp,
            side,
            price,
            quantity,
            resulting_cash: self.state.cash,
        });
        &self.state.trades[self.state.trades.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn paper_buy_fill_applies_positive_slippage() {
        let mut broker = PaperBroker::new("AAPL", 10_000.0, 10.0); // 10 bps
        let fill = broker.buy(ts(), 1000.0, 1).unwrap();

        let expected = 1000.0 * (1.0 + 10.0 / 10_000.0);
        assert!(
            (fill.price - expected).abs() < 1e-6,
            "Buy fill price {}, expected {}",
            fill.price,
            expected
        );
    }

    #[test]
    fn paper_sell_fill_applies_negative_slippage() {
        let mut broker = PaperBroker::new("AAPL", 10_000.0, 10.0);
        broker.buy(ts(), 1000.0, 1).unwrap();
        let fill = broker.sell_all(ts(), 1000.0).unwrap();

        let expected = 1000.0 * (1.0 - 10.0 / 10_000.0);
        assert!((fill.price - expected).abs() < 1e-6);
    }

    #[test]
    fn buy_moves_cash_into_position() {
        let mut broker = PaperBroker::new("F", 100.0, 0.0);
        let qty = broker.affordable_quantity(11.0);
        assert_eq!(qty, 9);

        let trade = broker.buy(ts(), 11.0, qty).unwrap().clone();
        assert_eq!(trade.resulting_cash, 1.0);
        assert_eq!(broker.position().quantity, 9);
        assert_eq!(broker.trades().len(), 1);
    }

    #[test]
    fn sell_all_flattens_position() {
        let mut broker = PaperBroker::new("F", 100.0, 0.0);
        broker.buy(ts(), 11.0, 9).unwrap();
        broker.sell_all(ts(), 8.0).unwrap();

        assert!(broker.position().is_flat());
        assert_eq!(broker.cash(), 73.0);
    }

    #[test]
    fn all_cash_buy_survives_float_rounding() {
        let mut broker = PaperBroker::new("MSFT", 7895.16, 0.0);
        let qty = broker.affordable_quantity(86.76);
        assert_eq!(qty, 91);

        let trade = broker.buy(ts(), 86.76, qty).unwrap().clone();
        assert_eq!(trade.quantity, 91);
        assert!(trade.resulting_cash >= 0.0);
        assert!(trade.resulting_cash < 1e-6);
    }

    #[test]
    fn one_unit_too_many_is_still_rejected() {
        let mut broker = PaperBroker::new("MSFT", 7895.16, 0.0);
        assert!(matches!(
            broker.buy(ts(), 86.76, 92),
            Err(OrderError::InsufficientCash { .. })
        ));
    }

    #[test]
    fn rejects_unaffordable_and_empty_orders() {
        let mut broker = PaperBroker::new("F", 10.0, 0.0);
        assert!(matches!(
            broker.buy(ts(), 11.0, 1),
            Err(OrderError::InsufficientCash { .. })
        ));
        assert_eq!(broker.buy(ts(), 11.0, 0).unwrap_err(), OrderError::ZeroQuantity);
        assert_eq!(broker.sell_all(ts(), 11.0).unwrap_err(), OrderError::NothingToSell);
        assert_eq!(broker.cash(), 10.0);
        assert!(broker.trades().is_empty());
    }
}
