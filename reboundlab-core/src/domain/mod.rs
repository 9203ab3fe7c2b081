//! Domain types for ReboundLab

pub mod bar;
pub mod event;
pub mod params;
pub mod portfolio;
pub mod series;
pub mod trade;

pub use bar::{Interval, PriceBar, MAX_LOOKAHEAD_DAYS};
pub use event::{DropEvent, Outcome, ResolvedEvent};
pub use params::{ParamError, RuleParameters};
pub use portfolio::PortfolioState;
pub use series::PriceSeries;
pub use trade::{TradeAction, TradeRecord};
