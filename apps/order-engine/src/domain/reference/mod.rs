//! Reference Data
//!
//! Accounts, instruments and balances owned by other services. The
//! engine reads them through the lookup traits in [`repository`] and
//! never writes them.

mod entities;
pub mod repository;

pub use entities::{Account, Balance, Instrument};
pub use repository::{AccountRepository, BalanceRepository, InstrumentRepository, LookupError};
