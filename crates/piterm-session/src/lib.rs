//! Query state for piterm.
//!
//! Holds the two switchable query definitions, their persistence between
//! runs, the credential pair, and small input-normalization helpers used
//! by the query commands.

pub mod credentials;
pub mod query;
pub mod session;
pub mod time;

pub use credentials::Credentials;
pub use query::{
    BoundaryType, CalculationBasis, Query, QueryType, SummaryType, TimestampCalculation,
    split_list,
};
pub use session::Session;
