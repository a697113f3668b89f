pub mod bindings;
pub mod chain_reader;
pub mod funding_account;

pub use chain_reader::{ChainHead, ChainReader, InclusionView, L1Reader};
pub use funding_account::{FundingAccount, L1FundingAccount};
