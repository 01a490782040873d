pub mod arkfunds;

pub use arkfunds::ArkFundsProvider;
