pub mod client;
pub mod memory;

pub use client::TradeStore;
pub use memory::MemoryTradeStore;
