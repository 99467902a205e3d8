pub mod client;

pub use client::{CoinDcxClient, DEFAULT_API_BASE, DEFAULT_PUBLIC_BASE};
