pub use anyhow::Result;
