//! External guard providers

pub mod hypernative;

pub use hypernative::{AssessProvider, HypernativeClient};
