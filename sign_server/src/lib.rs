pub mod clip;
pub mod error;
pub mod features;
pub mod handle;
pub mod labels;
pub mod nn;
pub mod sequence;
pub mod session;
pub mod smoother;
pub mod utils;
