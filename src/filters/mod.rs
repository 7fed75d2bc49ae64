//! Output filters used to smooth tracked trajectories: a timestamped
//! averaging FIFO, exponential relation smoothing and one-Euro filters.

pub mod fifo;
pub mod lowpass;
pub mod one_euro;
pub mod smoothing;

pub use fifo::FilterFifo3;
pub use lowpass::{LowPassIIR, LowPassIIRVec3};
pub use one_euro::{OneEuroF32, OneEuroQuat, OneEuroVec2, OneEuroVec3};
pub use smoothing::ExponentialSmoother;
