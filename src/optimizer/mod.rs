//! Search optimizer and knee detection
//!
//! The two numeric engines of the tool: the adaptive bracketing search
//! that decides which queue depths to benchmark, and the curve-fit +
//! half-latency machinery that locates the latency knee.

pub mod curve;
pub mod knee;
pub mod search;

pub use curve::LatencyCurve;
pub use knee::{KneeDetector, KneePoint, DEFAULT_ALPHA};
pub use search::{SearchOptimizer, SearchState};
