pub mod arbiter;
pub mod authorization;
pub mod generation;
pub mod images;
pub mod pipeline;
pub mod publish;
pub mod regional;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod variants;
