#[cfg(feature = "backend_nmdbus")]
pub mod nmdbus;

#[cfg(any(test, feature = "backend_mock"))]
pub mod mock;
