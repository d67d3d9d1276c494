pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubSource;

#[cfg(feature = "backend-tract")]
pub use tract::TractSource;
