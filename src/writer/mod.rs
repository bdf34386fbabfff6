//! Output stage: serialises the finished document.
pub mod json;
