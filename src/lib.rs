//! Arrange photos into a slideshow that maximizes the interest of every
//! transition between consecutive slides.

pub mod core;
pub mod services;
