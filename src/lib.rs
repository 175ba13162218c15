//! Conversion of CYACD bootloader update files into flat binary flash images.

pub mod api;
pub mod cyacd;
pub mod image;
pub mod memory;
pub mod operation;
