//! Tiered memory arena, flash state machine, and image loader.

pub mod flash;
pub mod loader;
pub mod region;

pub use flash::{FlashContext, FlashDriver, FlashError, InMemoryFlash};
pub use loader::{load_image, FileProvider};
pub use region::{plan, BankPointer, ImagePlan, MemoryArena, Region, BUFFER_CAPACITY, HOT_CAPACITY};
