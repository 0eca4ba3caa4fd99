//! ACE loader: recognizes and launches applications packaged in the
//! ACE format, ported from `is_ace_cartridge`/`launch_ace_cartridge`.
//!
//! Unlike every `cart_schemes` engine, ACE is not a bus-snooping bank
//! switcher: it stages the application image into flash once and then
//! jumps native code directly into it. The MCU never comes back.

pub mod header;

use cart_arena::{load_image, FileProvider, MemoryArena};
use cart_core::CartError;
use header::{AceHeader, HEADER_SIZE};

/// True as soon as the buffer's first bytes carry the ACE magic number.
/// Mirrors `is_ace_cartridge`'s cheap pre-check before anything is
/// staged into flash.
pub fn is_ace_cartridge(buffer: &[u8]) -> bool {
    AceHeader::looks_like_ace(buffer)
}

/// External collaborator: the native jump into the freshly staged
/// application. Production code never returns from this call; the
/// trait exists so the host build and tests can observe that the jump
/// was attempted instead of actually vectoring into foreign code.
pub trait NativeEntry {
    fn jump(&mut self, entry_point: u32) -> Result<(), CartError>;
}

/// Stages an ACE application's image into the arena and hands control
/// to it at `header.entry_point`, following `launch_ace_cartridge`:
/// parse the header, reject anything over the 448 KiB ACE limit, then
/// stream the remainder of the file the same way any other oversized
/// image loads (`cart_arena::load_image`).
pub fn launch_ace_cartridge<F: cart_arena::FlashDriver>(
    arena: &mut MemoryArena<F>,
    buffer: &[u8],
    provider: &mut impl FileProvider,
    path: &str,
    entry: &mut impl NativeEntry,
) -> Result<(), CartError> {
    if buffer.len() < HEADER_SIZE {
        return Err(CartError::FormatError("buffer too short for an ACE header".into()));
    }

    let header = AceHeader::parse(buffer).map_err(|e| CartError::FormatError(e.to_string()))?;

    load_image(arena, header.rom_size, &buffer[HEADER_SIZE..], provider, path)?;

    entry.jump(header.entry_point)
}
