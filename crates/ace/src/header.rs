//! ACE file header: the fixed 36-byte prefix every valid `.ace` image
//! carries, ported field-for-field from `ACEFileHeader`.

use thiserror::Error;

pub const MAGIC: &[u8; 8] = b"ACE-2600";
pub const HEADER_SIZE: usize = 8 + 16 + 4 + 4 + 4 + 4;
pub const MAX_ROM_SIZE: u32 = 448 * 1024;

#[derive(Debug, Error)]
pub enum AceError {
    #[error("image too short to hold an ACE header")]
    Truncated,
    #[error("magic number does not match ACE-2600")]
    BadMagic,
    #[error("rom_size {0} exceeds the 448 KiB ACE limit")]
    RomTooLarge(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AceHeader {
    pub driver_name: [u8; 16],
    pub driver_version: u32,
    pub rom_size: u32,
    pub rom_checksum: u32,
    pub entry_point: u32,
}

impl AceHeader {
    /// True as soon as there's enough data to check the magic number,
    /// mirroring `is_ace_cartridge`'s early truncation check.
    pub fn looks_like_ace(image: &[u8]) -> bool {
        image.len() >= HEADER_SIZE && &image[..8] == MAGIC
    }

    pub fn parse(image: &[u8]) -> Result<Self, AceError> {
        if image.len() < HEADER_SIZE {
            return Err(AceError::Truncated);
        }
        if &image[..8] != MAGIC {
            return Err(AceError::BadMagic);
        }

        let mut driver_name = [0u8; 16];
        driver_name.copy_from_slice(&image[8..24]);

        let driver_version = u32::from_le_bytes(image[24..28].try_into().unwrap());
        let rom_size = u32::from_le_bytes(image[28..32].try_into().unwrap());
        let rom_checksum = u32::from_le_bytes(image[32..36].try_into().unwrap());
        let entry_point = u32::from_le_bytes(image[36..40].try_into().unwrap());

        if rom_size > MAX_ROM_SIZE {
            return Err(AceError::RomTooLarge(rom_size));
        }

        Ok(Self { driver_name, driver_version, rom_size, rom_checksum, entry_point })
    }
}
