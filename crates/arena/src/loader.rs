//! Image Loader: fills the arena from a file provider, either entirely
//! into HotRam or staged through Buffer into Flash, following the same
//! chunked streaming strategy the 3E engine's `setup_cartridge_image`
//! uses (see DESIGN.md decision on the carried-over CCM/flash ordering
//! assumption).

use crate::flash::FlashDriver;
use crate::region::{MemoryArena, BUFFER_CAPACITY, HOT_CAPACITY};
use cart_core::CartError;

/// External collaborator: byte-addressable, read-only mass storage.
///
/// Mirrors the FatFs session shape the firmware actually drives: the
/// card is mounted once before any file touches it and unmounted once
/// the streaming section is done, `open`/`read`/`close` bracket a
/// single file within that session, and `size` reports the open file's
/// length the way `f_size` does.
pub trait FileProvider {
    fn mount(&mut self) -> Result<(), CartError>;
    fn open(&mut self, path: &str) -> Result<(), CartError>;
    fn size(&self) -> u32;
    fn seek(&mut self, pos: u32) -> Result<(), CartError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CartError>;
    fn close(&mut self);
    fn unmount(&mut self);
}

/// Populates `arena` from `buffer` (the bytes already staged in RAM,
/// as large as `BUFFER_CAPACITY` permits) and, if the image is larger
/// than that, streams the remainder from `path` through `provider`.
///
/// `buffer` must be exactly `min(image_size, BUFFER_CAPACITY)` bytes:
/// it is the fixed-size readahead block the caller always fills before
/// invoking the loader, not a function of how much of the file is
/// actually readable.
pub fn load_image<F: FlashDriver>(
    arena: &mut MemoryArena<F>,
    image_size: u32,
    buffer: &[u8],
    provider: &mut impl FileProvider,
    path: &str,
) -> Result<(), CartError> {
    if image_size == 0 {
        return Err(CartError::PlacementError("zero-size image".into()));
    }

    let hot_capacity = HOT_CAPACITY as u32;

    if image_size <= hot_capacity {
        arena.hot_mut()[..image_size as usize].copy_from_slice(&buffer[..image_size as usize]);
        return Ok(());
    }

    let flash_image_size = image_size - hot_capacity;
    if flash_image_size > arena.available_flash() {
        return Err(CartError::PlacementError(format!(
            "image needs {flash_image_size} bytes of flash, only {} available",
            arena.available_flash()
        )));
    }

    arena.prepare_flash(flash_image_size)?;

    let buffer_capacity = BUFFER_CAPACITY as u32;
    let flash_from_buffer = if image_size > buffer_capacity {
        buffer_capacity - hot_capacity
    } else {
        image_size - hot_capacity
    };

    arena.write_flash(&buffer[hot_capacity as usize..(hot_capacity + flash_from_buffer) as usize])?;

    if image_size <= buffer_capacity {
        arena.hot_mut()[..hot_capacity as usize].copy_from_slice(&buffer[..hot_capacity as usize]);
        return Ok(());
    }

    let flash_from_file = image_size - buffer_capacity;

    provider.mount()?;
    provider.open(path)?;
    provider.seek(buffer_capacity)?;

    let mut written = 0u32;
    let mut chunk = vec![0u8; hot_capacity as usize];
    while written < flash_from_file {
        let want = (flash_from_file - written).min(hot_capacity) as usize;
        let got = provider.read(&mut chunk[..want])?;
        if got == 0 {
            provider.close();
            provider.unmount();
            return Err(CartError::IoError("short read while streaming image to flash".into()));
        }
        written += got as u32;
        if (got as u32) < want as u32 && written < flash_from_file {
            provider.close();
            provider.unmount();
            return Err(CartError::IoError("short read while streaming image to flash".into()));
        }
        arena.write_flash(&chunk[..got])?;
    }
    provider.close();
    provider.unmount();

    arena.hot_mut()[..hot_capacity as usize].copy_from_slice(&buffer[..hot_capacity as usize]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::InMemoryFlash;
    use crate::region::{BankPointer, Region};
    use std::collections::HashMap;

    struct InMemoryFileProvider {
        files: HashMap<String, Vec<u8>>,
        cursor: usize,
        current: Option<String>,
        mounted: bool,
    }

    impl InMemoryFileProvider {
        fn new() -> Self {
            Self { files: HashMap::new(), cursor: 0, current: None, mounted: false }
        }

        fn insert(&mut self, path: &str, data: Vec<u8>) {
            self.files.insert(path.to_string(), data);
        }
    }

    impl FileProvider for InMemoryFileProvider {
        fn mount(&mut self) -> Result<(), CartError> {
            self.mounted = true;
            Ok(())
        }

        fn open(&mut self, path: &str) -> Result<(), CartError> {
            if !self.mounted {
                return Err(CartError::IoError("card not mounted".into()));
            }
            if !self.files.contains_key(path) {
                return Err(CartError::IoError(format!("no such file: {path}")));
            }
            self.current = Some(path.to_string());
            self.cursor = 0;
            Ok(())
        }

        fn size(&self) -> u32 {
            self.current.as_ref().map(|path| self.files[path].len() as u32).unwrap_or(0)
        }

        fn seek(&mut self, pos: u32) -> Result<(), CartError> {
            self.cursor = pos as usize;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, CartError> {
            let path = self.current.as_ref().ok_or_else(|| CartError::IoError("no open file".into()))?;
            let data = &self.files[path];
            let remaining = data.len().saturating_sub(self.cursor);
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&data[self.cursor..self.cursor + n]);
            self.cursor += n;
            Ok(n)
        }

        fn close(&mut self) {
            self.current = None;
        }

        fn unmount(&mut self) {
            self.mounted = false;
        }
    }

    #[test]
    fn image_smaller_than_hot_ram_never_touches_flash() {
        let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
        let mut provider = InMemoryFileProvider::new();
        let image = vec![0x42u8; 2048];

        load_image(&mut arena, 2048, &image, &mut provider, "unused.bin").unwrap();

        let ptr = BankPointer { region: Region::HotRam, offset: 0 };
        assert_eq!(arena.read_byte(ptr), 0x42);
    }

    #[test]
    fn image_larger_than_hot_ram_spills_to_flash() {
        let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
        let mut provider = InMemoryFileProvider::new();

        let image_size = HOT_CAPACITY as u32 + 4096;
        let mut image = vec![0u8; image_size as usize];
        for (i, b) in image.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        provider.insert("game.bin", image.clone());

        load_image(&mut arena, image_size, &image, &mut provider, "game.bin").unwrap();

        let hot_ptr = BankPointer { region: Region::HotRam, offset: 0 };
        assert_eq!(arena.read_byte(hot_ptr), image[0]);
    }

    #[test]
    fn zero_size_image_is_rejected() {
        let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
        let mut provider = InMemoryFileProvider::new();
        assert!(load_image(&mut arena, 0, &[], &mut provider, "x.bin").is_err());
    }

    #[test]
    fn short_read_while_streaming_is_fatal() {
        let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
        let mut provider = InMemoryFileProvider::new();

        // The readahead buffer is always allocated at full capacity;
        // only the underlying file is shorter than the image claims.
        let image_size = BUFFER_CAPACITY as u32 + 4096;
        let buffer = vec![0u8; BUFFER_CAPACITY];
        let mut truncated_file = vec![0u8; BUFFER_CAPACITY];
        truncated_file.extend(vec![0u8; 10]); // only 10 of the 4096 remaining bytes exist
        provider.insert("bad.bin", truncated_file);

        let result = load_image(&mut arena, image_size, &buffer, &mut provider, "bad.bin");
        assert!(result.is_err());
    }
}
