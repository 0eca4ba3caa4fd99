//! The mailbox directory listing: up to 80 entries, 12 bytes each,
//! staged into the menu cartridge's 1 KiB mailbox RAM.

pub const ENTRY_SIZE: usize = 12;
pub const MAX_ENTRIES: usize = 1024 / ENTRY_SIZE;

/// One directory entry: an 11-byte, space-padded name and a directory flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub is_dir: bool,
}

impl DirEntry {
    pub fn new(name: &str, is_dir: bool) -> Self {
        let mut bytes = [b' '; 11];
        for (slot, byte) in bytes.iter_mut().zip(name.as_bytes().iter().take(11)) {
            *slot = *byte;
        }
        Self { name: bytes, is_dir }
    }

    fn encode(&self, out: &mut [u8; ENTRY_SIZE]) {
        out[..11].copy_from_slice(&self.name);
        out[11] = self.is_dir as u8;
    }
}

/// Renders up to [`MAX_ENTRIES`] entries into a 1 KiB mailbox buffer,
/// matching the original's convention that a ".." pseudo-entry is
/// listed first whenever the current directory isn't the root.
pub fn render(entries: &[DirEntry], has_parent: bool) -> [u8; 1024] {
    let mut mailbox = [0u8; 1024];
    let mut slots = entries.iter();

    let mut write_at = |idx: usize, entry: &DirEntry, mailbox: &mut [u8; 1024]| {
        if idx >= MAX_ENTRIES {
            return;
        }
        let mut buf = [0u8; ENTRY_SIZE];
        entry.encode(&mut buf);
        mailbox[idx * ENTRY_SIZE..(idx + 1) * ENTRY_SIZE].copy_from_slice(&buf);
    };

    let mut idx = 0;
    if has_parent {
        write_at(idx, &DirEntry::new("..", true), &mut mailbox);
        idx += 1;
    }
    for entry in slots.by_ref() {
        write_at(idx, entry, &mut mailbox);
        idx += 1;
        if idx >= MAX_ENTRIES {
            break;
        }
    }

    mailbox
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_dot_is_first_entry_when_not_at_root() {
        let entries = vec![DirEntry::new("GAME.BIN", false)];
        let mailbox = render(&entries, true);
        assert_eq!(&mailbox[0..2], b"..");
        assert_eq!(&mailbox[12..20], b"GAME.BIN");
    }

    #[test]
    fn root_listing_has_no_dot_dot() {
        let entries = vec![DirEntry::new("GAME.BIN", false)];
        let mailbox = render(&entries, false);
        assert_eq!(&mailbox[0..8], b"GAME.BIN");
    }

    #[test]
    fn name_longer_than_11_bytes_is_truncated() {
        let e = DirEntry::new("VERYLONGFILENAME.BIN", false);
        assert_eq!(e.name.len(), 11);
    }

    #[test]
    fn entries_beyond_capacity_are_dropped_not_overflowed() {
        let entries: Vec<_> = (0..100).map(|i| DirEntry::new(&format!("F{i}"), false)).collect();
        let mailbox = render(&entries, false);
        assert_eq!(mailbox.len(), 1024);
    }
}
