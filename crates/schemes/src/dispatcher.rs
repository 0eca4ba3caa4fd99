//! Boot-time scheme classifier.
//!
//! Extension overrides size-based classification, which in turn is
//! broken by opcode content heuristics for the sizes that overlap more
//! than one scheme (8 KiB alone is F8, F8SC, E0, 3E, 3F, FE, 0840, or a
//! 4K mirror depending on what's actually inside it). The heuristics
//! and their exact signature bytes are the same ones the firmware's
//! `isProbablyXXX` family uses to guess a format from unlabeled ROM
//! dumps, since an `.a26`/`.bin` file carries no scheme tag of its own.

use crate::Scheme;
use cart_core::log;
use cart_core::logging::{LogCategory, LogLevel};

/// A known file-extension override. Anything else falls through to
/// size/content classification.
pub fn scheme_from_extension(ext: &str) -> Option<Scheme> {
    match ext.to_ascii_lowercase().as_str() {
        "a26" | "bin" => None, // generic Atari image extensions carry no scheme info
        "ace" => None,         // ACE images are handled by the ACE loader, not a Scheme
        _ => None,
    }
}

const ACE_MAGIC: &[u8] = b"ACE-2600";

/// A real 3E cartridge's RAM is fixed in hardware at 32 1 KiB pages,
/// selected by the low byte written to `$003E` modulo this count; it
/// isn't something the ROM image itself declares.
const THREE_E_RAM_BANKS: u32 = 32;

/// Scans for the 128-byte mirror that marks an SC (RAM-equipped)
/// bank-switch image: bytes `[0..128)` repeat at `[128..256)` in every
/// 4 KiB bank.
fn has_sc_mirror(image: &[u8], bank_size: usize) -> bool {
    if image.len() < bank_size {
        return false;
    }
    image.chunks(bank_size).all(|bank| bank.len() >= 256 && bank[..128] == bank[128..256])
}

fn is_supercharger_multiple(size: usize) -> bool {
    size != 0 && size % 8448 == 0
}

/// Counts (possibly overlapping) occurrences of `needle` anywhere in
/// `image`.
fn count_matches(image: &[u8], needle: &[u8]) -> usize {
    if image.len() < needle.len() {
        return 0;
    }
    image.windows(needle.len()).filter(|w| *w == needle).count()
}

/// True if any single signature in `sigs` occurs at least `min_hits`
/// times in `image`.
fn matches_any(image: &[u8], sigs: &[&[u8]], min_hits: usize) -> bool {
    sigs.iter().any(|sig| count_matches(image, sig) >= min_hits)
}

/// Sum of occurrences across every signature in `sigs`, for the
/// heuristics that only commit once several related patterns appear
/// together often enough.
fn total_hits(image: &[u8], sigs: &[&[u8]]) -> usize {
    sigs.iter().map(|sig| count_matches(image, sig)).sum()
}

const FE_SIGS: &[&[u8]] = &[
    &[0x20, 0x00, 0xD0, 0xC6, 0xC5],
    &[0x20, 0xC3, 0xF8, 0xA5, 0x82],
    &[0xD0, 0xFB, 0x20, 0x73, 0xFE],
    &[0x20, 0x00, 0xF0, 0x84, 0xD6],
];

fn is_probably_fe(image: &[u8]) -> bool {
    matches_any(image, FE_SIGS, 1)
}

fn is_probably_3f(image: &[u8]) -> bool {
    matches_any(image, &[&[0x85, 0x3F]], 2)
}

fn is_probably_3e(image: &[u8]) -> bool {
    matches_any(image, &[&[0x85, 0x3E, 0xA9, 0x00]], 1)
}

const E0_SIGS: &[&[u8]] = &[
    &[0x8D, 0xE0, 0x1F],
    &[0x8D, 0xE0, 0x5F],
    &[0x8D, 0xE9, 0xFF],
    &[0x0C, 0xE0, 0x1F],
    &[0xAD, 0xE0, 0x1F],
    &[0xAD, 0xE9, 0xFF],
    &[0xAD, 0xED, 0xFF],
    &[0xAD, 0xF3, 0xBF],
];

fn is_probably_e0(image: &[u8]) -> bool {
    matches_any(image, E0_SIGS, 1)
}

const ZERO840_SIG1: &[&[u8]] = &[&[0xAD, 0x00, 0x08], &[0xAD, 0x40, 0x08], &[0x2C, 0x00, 0x08]];
const ZERO840_SIG2: &[&[u8]] = &[&[0x0C, 0x00, 0x08, 0x4C], &[0x0C, 0xFF, 0x0F, 0x4C]];

fn is_probably_0840(image: &[u8]) -> bool {
    total_hits(image, ZERO840_SIG1) >= 2 || total_hits(image, ZERO840_SIG2) >= 2
}

fn is_probably_cv(image: &[u8]) -> bool {
    matches_any(image, &[&[0x9D, 0xFF, 0xF3], &[0x99, 0x00, 0xF4]], 1)
}

const EF_SIGS: &[&[u8]] = &[&[0x0C, 0xE0, 0xFF], &[0xAD, 0xE0, 0xFF], &[0x0C, 0xE0, 0x1F], &[0xAD, 0xE0, 0x1F]];

fn is_probably_ef(image: &[u8]) -> bool {
    matches_any(image, EF_SIGS, 1)
}

const E7_SIGS: &[&[u8]] = &[
    &[0xAD, 0xE2, 0xFF],
    &[0xAD, 0xE5, 0xFF],
    &[0xAD, 0xE5, 0x1F],
    &[0xAD, 0xE7, 0x1F],
    &[0x0C, 0xE7, 0x1F],
    &[0x8D, 0xE7, 0xFF],
    &[0x8D, 0xE7, 0x1F],
];

fn is_probably_e7(image: &[u8]) -> bool {
    matches_any(image, E7_SIGS, 1)
}

/// The F8 hotspot address written back to itself, the tell a plain F8
/// image leaves when it isn't actually one of the more exotic 8 KiB
/// formats below.
fn looks_like_f8(image: &[u8]) -> bool {
    matches_any(image, &[&[0x8D, 0xF9, 0x1F]], 2)
}

fn is_4k_mirror(image: &[u8]) -> bool {
    image.len() == 8192 && image[..4096] == image[4096..]
}

/// Classifies a loaded image by size, breaking ties with content
/// heuristics. Returns `None` (not `CartError::Unrecognized`) when
/// nothing matches, leaving the caller free to decide how to report it.
pub fn classify(image: &[u8]) -> Option<Scheme> {
    if image.len() >= ACE_MAGIC.len() && &image[..ACE_MAGIC.len()] == ACE_MAGIC {
        return None; // ACE: the dispatcher hands this straight to cart_ace.
    }

    let scheme = match image.len() {
        2048 => {
            if is_probably_cv(image) {
                Some(Scheme::Cv)
            } else {
                Some(Scheme::TwoK)
            }
        }

        4096 => Some(Scheme::FourK),

        8192 => {
            let f8_flag = looks_like_f8(image);
            if has_sc_mirror(image, 4096) {
                Some(Scheme::fx(0x1FF8, 2, true))
            } else if is_4k_mirror(image) {
                Some(Scheme::FourK)
            } else if is_probably_e0(image) {
                Some(Scheme::E0 { bank_count: 8 })
            } else if is_probably_3e(image) {
                Some(Scheme::ThreeE { rom_banks: 4, ram_banks: THREE_E_RAM_BANKS })
            } else if is_probably_3f(image) {
                Some(Scheme::ThreeF { bank_count: 4 })
            } else if is_probably_fe(image) && !f8_flag {
                Some(Scheme::Fe)
            } else if is_probably_0840(image) {
                Some(Scheme::Zero840)
            } else {
                Some(Scheme::fx(0x1FF8, 2, false))
            }
        }

        10240 => Some(Scheme::Dpc { display_data: image[8192..].to_vec() }),

        12288 => Some(Scheme::Fa),

        16384 => {
            if has_sc_mirror(image, 4096) {
                Some(Scheme::fx(0x1FF6, 4, true))
            } else if is_probably_e7(image) {
                Some(Scheme::E7 { bank_count: 8 })
            } else if is_probably_3e(image) {
                Some(Scheme::ThreeE { rom_banks: 8, ram_banks: THREE_E_RAM_BANKS })
            } else {
                Some(Scheme::fx(0x1FF6, 4, false))
            }
        }

        32768 => {
            if has_sc_mirror(image, 4096) {
                Some(Scheme::fx(0x1FF4, 8, true))
            } else if is_probably_3e(image) {
                Some(Scheme::ThreeE { rom_banks: 16, ram_banks: THREE_E_RAM_BANKS })
            } else if is_probably_3f(image) {
                Some(Scheme::ThreeF { bank_count: 16 })
            } else {
                Some(Scheme::fx(0x1FF4, 8, false))
            }
        }

        65536 => {
            if is_probably_3e(image) {
                Some(Scheme::ThreeE { rom_banks: 32, ram_banks: THREE_E_RAM_BANKS })
            } else if is_probably_3f(image) {
                Some(Scheme::ThreeF { bank_count: 32 })
            } else if is_probably_ef(image) {
                Some(Scheme::fx(0x1FE0, 16, has_sc_mirror(image, 4096)))
            } else {
                Some(Scheme::F0)
            }
        }

        n if is_supercharger_multiple(n) => Some(Scheme::Supercharger { bios: vec![0; 2048] }),
        _ => None,
    };

    if let Some(scheme) = &scheme {
        log!(LogCategory::Dispatcher, LogLevel::Info, "classified {}-byte image as {scheme:?}", image.len());
    }
    scheme
}
