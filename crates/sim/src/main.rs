mod sim_bus;

use anyhow::{Context, Result};
use cart_arena::{plan, InMemoryFlash, MemoryArena};
use cart_core::CartError;
use cart_schemes::Scheme;
use clap::Parser;
use serde::Serialize;
use sim_bus::SimBus;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::fs::File;
use std::io::Write;

/// Host-side harness that loads a cartridge image, classifies it the
/// way the dispatcher would on real hardware, and drives the matching
/// scheme engine against a scripted address trace.
#[derive(Parser)]
struct Args {
    /// Cartridge image to load (.a26/.bin/.ace). Not needed with --menu.
    image: Option<String>,

    /// JSON array of u16 address samples the engine is driven with.
    /// Missing file falls back to a short built-in trace.
    #[arg(long, default_value = "trace.json")]
    trace: String,

    /// Dump the run's final state to this file as JSON.
    #[arg(long, default_value = "state.json")]
    save: String,

    /// Run the Menu/Firmware cartridge instead of classifying `image`.
    #[arg(long, default_value_t = false)]
    menu: bool,

    /// Preserve env-var gated engine logs.
    #[arg(long, default_value_t = false)]
    keep_logs: bool,
}

#[derive(Serialize)]
struct RunReport {
    kind: &'static str,
    detail: String,
    driven_bytes: usize,
}

fn bank_size_for(scheme: &Scheme) -> u32 {
    match scheme {
        Scheme::TwoK | Scheme::ThreeF { .. } | Scheme::ThreeE { .. } | Scheme::Cv | Scheme::E7 { .. } => 2048,
        Scheme::Supercharger { .. } => 2048,
        Scheme::E0 { .. } => 1024,
        _ => 4096,
    }
}

fn load_trace(path: &str, fallback: fn() -> Vec<u16>) -> Vec<u16> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| fallback()),
        Err(_) => fallback(),
    }
}

fn default_trace() -> Vec<u16> {
    vec![0x1000, 0x1001, 0x1002, 0x1FF8, 0x1FF9, 0x1500]
}

/// The menu loop has no simulation-exhaustion exit (production never
/// returns until a command word arrives), so its fallback trace must
/// end in one, unlike the scheme-engine fallback above.
fn default_menu_trace() -> Vec<u16> {
    vec![0x1000, 0x1001, 0x1FF4, 0x1EFF, 0x1EFF, 0x1EFF]
}

struct RecordingEntry {
    jumped_to: Option<u32>,
}

impl cart_ace::NativeEntry for RecordingEntry {
    fn jump(&mut self, entry_point: u32) -> Result<(), CartError> {
        log::info!("native entry: jumping to {entry_point:#010x}");
        self.jumped_to = Some(entry_point);
        Ok(())
    }
}

struct InMemoryFileProvider {
    files: HashMap<String, Vec<u8>>,
    cursor: usize,
    current: Option<String>,
}

impl InMemoryFileProvider {
    fn new() -> Self {
        Self { files: HashMap::new(), cursor: 0, current: None }
    }

    fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_string(), data);
    }
}

impl cart_arena::FileProvider for InMemoryFileProvider {
    fn mount(&mut self) -> Result<(), CartError> {
        Ok(())
    }

    fn open(&mut self, path: &str) -> Result<(), CartError> {
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

    fn unmount(&mut self) {}
}

fn run_ace(image: Vec<u8>, path: &str) -> Result<RunReport> {
    let mut arena = MemoryArena::new(InMemoryFlash::new(0x0020_0000));
    let mut provider = InMemoryFileProvider::new();
    provider.insert(path, image.clone());
    let mut entry = RecordingEntry { jumped_to: None };

    cart_ace::launch_ace_cartridge(&mut arena, &image, &mut provider, path, &mut entry)
        .context("ACE launch failed")?;

    Ok(RunReport {
        kind: "ace",
        detail: format!("entry_point={:#010x}", entry.jumped_to.unwrap_or(0)),
        driven_bytes: 0,
    })
}

fn run_menu(trace: Vec<u16>) -> Result<RunReport> {
    let mut cart = cart_menu::MenuCartridge::new(cart_menu::TvMode::Ntsc);
    let mut bus = SimBus::new(trace);
    let command = cart.run(&mut bus);
    Ok(RunReport { kind: "menu", detail: format!("command={command:#06x}"), driven_bytes: bus.history.len() })
}

fn run_scheme(image: Vec<u8>, trace: Vec<u16>, path: &str) -> Result<RunReport> {
    let scheme = cart_schemes::classify(&image)
        .ok_or_else(|| anyhow::anyhow!("{}", CartError::Unrecognized.to_string()))?;

    let bank_size = bank_size_for(&scheme);
    let ram_bytes = scheme.ram_bytes_needed();
    let writable_banks = if ram_bytes == 0 { None } else { Some((ram_bytes + bank_size - 1) / bank_size) };
    let image_plan = plan(image.len() as u32, bank_size, writable_banks)?;

    let mut arena = MemoryArena::new(InMemoryFlash::new(0x0020_0000));
    let mut provider = InMemoryFileProvider::new();
    provider.insert(path, image.clone());
    let readahead = image.len().min(cart_arena::BUFFER_CAPACITY);
    cart_arena::load_image(&mut arena, image.len() as u32, &image[..readahead], &mut provider, path)?;

    let mut bus = SimBus::new(trace);
    cart_schemes::run(&scheme, &image_plan, &mut arena, &mut bus, None);

    Ok(RunReport { kind: "scheme", detail: format!("{scheme:?}"), driven_bytes: bus.history.len() })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.keep_logs {
        env::remove_var("CART_LOG_SCHEME");
        env::remove_var("CART_LOG_FLASH");
    }

    let report = if args.menu {
        let trace = load_trace(&args.trace, default_menu_trace);
        run_menu(trace)?
    } else {
        let trace = load_trace(&args.trace, default_trace);
        let path = args.image.as_deref().context("an image path is required unless --menu is given")?;
        let image = fs::read(path).with_context(|| format!("reading {path}"))?;
        if cart_ace::is_ace_cartridge(&image) {
            run_ace(image, path)?
        } else {
            run_scheme(image, trace, path)?
        }
    };

    println!("{}: {}", report.kind, report.detail);

    let mut f = File::create(&args.save)?;
    write!(f, "{}", serde_json::to_string_pretty(&report)?)?;

    Ok(())
}
