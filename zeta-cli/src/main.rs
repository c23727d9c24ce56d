//! zeta - inspect the layered storage a ZZT session would see.
//!
//! Usage:
//!   zeta [OPTIONS] <COMMAND>
//!
//! Examples:
//!   zeta -a zzt.zip ls                       # List files in DOS order
//!   zeta -a zzt.zip -a town.zip ls '*.ZZT'   # Later archives overlay earlier ones
//!   zeta -c session.json cat TOWN.ZZT > t    # Read through the whole stack
//!   zeta -a zzt.zip -s saves put SAVE.SAV s  # Write into persistent storage
//!   zeta -a zzt.zip -e zzt ls                # Only take .ZZT files from the archive
//!   zeta keys                                # Show scan codes for key presses

use std::io::Write;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use env_logger::Env;
use log::{info, LevelFilter};

use zeta_core::dos::open_mode;
use zeta_core::input::{self, modifier};
use zeta_core::{
    build_storage, ArchiveOptions, ArchiveSource, DosFileSystem, PersistentConfig, SessionConfig,
    StorageBackend, StorageOptions, StorageProvider, ZetaError,
};

/// ZZT harness storage tool
#[derive(Parser, Debug)]
#[command(name = "zeta")]
#[command(about = "Inspect and modify ZZT session storage")]
struct Args {
    /// Session config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Archive to layer on top of the config's files (repeatable)
    #[arg(short, long = "archive")]
    archives: Vec<PathBuf>,

    /// Give long archive names 8.3 aliases
    #[arg(long)]
    use_83_names: bool,

    /// Only take archive files with this extension (repeatable)
    #[arg(short, long = "ext")]
    extensions: Vec<String>,

    /// Directory holding persistent storage
    #[arg(short, long)]
    storage: Option<PathBuf>,

    /// Persistent database name
    #[arg(long, default_value = "zeta")]
    database: String,

    /// Keep saves in one key-value file instead of one file each
    #[arg(long)]
    key_value: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files matching a pattern, in DOS directory order
    Ls {
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Write a file to stdout
    Cat { name: String },
    /// Copy a host file into the top storage layer
    Put { name: String, source: PathBuf },
    /// Show how key presses translate to scan codes (Esc quits)
    Keys,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn session_config(args: &Args) -> Result<SessionConfig, ZetaError> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    let mut storage = StorageOptions::readonly();
    if args.use_83_names {
        storage = storage.with_83_names();
    }
    let extensions = (!args.extensions.is_empty()).then(|| args.extensions.clone());
    for path in &args.archives {
        config.files.push(ArchiveSource {
            path: path.clone(),
            options: ArchiveOptions {
                extensions: extensions.clone(),
                storage,
                ..ArchiveOptions::default()
            },
        });
    }

    if let Some(root) = &args.storage {
        config.storage = Some(PersistentConfig {
            database: args.database.clone(),
            root: root.clone(),
            backend: if args.key_value {
                StorageBackend::KeyValue
            } else {
                StorageBackend::Directory
            },
            options: StorageOptions::default(),
        });
    }
    config.validate()?;
    Ok(config)
}

/// DOM-style key name and legacy key code for a terminal key.
fn key_name(code: KeyCode) -> Option<(String, u32)> {
    let named = |name: &str, code: u32| Some((name.to_string(), code));
    match code {
        KeyCode::Up => named("ArrowUp", 38),
        KeyCode::Down => named("ArrowDown", 40),
        KeyCode::Left => named("ArrowLeft", 37),
        KeyCode::Right => named("ArrowRight", 39),
        KeyCode::Home => named("Home", 36),
        KeyCode::End => named("End", 35),
        KeyCode::Insert => named("Insert", 45),
        KeyCode::Delete => named("Delete", 46),
        KeyCode::PageUp => named("PageUp", 33),
        KeyCode::PageDown => named("PageDown", 34),
        KeyCode::Enter => named("Enter", 13),
        KeyCode::Esc => named("Escape", 27),
        KeyCode::Backspace => named("Backspace", 8),
        KeyCode::Tab => named("Tab", 9),
        KeyCode::F(n) => Some((format!("F{}", n), 111 + u32::from(n))),
        KeyCode::Char(c) => Some((c.to_string(), u32::from(c.to_ascii_uppercase()))),
        _ => None,
    }
}

fn modifier_bits(modifiers: KeyModifiers) -> u8 {
    let mut bits = 0;
    if modifiers.contains(KeyModifiers::SHIFT) {
        bits |= modifier::SHIFT;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        bits |= modifier::CTRL;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        bits |= modifier::ALT;
    }
    bits
}

fn describe_key(key: KeyEvent) -> String {
    let Some((name, key_code)) = key_name(key.code) else {
        return format!("{:?}: no mapping", key.code);
    };
    let mods = modifier_bits(key.modifiers);
    match input::translate_key(&name, key_code) {
        Some((chr, scan)) => format!(
            "{:<10} chr 0x{:02X}  scan 0x{:02X}  mods 0x{:02X}",
            name, chr, scan, mods
        ),
        None => format!("{:<10} ignored", name),
    }
}

fn show_keys() -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    print!("Press keys, Esc to quit\r\n");
    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }
            print!("{}\r\n", describe_key(key));
            std::io::stdout().flush()?;
            if key.code == KeyCode::Esc {
                return Ok(());
            }
        }
    })();
    let _ = disable_raw_mode();
    result
}

fn list(fs: &DosFileSystem, pattern: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(names) = fs.list_pattern(pattern) else {
        return Err(format!("Unsupported pattern: {}", pattern).into());
    };
    let storage = fs.storage();
    for name in names {
        let size = storage.get(&name).map(|d| d.len()).unwrap_or(0);
        println!("{:<12} {:>8}", name, size);
    }
    Ok(())
}

fn cat(fs: &mut DosFileSystem, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let handle = fs.open(name, open_mode::READ);
    if handle < 0 {
        return Err(format!("File not found: {}", name).into());
    }
    let mut out = std::io::stdout().lock();
    let mut buf = [0u8; 4096];
    loop {
        let n = fs.read(handle, &mut buf);
        if n <= 0 {
            break;
        }
        out.write_all(&buf[..n as usize])?;
    }
    fs.close(handle);
    out.flush()?;
    Ok(())
}

fn put(fs: &mut DosFileSystem, name: &str, data: &[u8]) -> Result<(), ZetaError> {
    let handle = fs.open(name, open_mode::WRITE | open_mode::TRUNCATE);
    if handle < 0 {
        return Err(ZetaError::ReadOnly);
    }
    fs.write(handle, data);
    fs.close(handle);
    info!("Stored {} ({} bytes)", name.to_uppercase(), data.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Command::Keys = args.command {
        return show_keys();
    }

    let config = session_config(&args)?;
    let loaded = build_storage(&config).await?;
    let mut fs = DosFileSystem::new(loaded.storage);

    match &args.command {
        Command::Ls { pattern } => list(&fs, pattern)?,
        Command::Cat { name } => cat(&mut fs, name)?,
        Command::Put { name, source } => {
            let data = tokio::fs::read(source).await?;
            put(&mut fs, name, &data)?;
        }
        Command::Keys => {}
    }

    // Dropping the storage closes the write-back channel.
    drop(fs);
    if let Some(write_back) = loaded.write_back {
        let written = write_back.finish().await?;
        info!("Persisted {} file(s)", written);
    }
    Ok(())
}
