//! End-to-end: archives and persistent storage from a config file, a guest
//! core driven by the tokio run loop, saves written back to disk.

use std::io::Write;
use std::path::Path;

use zeta_core::dos::dta::{NAME, RECORD_LEN};
use zeta_core::dos::open_mode;
use zeta_core::runner::FRAME_INTERVAL;
use zeta_core::{
    build_storage, run, CoreHost, CoreState, DosFileSystem, EmulatorCore, Harness,
    HeadlessDisplay, HeadlessSpeaker, Session, SessionConfig, StorageProvider, TokioClock,
};

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory::<_, ()>(*name, Default::default()).unwrap();
        } else {
            zip.start_file::<_, ()>(*name, Default::default()).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Guest that lists boards, saves a game, reads it back and quits.
#[derive(Default)]
struct GuestCore {
    step: usize,
    executable: Vec<u8>,
    arg: String,
    boards: Vec<String>,
    read_back: Vec<u8>,
    timer_ticks: usize,
    ram: Vec<u8>,
}

impl GuestCore {
    fn list(&mut self, host: &mut dyn CoreHost, pattern: &str) {
        let mut dta = [0u8; RECORD_LEN];
        let mut status = host.find_first(&mut dta, 0, pattern);
        while status == 0 {
            let end = dta[NAME..].iter().position(|&b| b == 0).unwrap();
            self.boards
                .push(String::from_utf8(dta[NAME..NAME + end].to_vec()).unwrap());
            status = host.find_next(&mut dta);
        }
    }

    fn read_all(host: &mut dyn CoreHost, handle: i32) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = host.read(handle, &mut buf);
            if n <= 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n as usize]);
        }
    }
}

impl EmulatorCore for GuestCore {
    fn init(&mut self, _memory_limit: u32) {
        self.ram = vec![0; 0xB8000 + 4000];
    }

    fn load_binary(&mut self, host: &mut dyn CoreHost, handle: i32, arg: &str) {
        self.executable = Self::read_all(host, handle);
        self.arg = arg.to_string();
    }

    fn execute(&mut self, host: &mut dyn CoreHost, _budget: u32) -> CoreState {
        self.step += 1;
        match self.step {
            1 => {
                self.list(host, "*.ZZT");
                CoreState::Running
            }
            2 => {
                let handle = host.open("saved.sav", open_mode::WRITE);
                assert!(handle > 0);
                assert_eq!(host.write(handle, b"player at 12,4"), 14);
                assert_eq!(host.close(handle), 0);
                CoreState::AwaitingTimer
            }
            3 => {
                let handle = host.open("SAVED.SAV", open_mode::READ);
                self.read_back = Self::read_all(host, handle);
                host.close(handle);
                CoreState::AwaitingFrame
            }
            _ => CoreState::Halted,
        }
    }

    fn mark_frame(&mut self) {}

    fn mark_timer_tick(&mut self) {
        self.timer_ticks += 1;
    }

    fn set_timer_offset(&mut self, _ms_since_midnight: u32) {}

    fn video_mode(&self) -> u8 {
        3
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn key_down(&mut self, _chr: u8, _scancode: u8) {}
    fn key_up(&mut self, _scancode: u8) {}
    fn modifier_set(&mut self, _bits: u8) {}
    fn modifier_clear(&mut self, _bits: u8) {}
}

#[tokio::test]
async fn test_session_saves_to_persistent_storage() {
    let dir = tempfile::tempdir().unwrap();
    write_zip(
        &dir.path().join("zzt.zip"),
        &[
            ("zzt/", b""),
            ("zzt/ZZT.EXE", b"MZ-zzt"),
            ("zzt/TOWN.ZZT", b"town"),
            ("zzt/CITY.ZZT", b"city"),
            ("zzt/DEMO.ZZT", b"demo"),
            ("readme.txt", b"outside the prefix"),
        ],
    );
    write_zip(&dir.path().join("extra.zip"), &[("BB.ZZT", b"bb")]);

    let config_path = dir.path().join("session.json");
    std::fs::write(
        &config_path,
        r#"{
            "files": [
                { "path": "zzt.zip", "filenameMap": "ZZT", "readonly": true },
                { "path": "extra.zip", "readonly": true }
            ],
            "arg": "TOWN.ZZT",
            "storage": { "database": "saves", "root": "persist" }
        }"#,
    )
    .unwrap();

    let config = SessionConfig::load(&config_path).unwrap();
    let loaded = build_storage(&config).await.unwrap();
    assert_eq!(loaded.storage.get("README.TXT"), None);

    let harness = Harness::new(
        DosFileSystem::new(loaded.storage),
        HeadlessDisplay::new(),
        HeadlessSpeaker::default(),
    );
    let mut session = Session::start(GuestCore::default(), harness, TokioClock::new(), &config).unwrap();
    assert_eq!(session.core().executable, b"MZ-zzt");
    assert_eq!(session.core().arg, "TOWN.ZZT");

    let stats = run(&mut session, FRAME_INTERVAL).await;
    assert_eq!(stats.ticks, 4);
    assert!(stats.frames >= 1);

    let core = session.core();
    assert_eq!(core.boards, vec!["BB.ZZT", "CITY.ZZT", "DEMO.ZZT", "TOWN.ZZT"]);
    assert_eq!(core.read_back, b"player at 12,4");
    assert_eq!(
        session.harness().display().error.as_deref(),
        Some("Emulation stopped.")
    );

    let fs = session.into_fs();
    drop(fs);
    let written = loaded.write_back.unwrap().finish().await.unwrap();
    assert_eq!(written, 1);

    let on_disk = std::fs::read(dir.path().join("persist").join("saves").join("SAVED.SAV")).unwrap();
    assert_eq!(on_disk, b"player at 12,4");
}

#[tokio::test]
async fn test_second_session_sees_earlier_saves() {
    let dir = tempfile::tempdir().unwrap();
    write_zip(&dir.path().join("game.zip"), &[("SUPERZ.EXE", b"MZ-super")]);
    let json = format!(
        r#"{{ "files": [{{ "path": {:?} }}], "storage": {{ "database": "db", "root": {:?} }} }}"#,
        dir.path().join("game.zip"),
        dir.path(),
    );
    let config = SessionConfig::from_json(&json).unwrap();

    let mut first = build_storage(&config).await.unwrap();
    assert!(first.storage.set("SLOT1.SAV", b"one"));
    let write_back = first.write_back.take().unwrap();
    drop(first);
    write_back.finish().await.unwrap();

    let second = build_storage(&config).await.unwrap();
    let harness = Harness::new(
        DosFileSystem::new(second.storage),
        HeadlessDisplay::new(),
        HeadlessSpeaker::default(),
    );
    let session = Session::start(GuestCore::default(), harness, TokioClock::new(), &config).unwrap();
    assert_eq!(session.core().executable, b"MZ-super");
    assert_eq!(
        session.harness().fs().list_pattern("*.SAV"),
        Some(vec!["SLOT1.SAV".to_string()])
    );
}
