//! `Record` over a disk cache: restore, exclusion, staleness, and
//! cancellation.

use simobj_cache::{CacheError, CacheState, CancelOutcome};
use simobj_core::{CoordClass, Identifier};
use simobj_frame::Offset;
use simobj_record::{CacheConfig, InitArgs, Record, RecordConfig, RecordError};
use simobj_select::masks::{fields_equal, null_mask};
use simobj_select::MaskChoice;
use simobj_test_utils::fixtures::galaxy_source;
use simobj_test_utils::{init_tracing, MockFieldSource};
use tempfile::TempDir;

fn config(dir: &TempDir) -> RecordConfig {
    let mut config = RecordConfig {
        cache: CacheConfig::in_dir(dir.path()),
        ..RecordConfig::default()
    };
    config.masks.insert(
        "group".into(),
        MaskChoice::Fixed(fields_equal(&[("gns", "fof"), ("sgns", "sub")])),
    );
    config.masks.insert(
        "particle_g".into(),
        MaskChoice::Fixed(fields_equal(&[("ng_g", "fof"), ("nsg_g", "sub")])),
    );
    config
        .masks
        .insert("header".into(), MaskChoice::Fixed(null_mask()));
    config.recenter.insert("xyz_g".into(), "cops".into());
    config.box_wrap.insert("xyz_g".into(), "Lbox".into());
    config
        .coord_class
        .insert("xyz_g".into(), CoordClass::Position);
    config
        .coord_class
        .insert("vxyz_g".into(), CoordClass::Velocity);
    config
}

fn init() -> InitArgs {
    InitArgs::new(
        Identifier::new().with("sim", "box25").with("snap", 28),
        Identifier::new().with("fof", 1).with("sub", 0),
    )
}

fn open(dir: &TempDir) -> Result<Record<MockFieldSource>, RecordError> {
    init_tracing();
    Record::open(galaxy_source(), init(), config(dir))
}

#[test]
fn open_persists_eager_selectors() {
    let dir = TempDir::new().unwrap();
    let record = open(&dir).unwrap();
    assert_eq!(record.cache_state(), CacheState::Persisted);
    let fp = init().fingerprint();
    assert!(fp.entry_path(dir.path()).exists());
    assert!(fp.lock_path(dir.path()).exists());
}

#[test]
fn reopened_record_restores_without_reading_the_source() {
    let dir = TempDir::new().unwrap();
    let xyz = {
        let mut record = open(&dir).unwrap();
        record.get("xyz_g").unwrap().clone()
    };

    let mut record = open(&dir).unwrap();
    assert!(record.contains("xyz_g"));
    assert!(record.source().loads.is_empty());
    assert_eq!(record.get("xyz_g").unwrap(), &xyz);
    assert!(record.source().loads.is_empty());

    // Selectors came back too: a new field needs only its own read.
    record.get("mass_g").unwrap();
    let loaded: Vec<&str> = record
        .source()
        .loads
        .iter()
        .flat_map(|c| c.keys.iter().map(String::as_str))
        .collect();
    assert!(loaded.iter().all(|&k| k == "mass_g"), "{loaded:?}");
}

#[test]
fn transforms_survive_a_restore() {
    let dir = TempDir::new().unwrap();
    let offset = Offset::new([0.0, 0.0, 10.0], "km/s");
    let expected = {
        let mut record = open(&dir).unwrap();
        record.translate(CoordClass::Velocity, offset.clone()).unwrap();
        record.get("vxyz_g").unwrap().clone()
    };

    let mut record = open(&dir).unwrap();
    assert_eq!(record.transforms().len(), 1);
    record.evict("vxyz_g");
    assert_eq!(record.get("vxyz_g").unwrap(), &expected);
}

#[test]
fn second_owner_fails_fast() {
    let dir = TempDir::new().unwrap();
    let first = open(&dir).unwrap();
    assert!(matches!(
        open(&dir),
        Err(RecordError::Cache(CacheError::AlreadyLocked { .. }))
    ));
    drop(first);
    assert!(open(&dir).is_ok());
}

#[test]
fn lock_is_released_when_the_record_is_closed() {
    let dir = TempDir::new().unwrap();
    let record = open(&dir).unwrap();
    let lock = init().fingerprint().lock_path(dir.path());
    assert!(lock.exists());
    let source = record.into_source();
    assert!(!lock.exists());
    assert!(source.working_set().is_empty());
}

#[test]
fn changed_configuration_ignores_the_old_entry() {
    let dir = TempDir::new().unwrap();
    {
        let mut record = open(&dir).unwrap();
        record.get("xyz_g").unwrap();
    }
    let mut changed = config(&dir);
    changed.recenter.clear();
    let record = Record::open(galaxy_source(), init(), changed).unwrap();
    assert!(!record.contains("xyz_g"));
}

#[test]
fn custom_fingerprint_names_the_entry() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(&dir);
    cfg.fingerprint = Some(std::sync::Arc::new(|init: &InitArgs| {
        format!("galaxy-{}", init.object.int("fof").unwrap_or(0))
    }));
    let _record = Record::open(galaxy_source(), init(), cfg).unwrap();
    assert!(dir.path().join("galaxy-1.simobj").exists());
    assert!(dir.path().join("galaxy-1.lock").exists());
}

#[test]
fn cancellation_releases_the_lock_and_fails_the_next_write() {
    let dir = TempDir::new().unwrap();
    let mut record = open(&dir).unwrap();
    let handle = record.cancel_handle().unwrap();
    assert_eq!(handle.request(), CancelOutcome::Honored);
    assert!(!init().fingerprint().lock_path(dir.path()).exists());

    assert!(matches!(
        record.get("mass_g"),
        Err(RecordError::Cache(CacheError::Cancelled))
    ));
    assert_eq!(record.cache_state(), CacheState::Unlocked);
    // The lock is free for another process.
    drop(record);
    assert!(open(&dir).is_ok());
}

#[test]
fn disabled_cache_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let cfg = RecordConfig {
        cache: CacheConfig {
            dir: dir.path().to_path_buf(),
            ..CacheConfig::disabled()
        },
        ..config(&dir)
    };
    let mut record = Record::open(galaxy_source(), init(), cfg).unwrap();
    record.get("xyz_g").unwrap();
    assert!(record.cancel_handle().is_none());
    assert_eq!(record.cache_state(), CacheState::Unlocked);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
