//! Benchmark workloads for simobj.
//!
//! Provides deterministic inputs for benchmarks and examples:
//!
//! - [`scattered_mask`]: members spread uniformly over a large table
//! - [`clustered_mask`]: members in a few dense runs
//! - [`halo_source`]: a synthetic snapshot with one particle table
//! - [`halo_config`]: a record configuration wired to [`halo_source`]
//! - [`synthetic_entry`]: a cache entry of a given size

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use indexmap::IndexMap;

use simobj_cache::CacheEntry;
use simobj_core::{CoordClass, Selector, Value};
use simobj_frame::{Offset, TransformOp, TransformStack};
use simobj_record::{CacheConfig, RecordConfig};
use simobj_select::masks::{fields_equal, null_mask};
use simobj_select::MaskChoice;
use simobj_test_utils::MockFieldSource;

/// Side length of the synthetic box.
pub const BOX: f64 = 25_000.0;

fn lcg(state: u64) -> u64 {
    state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
}

/// A mask over `n` rows with about `members` true entries at
/// pseudo-random positions derived from `seed`.
pub fn scattered_mask(n: usize, members: usize, seed: u64) -> Vec<bool> {
    let mut mask = vec![false; n];
    let mut state = seed;
    for _ in 0..members {
        state = lcg(state);
        mask[(state % n as u64) as usize] = true;
    }
    mask
}

/// A mask over `n` rows with `clusters` runs of `run_len` true entries
/// each, evenly spaced.
pub fn clustered_mask(n: usize, clusters: usize, run_len: usize) -> Vec<bool> {
    let mut mask = vec![false; n];
    if clusters == 0 {
        return mask;
    }
    let stride = n / clusters;
    for c in 0..clusters {
        let start = c * stride;
        for slot in mask.iter_mut().skip(start).take(run_len.min(stride)) {
            *slot = true;
        }
    }
    mask
}

/// A snapshot with `n_groups` groups of `n_particles / n_groups`
/// particles each, interleaved in storage order.
///
/// Fields follow the fixture naming: `gns`, `cops`, `Lbox`, and per
/// particle `ng_g`, `xyz_g`, `vxyz_g`, `mass_g`.
pub fn halo_source(n_particles: usize, n_groups: usize) -> MockFieldSource {
    let n_groups = n_groups.max(1);
    let mut src = MockFieldSource::new();
    let centres: Vec<[f64; 3]> = (0..n_groups)
        .map(|g| {
            let f = g as f64 / n_groups as f64;
            [f * BOX, (1.0 - f) * BOX * 0.5, BOX * 0.25]
        })
        .collect();
    src.add_field(
        "gns",
        "group",
        Value::column((0..n_groups).map(|g| g as f64).collect(), ""),
    );
    src.add_field("cops", "group", Value::vectors(&centres, "kpc"));
    src.add_field("Lbox", "header", Value::scalar(BOX, "kpc"));

    let mut state = 7u64;
    let mut xyz = Vec::with_capacity(n_particles);
    let mut vxyz = Vec::with_capacity(n_particles);
    for i in 0..n_particles {
        let c = centres[i % n_groups];
        let mut jitter = [0.0; 3];
        for j in &mut jitter {
            state = lcg(state);
            *j = (state >> 11) as f64 / (1u64 << 53) as f64 * 200.0 - 100.0;
        }
        xyz.push([
            (c[0] + jitter[0]).rem_euclid(BOX),
            (c[1] + jitter[1]).rem_euclid(BOX),
            (c[2] + jitter[2]).rem_euclid(BOX),
        ]);
        vxyz.push([-jitter[1], jitter[0], 0.1 * jitter[2]]);
    }
    src.add_field(
        "ng_g",
        "particle_g",
        Value::column((0..n_particles).map(|i| (i % n_groups) as f64).collect(), ""),
    );
    src.add_field("xyz_g", "particle_g", Value::vectors(&xyz, "kpc"));
    src.add_field("vxyz_g", "particle_g", Value::vectors(&vxyz, "km/s"));
    src.add_field(
        "mass_g",
        "particle_g",
        Value::column(vec![1.0; n_particles], "Msun"),
    );
    src
}

/// A record configuration for [`halo_source`] objects, identified by a
/// `fof` component, with recentering and box wrapping of positions.
pub fn halo_config(cache: CacheConfig) -> RecordConfig {
    let mut config = RecordConfig {
        cache,
        ..RecordConfig::default()
    };
    config
        .masks
        .insert("group".into(), MaskChoice::Fixed(fields_equal(&[("gns", "fof")])));
    config.masks.insert(
        "particle_g".into(),
        MaskChoice::Fixed(fields_equal(&[("ng_g", "fof")])),
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

/// A cache entry holding `n_fields` vector fields of `rows` rows, one
/// boolean selector over `rows`, and a two-entry transform stack.
pub fn synthetic_entry(n_fields: usize, rows: usize) -> CacheEntry {
    let mut fields = IndexMap::new();
    for f in 0..n_fields {
        let data: Vec<f64> = (0..rows * 3).map(|i| (i + f * rows) as f64 * 0.5).collect();
        if let Ok(value) = Value::new(data, &[rows, 3], "kpc") {
            fields.insert(format!("field_{f}"), value);
        }
    }
    let mut selectors = IndexMap::new();
    selectors.insert(
        "particle_g".to_string(),
        Selector::BoolArray(scattered_mask(rows.max(1), rows / 10, 42)),
    );
    CacheEntry {
        fingerprint: "bench".into(),
        config_hash: 0xDEAD_BEEF,
        fields,
        selectors,
        transforms: TransformStack::from_ops(vec![
            TransformOp::Translate {
                class: CoordClass::Position,
                offset: Offset::new([1.0, 2.0, 3.0], "kpc"),
            },
            TransformOp::Rotate {
                matrix: [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            },
        ]),
    }
}
