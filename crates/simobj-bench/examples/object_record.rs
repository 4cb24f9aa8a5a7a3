//! End-to-end object record example.
//!
//! Demonstrates: configure masks and recentering → open a record over a
//! snapshot → load fields lazily → rotate into the angular-momentum frame →
//! undo the rotation → reopen from the disk cache.

use simobj_bench::{halo_config, halo_source};
use simobj_core::Identifier;
use simobj_record::{CacheConfig, InitArgs, Record};

fn main() {
    println!("=== simobj object record example ===\n");

    let cache_dir = std::env::temp_dir().join("simobj-example");
    let init = InitArgs::new(
        Identifier::new().with("sim", "example").with("snap", 28),
        Identifier::new().with("fof", 0),
    );

    {
        let config = halo_config(CacheConfig::in_dir(&cache_dir));
        let mut record = Record::open(halo_source(20_000, 20), init.clone(), config).unwrap();

        let xyz = record.get("xyz_g").unwrap();
        println!("xyz_g: {} particles, unit {}", xyz.rows(), xyz.unit());
        println!("first particle (recentered, wrapped): {:?}", xyz.row(0));

        let matrix = record
            .rotate_align("xyz_g", "vxyz_g", "mass_g", 0.5)
            .unwrap();
        println!("\nalignment matrix:");
        for row in matrix {
            println!("  [{:+.4} {:+.4} {:+.4}]", row[0], row[1], row[2]);
        }
        println!("first particle (aligned): {:?}", record.get("xyz_g").unwrap().row(0));

        record.unrotate().unwrap();
        println!("first particle (unrotated): {:?}", record.get("xyz_g").unwrap().row(0));
        println!("\nloaded: {:?}", record.loaded_fields().collect::<Vec<_>>());
    }

    let config = halo_config(CacheConfig::in_dir(&cache_dir));
    let record = Record::open(halo_source(20_000, 20), init, config).unwrap();
    println!(
        "\nreopened from cache: {:?}, {} source reads",
        record.loaded_fields().collect::<Vec<_>>(),
        record.source().loads.len()
    );

    let _ = std::fs::remove_dir_all(&cache_dir);
    println!("\n=== Done ===");
}
