//! Reusable snapshot fixtures.
//!
//! [`galaxy_source`] builds a small periodic-box snapshot with a group
//! catalogue, one gas particle table, and a header:
//!
//! - keytype `"group"`: `gns`, `sgns`, `cops`, `vcents`, `offID`, `nID`
//! - keytype `"particle_g"`: `ng_g`, `nsg_g`, `xyz_g`, `vxyz_g`, `mass_g`
//! - keytype `"idgroup"`: `ids`
//! - keytype `"header"`: `Lbox`

use simobj_core::Value;

use crate::MockFieldSource;

/// Side length of the fixture box, in kpc.
pub const BOX: f64 = 1000.0;

/// Number of gas particles in the fixture.
pub const N_GAS: usize = 24;

/// Group centres (kpc). Group `(fof=1, sub=0)` straddles the box edge.
pub const COPS: [[f64; 3]; 4] = [
    [995.0, 2.0, 500.0],
    [300.0, 300.0, 300.0],
    [600.0, 100.0, 900.0],
    [50.0, 950.0, 10.0],
];

/// Group bulk velocities (km/s).
pub const VCENTS: [[f64; 3]; 4] = [
    [10.0, -5.0, 0.0],
    [0.0, 0.0, 0.0],
    [-20.0, 3.0, 7.0],
    [1.0, 1.0, 1.0],
];

/// `(fof, sub)` of each catalogue row.
pub const GROUPS: [(i64, i64); 4] = [(1, 0), (1, 1), (2, 0), (3, 0)];

/// Catalogue row of the group a particle belongs to.
///
/// Particles cycle through groups so every group's members are scattered.
pub fn particle_group_row(i: usize) -> usize {
    i % GROUPS.len()
}

/// Offset of particle `i` from its group centre, before box wrapping.
pub fn particle_offset(i: usize) -> [f64; 3] {
    let k = (i / GROUPS.len()) as f64;
    [k * 3.0 - 6.0, 4.0 - k * 1.5, k * 0.5]
}

fn wrap_into_box(x: f64) -> f64 {
    x.rem_euclid(BOX)
}

/// The fixture snapshot.
pub fn galaxy_source() -> MockFieldSource {
    let mut src = MockFieldSource::new();

    let col = |f: &dyn Fn(usize) -> f64, n: usize| (0..n).map(f).collect::<Vec<_>>();

    src.add_field(
        "gns",
        "group",
        Value::column(col(&|g| GROUPS[g].0 as f64, GROUPS.len()), ""),
    );
    src.add_field(
        "sgns",
        "group",
        Value::column(col(&|g| GROUPS[g].1 as f64, GROUPS.len()), ""),
    );
    src.add_field("cops", "group", Value::vectors(&COPS, "kpc"));
    src.add_field("vcents", "group", Value::vectors(&VCENTS, "km/s"));

    // Particle IDs are stored sorted by group: 6 per group.
    let per_group = N_GAS / GROUPS.len();
    src.add_field(
        "offID",
        "group",
        Value::column(col(&|g| (g * per_group) as f64, GROUPS.len()), ""),
    );
    src.add_field(
        "nID",
        "group",
        Value::column(vec![per_group as f64; GROUPS.len()], ""),
    );
    src.add_field(
        "ids",
        "idgroup",
        Value::column(col(&|i| 1000.0 + i as f64, N_GAS), ""),
    );

    src.add_field(
        "ng_g",
        "particle_g",
        Value::column(col(&|i| GROUPS[particle_group_row(i)].0 as f64, N_GAS), ""),
    );
    src.add_field(
        "nsg_g",
        "particle_g",
        Value::column(col(&|i| GROUPS[particle_group_row(i)].1 as f64, N_GAS), ""),
    );

    let xyz: Vec<[f64; 3]> = (0..N_GAS)
        .map(|i| {
            let c = COPS[particle_group_row(i)];
            let o = particle_offset(i);
            [
                wrap_into_box(c[0] + o[0]),
                wrap_into_box(c[1] + o[1]),
                wrap_into_box(c[2] + o[2]),
            ]
        })
        .collect();
    src.add_field("xyz_g", "particle_g", Value::vectors(&xyz, "kpc"));

    let vxyz: Vec<[f64; 3]> = (0..N_GAS)
        .map(|i| {
            let v = VCENTS[particle_group_row(i)];
            let o = particle_offset(i);
            // Rotation-like velocity field around z.
            [v[0] - o[1], v[1] + o[0], v[2]]
        })
        .collect();
    src.add_field("vxyz_g", "particle_g", Value::vectors(&vxyz, "km/s"));
    src.add_field(
        "mass_g",
        "particle_g",
        Value::column(col(&|i| 1.0 + (i % 3) as f64, N_GAS), "Msun"),
    );

    src.add_field("Lbox", "header", Value::scalar(BOX, "kpc"));
    src
}

/// A ten-row column `[0, 1, ..., 9]` under keytype `"p"`, named `"x"`.
pub fn counting_source() -> MockFieldSource {
    MockFieldSource::new().with_field("x", "p", Value::column((0..10).map(f64::from).collect(), ""))
}
