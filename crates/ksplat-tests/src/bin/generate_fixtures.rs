//! Writes sample scenes for trying the CLI by hand.
//!
//! ```bash
//! cargo run --bin generate_fixtures -p ksplat-tests -- target/fixtures
//! ksplat stream target/fixtures/two_sections.ksplat --granularity 1024
//! ```
//!
//! | File                 | Contents                                     |
//! |----------------------|----------------------------------------------|
//! | two_sections.ksplat  | Level 2, 100 + 50 splats, SH degree 0 and 2  |
//! | level0.ksplat        | Level 0, three sections of 1000 splats       |
//! | rows.splat           | 5000 raw rows, every tenth fully transparent |

#![allow(clippy::pedantic)]

use std::path::PathBuf;

use ksplat_tests::{level0_scene, raw_rows, splat, two_section_scene};

fn main() {
    let dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("fixtures"), PathBuf::from);
    std::fs::create_dir_all(&dir).unwrap();

    let rows: Vec<_> = (0..5000)
        .map(|i| splat(i, if i % 10 == 0 { 0 } else { 255 }))
        .collect();

    for (name, bytes) in [
        ("two_sections.ksplat", two_section_scene()),
        ("level0.ksplat", level0_scene(&[1000, 1000, 1000])),
        ("rows.splat", raw_rows(&rows)),
    ] {
        let path = dir.join(name);
        std::fs::write(&path, &bytes).unwrap();
        println!("wrote {} ({} bytes)", path.display(), bytes.len());
    }
}
