use std::fs::File;

use halo_painter::cfg::write_default_cfg;

/// Write the default configuration to `paint.yaml` as a starting point for `paint_halos --cfg`.
pub fn main() {
    let outfile = File::create("paint.yaml").unwrap();
    write_default_cfg(outfile).unwrap();
}
