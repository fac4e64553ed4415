extern crate halo_painter as hp;

use clap::{Arg, ArgGroup, Command};

use std::{
    fs::File,
    io::{BufWriter, Write},
};

use hp::{
    cfg::{load_catalog, load_cfg, PaintCfg, ProfileChoice},
    Canvas, Painter,
};

fn main() {
    env_logger::init();
    let matches = Command::new("paint_halos")
        .arg(
            Arg::new("cfg")
                .short('c')
                .long("cfg")
                .takes_value(true)
                .value_name("paint cfg")
                .required(false)
                .help("yaml config, defaults used when absent"),
        )
        .arg(
            Arg::new("catalog")
                .short('i')
                .long("catalog")
                .takes_value(true)
                .value_name("catalog")
                .help("yaml halo catalog"),
        )
        .arg(
            Arg::new("mock")
                .short('m')
                .long("mock")
                .takes_value(true)
                .value_name("n halos")
                .help("paint a seeded mock catalog of n halos"),
        )
        .group(ArgGroup::new("input").args(&["catalog", "mock"]).required(true))
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .takes_value(true)
                .value_name("profile")
                .possible_values(["tophat", "gaussian"])
                .help("profile template, overrides cfg"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("out")
                .takes_value(true)
                .value_name("outfile")
                .required(true)
                .help("output map, one pixel value per line in RING order"),
        )
        .arg(
            Arg::new("stack")
                .short('s')
                .long("stack")
                .takes_value(true)
                .value_name("stack file")
                .help("stack cutouts of all halos and write the mean grid"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .takes_value(true)
                .value_name("n workers")
                .help("threads for spraying and stacking, overrides cfg"),
        )
        .get_matches();

    let mut cfg = matches
        .value_of("cfg")
        .map(|p| load_cfg(p).unwrap())
        .unwrap_or_else(PaintCfg::default);
    match matches.value_of("profile") {
        Some("tophat") => cfg.profile = ProfileChoice::Tophat,
        Some("gaussian") => cfg.profile = ProfileChoice::Gaussian,
        _ => {}
    }
    if let Some(w) = matches.value_of("workers") {
        cfg.stack.n_workers = w.parse::<usize>().unwrap();
    }
    let n_workers = cfg.stack.n_workers.max(1);
    cfg.stack.n_workers = n_workers;

    let catalog = match matches.value_of("catalog") {
        Some(path) => load_catalog(path).unwrap(),
        None => cfg
            .mock
            .generate(matches.value_of("mock").unwrap().parse::<usize>().unwrap())
            .unwrap(),
    };

    let painter = Painter::from_arc(cfg.build_profile().unwrap());
    let mut canvas = Canvas::new(&catalog, cfg.canvas.clone()).unwrap();
    let report = if n_workers > 1 {
        painter.spray_parallel(&mut canvas, n_workers).unwrap()
    } else {
        painter.spray(&mut canvas).unwrap()
    };
    eprintln!("{} halos, {} pixel contributions", report.n_halos, report.n_pixels_touched);
    let map = canvas.freeze();

    let mut outfile = BufWriter::new(File::create(matches.value_of("outfile").unwrap()).unwrap());
    for v in map.data() {
        writeln!(outfile, "{}", v).unwrap();
    }

    if let Some(stack_file) = matches.value_of("stack") {
        let halos: Vec<usize> = (0..catalog.len()).collect();
        let stack = map
            .stack_cutouts_parallel(&halos, cfg.cutout_lon, cfg.cutout_lat, &cfg.stack)
            .unwrap();
        let mut outfile = BufWriter::new(File::create(stack_file).unwrap());
        for row in stack.values.rows() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(outfile, "{}", line.join(" ")).unwrap();
        }
        eprintln!("stacked {} halos, {} excluded", stack.n_stacked, stack.excluded.len());
    }
}
