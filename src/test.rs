use std::{fs, path::Path};

use tempfile::TempDir;

use crate::{
    compare::test::paths,
    config::{
        band_config::{CompareTask, ExportBandTask},
        dos_config::{DosTask, ProjectionTask},
        wannier_config::KpathTask,
        window_config::WindowTask,
        Config, TaskProcess,
    },
    parser::{
        band_dat::BandPath,
        doscar::test::{doscar_text, noncollinear_doscar_text},
        eigenval::test::EIGENVAL_SPIN1,
        poscar::test::POSCAR_GAAS,
    },
    W90Error,
};

const VASPRUN: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <dos>
  <i name="efermi">      5.50000000 </i>
 </dos>
</modeling>
"#;

const KPOINTS_GX: &str = "k-points along high symmetry lines
 3
Line-mode
rec
  0.0 0.0 0.0 ! G
  0.5 0.0 0.0 ! X
";

const EIGENVAL_SPIN2: &str = "    2    2    1    2
  0.1000000E+02  0.3800000E-09  0.3800000E-09  0.3800000E-09  0.5000000E-15
  1.000000000000000E-004
  CAR
 Fe

     8     3     2

  0.0000000E+00  0.0000000E+00  0.0000000E+00  0.3333333E+00
    1       -5.800000   -5.600000   1.000000   1.000000
    2        6.200000    6.400000   0.000000   0.000000

  0.2500000E+00  0.0000000E+00  0.0000000E+00  0.3333333E+00
    1       -4.900000   -4.700000   1.000000   1.000000
    2        5.100000    5.300000   0.000000   0.000000

  0.5000000E+00  0.0000000E+00  0.0000000E+00  0.3333334E+00
    1       -3.500000   -3.300000   1.000000   1.000000
    2        4.000000    4.200000   0.000000   0.000000
";

const WOUT: &str = " +--------------------------------------------------------------------+<-- CONV
 | Iter  Delta Spread     RMS Gradient      Spread (Ang^2)      Time  |<-- CONV
 +--------------------------------------------------------------------+<-- CONV
      0     0.152E+02     0.0000000000       15.2150032654       0.01  <-- CONV
      1    -0.110E+00     0.0520155341       15.1050032654       0.02  <-- CONV
      2    -0.131E-03     0.0000052380       14.8913217380       0.03  <-- CONV
      3     0.200E-02     0.0000012380       14.8933217380       0.04  <-- CONV
";

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// A VASP run directory with band energies, DOS, structure and a
/// Wannier90 band interpolation.
fn vasp_run() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "EIGENVAL", EIGENVAL_SPIN1);
    write(dir.path(), "vasprun.xml", VASPRUN);
    write(dir.path(), "DOSCAR", &doscar_text());
    write(dir.path(), "POSCAR", POSCAR_GAAS);
    write(dir.path(), "KPOINTS", KPOINTS_GX);
    write(dir.path(), "wannier90.win", "num_bands = 4\nnum_wann  = 2 ! sp\n");
    write(dir.path(), "wannier90.wout", WOUT);
    let (vasp, w90) = paths(0.0);
    write(dir.path(), "bnd.dat", &vasp.to_dat_string());
    write(dir.path(), "wannier90_band.dat", &w90.to_dat_string());
    dir
}

fn task<T: serde::de::DeserializeOwned>(dir: &TempDir, body: &str) -> T {
    let text = format!("path = {:?}\n{body}", dir.path().display().to_string());
    toml::from_str(&text).unwrap()
}

#[test]
fn test_window_task_reads_run() {
    let dir = vasp_run();
    let window: WindowTask = task(
        &dir,
        "count = [0.0, 7.0]\nsuggest = [-6.0, 7.0]\n[table]\nn_excl = 0\n",
    );
    assert_eq!(window.num_wann().unwrap(), 2);
    let output = window.execute().unwrap();
    assert_eq!(output.report().efermi(), 5.5);
    let table = output.table().unwrap();
    assert_eq!(table.rows().len(), 2);
    assert_eq!(table.rows()[0].first_band, 0);
    let text = output.to_string();
    assert!(text.starts_with("EFERMI: 5.500000"));
    assert!(text.contains("There are 2 states in [0, 7]."));
    assert!(text.contains("dis_win_max  dis_froz_max  dis_froz_min  dis_win_min"));
}

#[test]
fn test_window_task_without_fermi_level() {
    let dir = vasp_run();
    fs::remove_file(dir.path().join("vasprun.xml")).unwrap();
    let window: WindowTask = task(&dir, "");
    assert!(matches!(window.execute(), Err(W90Error::Io { .. })));
    let explicit: WindowTask = task(&dir, "efermi = 6.0\n");
    assert_eq!(explicit.execute().unwrap().report().efermi(), 6.0);
}

#[test]
fn test_compare_task_reads_run() {
    let dir = vasp_run();
    let compare: CompareTask = task(&dir, "");
    let output = compare.execute().unwrap();
    let quality = output.quality().unwrap();
    assert_eq!(quality.offset(), 1);
    assert!((quality.k_ratio() - 2.0).abs() < 1e-9);
    assert!(quality.deviations().iter().all(|d| *d < 0.1));
    let (iter, spread) = output.min_spread().unwrap();
    assert_eq!(iter, 2);
    assert!((spread - 14.891321738).abs() < 1e-9);
    assert!(output.to_string().contains("MIN_NUM_ITER: 2"));
}

#[test]
fn test_compare_task_without_wout() {
    let dir = vasp_run();
    fs::remove_file(dir.path().join("wannier90.wout")).unwrap();
    let compare: CompareTask = task(&dir, "quality = false\n");
    let output = compare.execute().unwrap();
    assert!(output.quality().is_none());
    assert!(output.min_spread().is_none());
}

#[test]
fn test_export_band_task() {
    let dir = vasp_run();
    let export: ExportBandTask = task(&dir, "");
    let output = export.execute().unwrap();
    assert_eq!(output.written().len(), 1);
    assert_eq!(output.written()[0].1, 4);
    let band_path = BandPath::from_file(dir.path().join("bnd.dat")).unwrap();
    assert_eq!(band_path.nbands(), 4);
    assert_eq!(band_path.nk(), 3);
    assert_eq!(band_path.kpath()[0], 0.0);
    assert!(band_path.kpath()[1] > 0.0);
    assert!((band_path.kpath()[2] - 2.0 * band_path.kpath()[1]).abs() < 1e-9);
    assert_eq!(band_path.energies()[[2, 1]], 6.9);
}

#[test]
fn test_export_band_task_spin_polarised() {
    let dir = vasp_run();
    write(dir.path(), "EIGENVAL", EIGENVAL_SPIN2);
    let export: ExportBandTask = task(&dir, "");
    let output = export.execute().unwrap();
    let names: Vec<(String, usize)> = output
        .written()
        .iter()
        .map(|(path, nbands)| (path.file_name().unwrap().to_string_lossy().into_owned(), *nbands))
        .collect();
    assert_eq!(
        names,
        vec![("bnd_up.dat".to_string(), 2), ("bnd_down.dat".to_string(), 2)]
    );
    assert!(output.to_string().starts_with("NSPIN = 2"));
    let up = BandPath::from_file(dir.path().join("bnd_up.dat")).unwrap();
    let down = BandPath::from_file(dir.path().join("bnd_down.dat")).unwrap();
    assert_eq!(up.nk(), 3);
    assert_eq!(up.kpath(), down.kpath());
    assert_eq!(up.energies()[[0, 1]], -4.9);
    assert_eq!(down.energies()[[0, 1]], -4.7);
    assert_eq!(down.energies()[[1, 2]], 4.2);
}

#[test]
fn test_kpath_task() {
    let dir = vasp_run();
    let kpath: KpathTask = task(&dir, "");
    let text = kpath.execute().unwrap().to_string();
    assert!(text.starts_with("G "));
    assert!(text.contains("X      0.50000"));
}

#[test]
fn test_projection_task_reads_run() {
    let dir = vasp_run();
    let projection: ProjectionTask = task(&dir, "erange = [-1.0, 1.0]\nextra = \"Ga,0,0\"\n");
    let output = projection.execute().unwrap();
    assert_eq!(output.lines(), &["Ga:l=0", "As:px"]);
    assert_eq!(output.num_wann(), 4);
    let text = output.to_string();
    assert!(text.contains("Number of Selected WFs: 4"));
    assert!(text.contains("Wannier90 Projection:"));
}

#[test]
fn test_dos_task_writes_columns() {
    let dir = vasp_run();
    let dos: DosTask = task(
        &dir,
        r#"output = "pdos.dat"
[[groups]]
sites = "Ga"
channel = "s"
[[groups]]
sites = "As"
channel = "p"
label = "As-p"
[smearing]
emin = -8.0
emax = 12.0
"#,
    );
    let output = dos.execute().unwrap();
    assert_eq!(output.labels(), &["total", "Ga-s", "As-p"]);
    assert!(output.columns()[1].iter().all(|v| (v - 1.0).abs() < 1e-9));
    assert!(output.columns()[2].iter().all(|v| (v - 2.0).abs() < 1e-9));
    let smeared = output.smeared().unwrap();
    assert_eq!(smeared.num_points(), 2000);
    let written = fs::read_to_string(dir.path().join("pdos.dat")).unwrap();
    assert!(written.starts_with("# EFERMI: 0.500000"));
    assert_eq!(written.lines().count(), 2 + 5);
}

#[test]
fn test_dos_task_noncollinear_doscar() {
    let dir = vasp_run();
    write(dir.path(), "DOSCAR", &noncollinear_doscar_text());
    let dos: DosTask = task(
        &dir,
        r#"[[groups]]
sites = "0"
channel = "s"
[[groups]]
sites = "As"
channel = "p"
"#,
    );
    let output = dos.execute().unwrap();
    assert_eq!(output.labels(), &["total", "0-s", "As-p"]);
    assert!(output.columns()[1].iter().all(|v| (v - 1.0).abs() < 1e-9));
    assert!(output.columns()[2].iter().all(|v| (v - 2.0).abs() < 1e-9));

    let projection: ProjectionTask = task(&dir, "erange = [-1.0, 1.0]\nsoc = false\n");
    let output = projection.execute().unwrap();
    assert_eq!(output.lines(), &["Ga:l=0", "As:px"]);
    assert_eq!(output.num_wann(), 2);
}

#[test]
fn test_config_runs_all_tasks() {
    let dir = vasp_run();
    let path = dir.path().display().to_string();
    let config_text = format!(
        r#"title = "GaAs"

[tasks.template]

[tasks.kpath]
path = {path:?}

[tasks.window]
path = {path:?}
separate = true

[tasks.compare]
path = {path:?}
kernel = "gaussian,5,4"
"#
    );
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, config_text).unwrap();
    let config = Config::from_file(&config_path).unwrap();
    assert_eq!(config.title(), "GaAs");
    let reports = config.tasks().execute_all().unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["template", "kpath", "window", "compare"]);
    assert!(reports[0].to_string().starts_with("[template]"));
    assert!(reports[3].body.contains("Average dE (meV)"));
}

#[test]
fn test_config_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Config::from_file(dir.path().join("config.toml")),
        Err(W90Error::Io { .. })
    ));
    fs::write(dir.path().join("config.toml"), "tasks = 1").unwrap();
    assert!(matches!(
        Config::from_file(dir.path().join("config.toml")),
        Err(W90Error::Config(_))
    ));
}
