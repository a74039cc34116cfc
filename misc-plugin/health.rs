use std::io::{
  self,
  Write,
};

use misc_loader::{
  Config,
  Paths,
};

pub fn run(paths: &Paths, config: &Config) -> io::Result<()> {
  let stdout = io::stdout();
  let mut stdout = stdout.lock();
  general(&mut stdout, paths, config)
}

pub fn general(out: &mut impl Write, paths: &Paths, config: &Config) -> io::Result<()> {
  if paths.config_file.exists() {
    writeln!(out, "Config file: {}", paths.config_file.display())?;
  } else {
    writeln!(out, "Config file: default")?;
  }

  writeln!(out, "Log file: {}", paths.log_file.display())?;
  writeln!(out, "Base path: {}", paths.base.display())?;
  if !paths.module.exists() {
    writeln!(
      out,
      "Module path {} does not exist",
      paths.module.display()
    )?;
  }
  writeln!(out, "Python: {}", config.python().display())?;
  writeln!(
    out,
    "Search paths: {}",
    paths
      .search_paths()
      .iter()
      .map(|dir| dir.to_string_lossy())
      .collect::<Vec<_>>()
      .join(";")
  )?;

  Ok(())
}
