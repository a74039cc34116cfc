use std::io;

use anyhow::{
  Context,
  Result,
};
use misc_default::{
  CommandRegistry,
  Settings,
};
use misc_loader::{
  Config,
  Paths,
};
use misc_plugin::{
  batch,
  cli::{
    CliOptions,
    Mode,
  },
  health,
  logging::setup_logging,
};
use misc_rpc::{
  RpcHost,
  Server,
  Transport,
};

fn main() -> Result<()> {
  let exit_code = main_impl()?;
  std::process::exit(exit_code);
}

fn main_impl() -> Result<i32> {
  let options = CliOptions::parse()?;

  let config_file = match options.config_file.clone() {
    Some(path) => path,
    None => misc_loader::default_config_file()?,
  };
  let config = Config::load(&config_file)?;
  let paths = Paths::resolve(&config, config_file, options.log_file.clone())?;

  if options.mode == Mode::Health {
    health::run(&paths, &config)?;
    return Ok(0);
  }

  setup_logging(options.verbosity, &paths.log_file, config.log_max_bytes())
    .context("failed to initialize logging")?;
  log::info!("starting misc-plugin {}", env!("CARGO_PKG_VERSION"));
  for dir in paths.search_paths() {
    log::debug!("search path: {}", dir.display());
  }

  let registry = CommandRegistry::new();
  let settings = Settings {
    python: config.python(),
  };

  let exit_code = match &options.mode {
    Mode::Exec(exec) => batch::run(&registry, &settings, exec)?,
    _ => serve(registry, settings)?,
  };

  log::info!("exiting with code {exit_code}");
  log::logger().flush();
  Ok(exit_code)
}

fn serve(registry: CommandRegistry, settings: Settings) -> Result<i32> {
  let transport = Transport::new(io::stdin().lock(), io::stdout().lock());
  let mut server = Server::new(RpcHost::new(transport), registry, settings);
  server.run()?;
  Ok(0)
}
