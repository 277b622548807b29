// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use clap::Parser;


#[derive(Debug, Parser)]
#[clap(author, version, about)]
/// Uses the `clap` crate to parse runtime parameters from the command line.
pub struct CommandLineArgs {
  /// Set path for config file
  #[clap(short, long, default_value = "./conf/copiloto.toml")]
  pub config_path:   String,
  /// Override the location of the persisted settings (destination and API
  /// key); defaults to the user config directory
  #[clap(short, long)]
  pub settings_path: Option<String>,
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::CommandLineArgs;

  use clap::Parser;
  use pretty_assertions::assert_eq;


  #[test]
  fn cla_test() {
    let cla = CommandLineArgs::parse_from(["copiloto"]);
    assert_eq!(cla.config_path, String::from("./conf/copiloto.toml"));
    assert_eq!(cla.settings_path, None);

    let cla = CommandLineArgs::parse_from(["copiloto",
                                           "-c",
                                           "/etc/copiloto.toml",
                                           "--settings-path",
                                           "/tmp/settings.toml"]);
    assert_eq!(cla.config_path, String::from("/etc/copiloto.toml"));
    assert_eq!(cla.settings_path, Some(String::from("/tmp/settings.toml")));
  }
}
