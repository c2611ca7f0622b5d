use {
    crate::governance::GovernanceSubCommands,
    clap::{App, AppSettings, Arg},
};

pub fn app<'a, 'b>(name: &'b str, about: &'b str, version: &'b str) -> App<'a, 'b> {
    App::new(name)
        .about(about)
        .version(version)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("config_file")
                .short("C")
                .long("config")
                .value_name("FILEPATH")
                .takes_value(true)
                .global(true)
                .help("Configuration file to use [default: ~/.config/bondgov/config.yml]"),
        )
        .arg(
            Arg::with_name("json_rpc_url")
                .short("u")
                .long("url")
                .value_name("URL")
                .takes_value(true)
                .global(true)
                .help("JSON RPC URL of the cluster"),
        )
        .arg(
            Arg::with_name("keypair")
                .short("k")
                .long("keypair")
                .value_name("KEYPAIR")
                .takes_value(true)
                .global(true)
                .help("Filepath of the signing keypair"),
        )
        .arg(
            Arg::with_name("output_format")
                .long("output")
                .value_name("FORMAT")
                .takes_value(true)
                .global(true)
                .possible_values(&["json", "json-compact"])
                .help("Return information in specified output format"),
        )
        .governance_subcommands()
}
