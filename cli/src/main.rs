use {
    bondgov_cli::{
        clap_app::app,
        cli::{load_config, CliError},
        governance::{parse_governance_command, process_governance_command},
    },
    bondgov_client::{config::read_keypair_file, Session},
    clap::{crate_description, crate_name, crate_version},
    log::*,
    std::{path::Path, process::exit},
};

fn do_main() -> Result<String, CliError> {
    let matches = app(crate_name!(), crate_description!(), crate_version!()).get_matches();
    let command = parse_governance_command(&matches)?;
    let (_, subcommand_matches) = matches.subcommand();
    let (config, client_config) = load_config(subcommand_matches.unwrap_or(&matches))?;

    let keypair_path = Path::new(&client_config.keypair_path);
    let keypair = if command.requires_signer() {
        Some(read_keypair_file(keypair_path)?)
    } else if command.uses_optional_signer() {
        read_keypair_file(keypair_path)
            .map_err(|err| warn!("continuing without a wallet: {err}"))
            .ok()
    } else {
        None
    };
    debug!(
        "using {} at {} commitment",
        client_config.json_rpc_url, client_config.commitment
    );
    let session = Session::from_config(&client_config, keypair)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(process_governance_command(&session, &config, &command))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match do_main() {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("Error: {err}");
            exit(1);
        }
    }
}
