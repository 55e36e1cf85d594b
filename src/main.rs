extern crate wattbox;

use std::{process, time::Duration};

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use wattbox::{
    capabilities::Switch,
    config::Scheme,
    datatypes::Outlet,
    error::{Error, Result},
    Config, WattBox,
};

fn command_status(wattbox: &WattBox, json: bool) -> Result<()> {
    let outlets = wattbox.outlets()?;
    if json {
        let json = serde_json::to_string(outlets).map_err(|err| Error::Parse(err.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let info = wattbox.info()?;
    println!(
        "{}\t{}\t{}\tUPS: {}",
        info.hostname.as_deref().unwrap_or("-"),
        info.hardware_version.as_deref().unwrap_or("-"),
        info.serial_number.as_deref().unwrap_or("-"),
        if info.has_ups { "yes" } else { "no" },
    );
    for outlet in outlets {
        print_outlet(outlet);
    }
    Ok(())
}

fn print_outlet(outlet: &Outlet) {
    println!(
        "{}\t{}\t{}",
        outlet.index,
        pad(&outlet.name, 24),
        if outlet.on { "on" } else { "off" }
    );
}

fn pad(value: &str, padding: usize) -> String {
    let pad = " ".repeat(padding.saturating_sub(value.len()));
    format!("{}{}", value, pad)
}

fn outlet_index(matches: &ArgMatches) -> usize {
    matches
        .value_of("outlet")
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

fn config(matches: &ArgMatches) -> Config {
    let timeout = matches
        .value_of("timeout")
        .and_then(|value| value.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(wattbox::config::DEFAULT_TIMEOUT);
    let scheme = if matches.is_present("https") {
        Scheme::Https
    } else {
        Scheme::Http
    };
    Config::new(
        matches.value_of("host").unwrap_or_default(),
        matches.value_of("username").unwrap_or_default(),
        matches.value_of("password").unwrap_or_default(),
    )
    .timeout(timeout)
    .scheme(scheme)
    .dry_run(matches.is_present("dry-run"))
}

fn run(matches: &ArgMatches) -> Result<()> {
    let mut wattbox = WattBox::with_config(config(matches));
    wattbox.load()?;

    match matches.subcommand() {
        ("on", Some(sub)) => wattbox.switch_on(outlet_index(sub)),
        ("off", Some(sub)) => wattbox.switch_off(outlet_index(sub)),
        ("reset", Some(sub)) => wattbox.reset_outlet(outlet_index(sub)),
        ("toggle", Some(sub)) => {
            let on = wattbox.toggle(outlet_index(sub))?;
            println!("{}", if on { "on" } else { "off" });
            Ok(())
        }
        _ => command_status(&wattbox, matches.is_present("json")),
    }
}

fn outlet_arg() -> Arg<'static, 'static> {
    Arg::with_name("outlet")
        .required(true)
        .validator(|value| {
            value
                .parse::<usize>()
                .map(|_| ())
                .map_err(|_| String::from("outlet must be a number"))
        })
        .help("Outlet number, starting at 1")
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let matches = App::new("WattBox CLI")
        .version("0.1")
        .about("Query and switch the outlets of a WattBox power strip.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("host")
            .long("host")
            .env("WATTBOX_HOST")
            .required(true)
            .help("Host name or address of the WattBox.")
        )
        .arg(Arg::with_name("username")
            .long("username")
            .env("WATTBOX_USERNAME")
            .required(true)
            .help("Login user name.")
        )
        .arg(Arg::with_name("password")
            .long("password")
            .env("WATTBOX_PASSWORD")
            .hide_env_values(true)
            .required(true)
            .help("Login password.")
        )
        .arg(Arg::with_name("timeout")
            .long("timeout")
            .takes_value(true)
            .help("Request timeout in seconds.")
        )
        .arg(Arg::with_name("https")
            .long("https")
            .takes_value(false)
            .help("Talk to the device over HTTPS.")
        )
        .arg(Arg::with_name("json")
            .long("json")
            .takes_value(false)
            .help("Respond with JSON.")
        )
        .arg(Arg::with_name("dry-run")
            .long("dry-run")
            .takes_value(false)
            .help("Log outlet commands instead of sending them.")
        )
        .subcommand(SubCommand::with_name("status")
            .about("Show the outlets and their states")
        )
        .subcommand(SubCommand::with_name("on")
            .about("Switch an outlet on")
            .arg(outlet_arg())
        )
        .subcommand(SubCommand::with_name("off")
            .about("Switch an outlet off")
            .arg(outlet_arg())
        )
        .subcommand(SubCommand::with_name("reset")
            .about("Power cycle an outlet")
            .arg(outlet_arg())
        )
        .subcommand(SubCommand::with_name("toggle")
            .about("Flip an outlet based on its current state")
            .arg(outlet_arg())
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        eprintln!("{}", err);
        process::exit(1);
    }
}
