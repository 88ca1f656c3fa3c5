mod args;
mod config;
mod endpoint;
mod error;
mod fields;
mod query;
mod transport;

use error::{Outcome, UpdateError};
use std::io::Write;

/// User-Agent header value for HTTP requests
pub const USER_AGENT: &str = concat!("dyndns-update/", env!("CARGO_PKG_VERSION"));

fn log_level(verbose: u8, no_output: bool, errors_to_stderr: bool) -> log::LevelFilter {
    if no_output {
        if errors_to_stderr {
            log::LevelFilter::Error
        } else {
            log::LevelFilter::Off
        }
    } else {
        match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Logger configured from the flags only; `RUST_LOG` is not read.
fn logger_builder(verbose: u8, no_output: bool, errors_to_stderr: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, log_level(verbose, no_output, errors_to_stderr))
        .target(env_logger::Target::Stdout)
        .format(move |buf, record| {
            if errors_to_stderr && record.level() == log::Level::Error {
                eprintln!("{} [dyndns-update] : {}", record.level(), record.args());
            }
            if no_output {
                return Ok(());
            }
            writeln!(buf, "{} [dyndns-update] : {}", record.level(), record.args())
        });
    builder
}

fn init_logger(verbose: u8, no_output: bool, errors_to_stderr: bool) {
    logger_builder(verbose, no_output, errors_to_stderr).init();
}

/// Log the result of the run and turn it into an outcome.
fn report(result: &Result<query::ServerReply, UpdateError>) -> Outcome {
    match result {
        Ok(_) => log::info!("Successfully updated"),
        Err(UpdateError::Network { kind, detail }) => {
            log::debug!("=> {}: {}", kind, detail);
            log::error!("could not reach server ({})", kind);
        }
        Err(e) => log::error!("{}", e),
    }
    Outcome::from(result)
}

fn run(args: &args::Args) -> Outcome {
    let result = config::Config::load(args)
        .and_then(|config| config::RunConfig::build(&config))
        .and_then(|run_config| {
            log::debug!("config fields {:?}", run_config.fields);
            query::execute(&run_config)
        });
    report(&result)
}

fn main() {
    let args = args::Args::new();
    init_logger(args.verbose, args.no_output, args.errors_to_stderr);

    std::process::exit(run(&args).exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn args_with_file(content: &str) -> (tempfile::NamedTempFile, args::Args) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        let args = args::Args {
            file: Some(file.path().display().to_string()),
            ..Default::default()
        };
        (file, args)
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("dyndns-update/"));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0, false, false), log::LevelFilter::Info);
        assert_eq!(log_level(1, false, false), log::LevelFilter::Debug);
        assert_eq!(log_level(3, false, false), log::LevelFilter::Trace);
        assert_eq!(log_level(0, true, false), log::LevelFilter::Off);
        assert_eq!(log_level(0, true, true), log::LevelFilter::Error);
    }

    #[test]
    fn test_logger_ignores_rust_log() {
        std::env::set_var("RUST_LOG", "trace");
        let logger = logger_builder(0, false, false).build();
        std::env::remove_var("RUST_LOG");
        assert_eq!(logger.filter(), log::LevelFilter::Info);

        let logger = logger_builder(0, true, true).build();
        assert_eq!(logger.filter(), log::LevelFilter::Error);
    }

    #[test]
    fn test_run_with_huge_timeout() {
        let (_file, mut args) = args_with_file(
            "server_url=http://127.0.0.1:9/\ndyndns_myip=1.1.1.1\ndyndns_hostname=a.example.com\n",
        );
        args.timeout = Some(u64::MAX);
        assert_eq!(run(&args).exit_code(), 2);
    }

    #[test]
    fn test_run_without_server_url() {
        let (_file, args) = args_with_file("");
        assert_eq!(run(&args).exit_code(), 3);
    }

    #[test]
    fn test_run_with_invalid_url() {
        let (_file, mut args) = args_with_file("");
        args.dyn_server = Some("ftp://lmdaz".to_string());
        assert_eq!(run(&args).exit_code(), 2);
    }

    #[test]
    fn test_run_with_missing_settings() {
        let (_file, mut args) = args_with_file("");
        args.dyn_server = Some("http://lmdaz".to_string());
        assert_eq!(run(&args).exit_code(), 3);
    }

    #[test]
    fn test_run_full_update() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("good 1.1.1.1")
            .create();

        let (_file, args) = args_with_file(&format!(
            "server_url={}/\ndyndns_myip=1.1.1.1\ndyndns_hostname=mydyndnshostname.com\n",
            server.url()
        ));
        assert_eq!(run(&args), Outcome::Success);
        mock.assert();
    }

    #[test]
    fn test_run_auth_required() {
        let mut server = mockito::Server::new();
        server.mock("GET", mockito::Matcher::Any).with_status(401).create();

        let (_file, mut args) = args_with_file("dyndns_myip=1.1.1.1\n");
        args.dyn_server = Some(server.url());
        args.dyn_hostname = vec!["mydyndnshostname.com".to_string()];
        assert_eq!(run(&args).exit_code(), 11);
    }
}
