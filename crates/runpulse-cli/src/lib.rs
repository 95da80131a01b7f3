pub mod commands;

/// Runs one CLI command and returns the process exit code.
pub fn run(args: &[String]) -> anyhow::Result<i32> {
    if args.is_empty() {
        print_usage();
        anyhow::bail!("No command provided");
    }

    match args[0].as_str() {
        "report" => commands::report::execute(&args[1..]),
        "escalate" => commands::escalate::execute(&args[1..]),
        "notify" => commands::notify::execute(&args[1..]),
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(0)
        }
        "-v" | "--version" => {
            print_version();
            Ok(0)
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", args[0]);
            print_usage();
            anyhow::bail!("Unknown command: {}", args[0])
        }
    }
}

fn print_usage() {
    println!("Runpulse - test result aggregation, reporting and failure escalation");
    println!();
    println!("USAGE:");
    println!("    runpulse <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    report <results.json>      Render reports, escalate failures and send the digest");
    println!("    escalate <results.json>    Create tracker issues for failed tests only");
    println!("    notify                     Send the digest for an earlier run");
    println!("    help                       Print this help message");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>      TOML configuration (environment variables override it)");
    println!("    --results <file>     Results file for notify (default <output_dir>/results.json)");
    println!("    -h, --help           Print help information");
    println!("    -v, --version        Print version information");
}

fn print_version() {
    println!("runpulse {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_command_is_an_error() {
        assert!(run(&[]).is_err());
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let err = run(&args(&["deploy"])).unwrap_err();
        assert!(err.to_string().contains("deploy"));
    }

    #[test]
    fn test_help_and_version_exit_zero() {
        assert_eq!(run(&args(&["help"])).unwrap(), 0);
        assert_eq!(run(&args(&["--version"])).unwrap(), 0);
    }
}
