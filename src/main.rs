use access_milter::engine::AccessEngine;
use access_milter::milter::Milter;
use access_milter::reload::{spawn_sighup_reload, summarize, ListLoader};
use access_milter::tld::{SuffixTable, TldLookup};
use access_milter::Config;
use clap::{Arg, Command};
use log::LevelFilter;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("access-milter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Whitelist/blacklist access control milter for SMTP stages")
        .long_about(
            "access-milter answers the MTA at every stage of an inbound\n\
             transaction: connection (reverse DNS and IP), HELO, envelope\n\
             sender, envelope recipient, and a transaction-wide organizational\n\
             domain check that also covers the From header after DATA.\n\
             Lists live in flat files and reload atomically on SIGHUP.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/access-milter.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Load configuration and lists, print a per-slot summary")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("daemon")
                .short('d')
                .long("daemon")
                .help("Run as a daemon (background process)")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logger based on verbose flag
    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config_path = matches.get_one::<String>("config").unwrap();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let tld: Arc<dyn TldLookup> = Arc::new(SuffixTable::with_extras(&config.tld.two_level_suffixes));
    let loader = ListLoader::new(&config, tld.clone());

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        println!("List directory: {}", config.list_dir);

        let lists = loader.load_all();
        let summary = summarize(&lists);
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to render summary: {e}");
                process::exit(1);
            }
        }

        let dropped: usize = summary.values().map(|slot| slot.dropped).sum();
        if dropped > 0 {
            println!("⚠️  {dropped} invalid entries were dropped (see warnings above)");
        }
        println!("✅ Configuration loaded: {} list slots populated", summary.len());
        return;
    }

    if matches.get_flag("daemon") {
        #[cfg(unix)]
        {
            use std::fs::OpenOptions;
            use std::os::unix::io::AsRawFd;

            log::info!("Starting access-milter in daemon mode...");

            // First fork
            match unsafe { libc::fork() } {
                -1 => {
                    log::error!("Failed to fork process");
                    process::exit(1);
                }
                0 => {
                    // Child process continues
                }
                _ => {
                    // Parent process exits
                    process::exit(0);
                }
            }

            // Create new session (become session leader)
            if unsafe { libc::setsid() } == -1 {
                log::error!("Failed to create new session");
                process::exit(1);
            }

            // Second fork to ensure we're not a session leader
            match unsafe { libc::fork() } {
                -1 => {
                    log::error!("Failed to second fork");
                    process::exit(1);
                }
                0 => {
                    // Child process continues as daemon
                }
                _ => {
                    process::exit(0);
                }
            }

            // Change working directory to root to avoid keeping any directory in use
            let root_path = std::ffi::CString::new("/").unwrap();
            if unsafe { libc::chdir(root_path.as_ptr()) } == -1 {
                log::warn!("Failed to change working directory to /");
            }

            // Set file creation mask
            unsafe {
                libc::umask(0);
            }

            // Redirect standard file descriptors to /dev/null
            if let Ok(dev_null) = OpenOptions::new().read(true).write(true).open("/dev/null") {
                let null_fd = dev_null.as_raw_fd();
                unsafe {
                    libc::dup2(null_fd, 0); // stdin
                    libc::dup2(null_fd, 1); // stdout
                    libc::dup2(null_fd, 2); // stderr
                }
                std::mem::forget(dev_null);
            } else {
                log::warn!("Failed to open /dev/null, closing standard file descriptors");
                unsafe {
                    libc::close(0);
                    libc::close(1);
                    libc::close(2);
                }
            }

            // Write PID file for the rc system
            let pid_file_path = "/var/run/access-milter.pid";
            let pid = unsafe { libc::getpid() };
            if let Err(e) = std::fs::write(pid_file_path, pid.to_string()) {
                log::warn!("Failed to write PID file: {e}");
            } else {
                log::info!("PID file written: {pid_file_path} ({pid})");
            }

            // Clean up the PID file on shutdown
            ctrlc::set_handler(move || {
                log::info!("Received shutdown signal, cleaning up...");
                if std::path::Path::new(pid_file_path).exists() {
                    if let Err(e) = std::fs::remove_file(pid_file_path) {
                        log::warn!("Failed to remove PID file: {e}");
                    } else {
                        log::info!("PID file removed");
                    }
                }
                std::process::exit(0);
            })
            .expect("Error setting signal handler");

            log::info!("Daemon mode initialization complete");
        }

        #[cfg(not(unix))]
        {
            log::warn!("Daemon mode not supported on this platform, running in foreground");
        }
    }

    log::info!("Starting access-milter...");

    let socket_path = config.socket_path.clone();
    let engine = Arc::new(AccessEngine::new(config, tld));
    engine.install(loader.load_all());
    spawn_sighup_reload(engine.clone(), loader);

    let milter = Milter::new(engine);
    if let Err(e) = milter.run(&socket_path).await {
        log::error!("Milter error: {e}");
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}
