mod fetch;

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use launcher_control::{Consumer, FetchReport, HttpDataProvider, HttpProviderOptions};
use launcher_desktop::{DesktopClient, StatusLevel};
use launcher_keys::{setup_or_load, JsonFileStore};

#[derive(Parser)]
#[command(name = "launcher-cli", version, about = "Launcher agent operator CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Drive a running desktop helper
    Desktop {
        #[arg(long, default_value_os_t = launcher_util::desktop_socket_path())]
        socket: PathBuf,
        /// Bearer token; defaults to LAUNCHER_DESKTOP_TOKEN
        #[arg(long)]
        token: Option<String>,
        #[command(subcommand)]
        cmd: DesktopCmd,
    },
    /// Control-plane synchronization
    Control {
        #[command(subcommand)]
        cmd: ControlCmd,
    },
    /// Device identity key
    Keys {
        #[command(subcommand)]
        cmd: KeysCmd,
    },
}

#[derive(Subcommand)]
enum DesktopCmd {
    Ping,
    /// Ask the helper to exit
    Shutdown,
    /// Push a status level (healthy, degraded, blocking, idle)
    Status { level: StatusLevel },
}

#[derive(Subcommand)]
enum ControlCmd {
    /// Run one synchronization pass and print every subsystem payload
    Fetch {
        #[arg(long, default_value_t = launcher_util::control_addr())]
        addr: String,
        #[arg(long)]
        disable_tls: bool,
        #[arg(long)]
        insecure: bool,
        /// Sign requests with the device key from the agent store
        #[arg(long)]
        sign: bool,
        #[arg(long, default_value_os_t = default_store_path())]
        store: PathBuf,
    },
}

#[derive(Subcommand)]
enum KeysCmd {
    /// Load (or create) the device key and print its public half
    Show {
        #[arg(long, default_value_os_t = default_store_path())]
        store: PathBuf,
    },
}

fn default_store_path() -> PathBuf {
    launcher_util::state_file_path("agent.json")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Desktop { socket, token, cmd } => {
            let token = token
                .or_else(launcher_util::desktop_token)
                .ok_or("no token: pass --token or set LAUNCHER_DESKTOP_TOKEN")?;
            let client = DesktopClient::new(token, socket);
            match cmd {
                DesktopCmd::Ping => println!("pong from {}", client.ping().await?),
                DesktopCmd::Shutdown => {
                    client.shutdown().await?;
                    println!("shutdown requested");
                }
                DesktopCmd::Status { level } => {
                    client.set_status(level).await?;
                    println!("status set to {level}");
                }
            }
        }
        Cmd::Control { cmd } => match cmd {
            ControlCmd::Fetch {
                addr,
                disable_tls,
                insecure,
                sign,
                store,
            } => {
                let options = HttpProviderOptions {
                    addr,
                    disable_tls: disable_tls || launcher_util::env_flag("LAUNCHER_CONTROL_DISABLE_TLS"),
                    insecure: insecure || launcher_util::env_flag("LAUNCHER_CONTROL_INSECURE"),
                    ..HttpProviderOptions::default()
                };
                let mut provider = HttpDataProvider::new(options)?;
                if sign {
                    let store = JsonFileStore::open(store)?;
                    provider = provider.with_device_key(setup_or_load(&store)?);
                }
                let report = fetch::fetch_once(
                    Arc::new(provider),
                    Box::new(|name: &str| {
                        let label = name.to_string();
                        Arc::new(move |data: &[u8]| {
                            println!("== {label} ({} bytes)", data.len());
                            println!("{}", String::from_utf8_lossy(data));
                        }) as Arc<dyn Consumer>
                    }),
                )
                .await?;
                print_report(&report);
            }
        },
        Cmd::Keys { cmd } => match cmd {
            KeysCmd::Show { store } => {
                let store = JsonFileStore::open(store)?;
                let key = setup_or_load(&store)?;
                println!("store={}", store.path().display());
                println!("kind={}", key.kind());
                println!("public_key={}", key.public_key_base64());
                println!("fingerprint={}", key.fingerprint());
            }
        },
    }

    Ok(())
}

fn print_report(report: &FetchReport) {
    println!("updated={}", report.updated.join(","));
    println!("unchanged={}", report.unchanged.join(","));
    for failure in &report.failed {
        eprintln!("failed {failure}");
    }
}
