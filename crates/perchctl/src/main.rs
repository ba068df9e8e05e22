use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perchd_core::config;
use perchd_core::ipc::{self, ClientMsg, DaemonMsg};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "perchctl", about = "Control the perchd seat-strip daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show daemon status
    Status,
    /// Print the current seat layout
    Layout,
    /// Follow pushed layout and feedback messages
    Watch,
    /// Stream a JSON-lines gesture trace at the daemon
    Replay {
        /// Trace file with one client message per line
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket_path = config::socket_path();
    let stream = UnixStream::connect(&socket_path).with_context(|| {
        format!(
            "connecting to perchd at {}\nIs the daemon running?",
            socket_path.display()
        )
    })?;

    let mut writer = stream.try_clone().context("cloning stream")?;
    let reader = BufReader::new(stream);

    match cli.command {
        Command::Status => {
            send(&mut writer, &ClientMsg::GetStatus)?;
            for msg in responses(reader) {
                if let DaemonMsg::Status {
                    version,
                    capacity,
                    dragging,
                } = msg
                {
                    println!("perchd v{}", version);
                    println!("  capacity: {}", capacity);
                    println!("  dragging: {}", dragging);
                    break;
                }
            }
        }
        Command::Layout => {
            send(&mut writer, &ClientMsg::GetLayout)?;
            for msg in responses(reader) {
                if let DaemonMsg::Layout { seats } = msg {
                    print_layout(&seats);
                    break;
                }
            }
        }
        Command::Watch => {
            send(&mut writer, &ClientMsg::Watch)?;
            for msg in responses(reader) {
                match msg {
                    DaemonMsg::Layout { seats } => print_layout(&seats),
                    DaemonMsg::FolderPreview { seat, active } => {
                        println!("folder preview at seat {}: {}", seat, active)
                    }
                    DaemonMsg::FolderHover { seat, active } => {
                        println!("folder hover at seat {}: {}", seat, active)
                    }
                    DaemonMsg::OriginVisibility { visible } => {
                        println!("origin visible: {}", visible)
                    }
                    DaemonMsg::Ack { message, .. } => println!("{}", message),
                    _ => {}
                }
            }
        }
        Command::Replay { file } => {
            let trace = std::fs::read_to_string(&file)
                .with_context(|| format!("reading trace {}", file.display()))?;
            let mut sent = 0usize;
            for line in trace.lines() {
                let Some(msg) = ipc::decode_client(line) else {
                    continue;
                };
                send(&mut writer, &msg)?;
                sent += 1;
            }
            // ask for the final layout so the replay ends with something to show
            send(&mut writer, &ClientMsg::GetLayout)?;
            println!("replayed {} messages from {}", sent, file.display());
            for msg in responses(reader) {
                match msg {
                    DaemonMsg::DropResult { handled, cancelled } => {
                        println!("drop: handled={} cancelled={}", handled, cancelled)
                    }
                    DaemonMsg::Accept { accept } => println!("accept probe: {}", accept),
                    DaemonMsg::Ack { ok: false, message } => eprintln!("error: {}", message),
                    DaemonMsg::Layout { seats } => {
                        print_layout(&seats);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

fn send(writer: &mut UnixStream, msg: &ClientMsg) -> Result<()> {
    let line = ipc::encode(msg);
    writer.write_all(line.as_bytes()).context("sending command")
}

fn responses(reader: BufReader<UnixStream>) -> impl Iterator<Item = DaemonMsg> {
    reader
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| ipc::decode_daemon(&line))
}

fn print_layout(seats: &[perchd_core::ipc::SeatInfo]) {
    if seats.is_empty() {
        println!("(strip is empty)");
        return;
    }
    for seat in seats {
        let kind = match seat.kind {
            perchd_core::item::ItemKind::Shortcut => "shortcut".to_string(),
            perchd_core::item::ItemKind::Folder => format!("folder, {} items", seat.member_count),
        };
        let hidden = if seat.visible { "" } else { " [hidden]" };
        println!("  seat {}: {} ({}){}", seat.seat, seat.title, kind, hidden);
    }
}
