mod alarm;
mod geometry;
mod intent;
mod outcome;
mod session;
mod store;
mod strip;

use anyhow::{Context, Result};
use perchd_core::config::{self, Config};
use perchd_core::ipc::{self, ClientMsg, DaemonMsg};
use session::{DragEngine, Effect};
use std::sync::Arc;
use std::time::Instant;
use store::LayoutStore;
use strip::Strip;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{info, warn};

/// Shared state between the alarm loop and IPC client tasks.
struct Shared {
    engine: DragEngine,
    store: LayoutStore,
    /// Channels to push layout/feedback messages to registered watchers.
    watcher_txs: Vec<mpsc::UnboundedSender<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("perchd=info".parse().unwrap()),
        )
        .init();

    info!("perchd starting");

    let cfg = Config::load().context("loading config")?;
    let store = LayoutStore::new(cfg.store_path());
    let items = store.load().context("loading layout")?;
    info!(
        path = %store.path().display(),
        items = items.len(),
        capacity = cfg.strip.capacity,
        "layout loaded"
    );
    let strip = Strip::from_items(cfg.strip.capacity, items);
    let engine = DragEngine::new(cfg, strip);

    let shared = Arc::new(Mutex::new(Shared {
        engine,
        store,
        watcher_txs: Vec::new(),
    }));
    // Wakes the alarm loop whenever a client event may have armed an alarm.
    let rearm = Arc::new(Notify::new());

    // Start IPC listener
    let socket_path = config::socket_path();
    // Remove stale socket
    let _ = std::fs::remove_file(&socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("binding socket {}", socket_path.display()))?;
    // Make socket accessible by the user's session
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o666)).ok();
    }
    info!(path = %socket_path.display(), "IPC socket listening");

    let shared_accept = Arc::clone(&shared);
    let rearm_accept = Arc::clone(&rearm);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let shared = Arc::clone(&shared_accept);
                    let rearm = Arc::clone(&rearm_accept);
                    tokio::spawn(handle_client(stream, shared, rearm));
                }
                Err(e) => {
                    warn!(error = %e, "IPC accept error");
                }
            }
        }
    });

    // Alarm loop: event-driven timer, no idle wakeups. Sleeps until the
    // engine's earliest debounce deadline; client tasks nudge it whenever an
    // event may have re-armed something.
    loop {
        let deadline = { shared.lock().await.engine.next_deadline() };
        match deadline {
            Some(deadline) => {
                let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                tokio::select! {
                    _ = sleep => {
                        let mut shared = shared.lock().await;
                        let effects = shared.engine.check_alarms(Instant::now());
                        process_effects(&mut shared, effects);
                    }
                    _ = rearm.notified() => {}
                }
            }
            None => rearm.notified().await,
        }
    }
}

fn process_effects(shared: &mut Shared, effects: Vec<Effect>) {
    let mut persist = false;
    let mut layout_changed = false;
    for effect in effects {
        match effect {
            Effect::Persist { .. } => persist = true,
            Effect::LayoutChanged => layout_changed = true,
            Effect::FolderPreview { seat, active } => {
                push_watchers(shared, &DaemonMsg::FolderPreview { seat, active });
            }
            Effect::FolderHover { seat, active } => {
                push_watchers(shared, &DaemonMsg::FolderHover { seat, active });
            }
            Effect::OriginVisibility { visible } => {
                push_watchers(shared, &DaemonMsg::OriginVisibility { visible });
            }
        }
    }
    if layout_changed {
        let seats = shared.engine.layout();
        push_watchers(shared, &DaemonMsg::Layout { seats });
    }
    if persist {
        // fire-and-forget: the drag-end sync pass rewrites the whole layout
        if let Err(e) = shared.store.save(&shared.engine.snapshot()) {
            warn!(error = %e, "layout persist failed");
        }
    }
}

fn push_watchers(shared: &mut Shared, msg: &DaemonMsg) {
    let line = ipc::encode(msg);
    shared.watcher_txs.retain(|tx| tx.send(line.clone()).is_ok());
}

async fn handle_client(stream: UnixStream, shared: Arc<Mutex<Shared>>, rearm: Arc<Notify>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Channel for sending messages back to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task
    let write_handle = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut is_watcher = false;

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(msg) = ipc::decode_client(&line) else {
            continue;
        };

        let mut shared = shared.lock().await;

        match msg {
            ClientMsg::StartDrag { seat } => {
                match shared.engine.start_drag(seat) {
                    Some(effects) => {
                        process_effects(&mut shared, effects);
                        let ack = DaemonMsg::Ack {
                            ok: true,
                            message: format!("dragging seat {}", seat),
                        };
                        let _ = tx.send(ipc::encode(&ack));
                    }
                    None => {
                        let ack = DaemonMsg::Ack {
                            ok: false,
                            message: format!("no draggable item at seat {}", seat),
                        };
                        let _ = tx.send(ipc::encode(&ack));
                    }
                }
            }
            ClientMsg::StartExternalDrag {
                item,
                batch,
                registration,
            } => {
                let id = item.id;
                match shared.engine.start_external_drag(item, batch, registration) {
                    Some(effects) => {
                        process_effects(&mut shared, effects);
                        let ack = DaemonMsg::Ack {
                            ok: true,
                            message: format!("dragging external item {}", id),
                        };
                        let _ = tx.send(ipc::encode(&ack));
                    }
                    None => {
                        let ack = DaemonMsg::Ack {
                            ok: false,
                            message: "a drag gesture is already active".into(),
                        };
                        let _ = tx.send(ipc::encode(&ack));
                    }
                }
            }
            ClientMsg::DragEnter => {
                let effects = shared.engine.on_drag_enter();
                process_effects(&mut shared, effects);
            }
            ClientMsg::DragOver { x, y } => {
                let effects = shared.engine.on_drag_over(x, y, Instant::now());
                process_effects(&mut shared, effects);
                rearm.notify_one();
            }
            ClientMsg::DragExit => {
                let effects = shared.engine.on_drag_exit();
                process_effects(&mut shared, effects);
            }
            ClientMsg::AcceptDrop { x, y } => {
                let accept = shared.engine.accept_drop(x, y);
                let _ = tx.send(ipc::encode(&DaemonMsg::Accept { accept }));
            }
            ClientMsg::Drop { x, y } => {
                let accept = shared.engine.accept_drop(x, y);
                let handled = if accept {
                    let (handled, effects) = shared.engine.on_drop(x, y);
                    process_effects(&mut shared, effects);
                    handled
                } else {
                    false
                };
                let cancelled = shared.engine.drop_cancelled() || !handled;
                let _ = tx.send(ipc::encode(&DaemonMsg::DropResult { handled, cancelled }));
            }
            ClientMsg::DragEnd {
                success,
                info_target,
            } => {
                let effects = shared.engine.on_drag_end(success, info_target);
                process_effects(&mut shared, effects);
                let ack = DaemonMsg::Ack {
                    ok: true,
                    message: "gesture ended".into(),
                };
                let _ = tx.send(ipc::encode(&ack));
            }
            ClientMsg::DeferUninstall => {
                shared.engine.defer_uninstall();
                let ack = DaemonMsg::Ack {
                    ok: true,
                    message: "drop completion deferred".into(),
                };
                let _ = tx.send(ipc::encode(&ack));
            }
            ClientMsg::UninstallResult { success } => {
                info!(success, "uninstall confirmation returned");
                let effects = shared.engine.uninstall_returned(success);
                process_effects(&mut shared, effects);
                let ack = DaemonMsg::Ack {
                    ok: true,
                    message: "uninstall result applied".into(),
                };
                let _ = tx.send(ipc::encode(&ack));
            }
            ClientMsg::GetLayout => {
                let seats = shared.engine.layout();
                let _ = tx.send(ipc::encode(&DaemonMsg::Layout { seats }));
            }
            ClientMsg::GetStatus => {
                let status = DaemonMsg::Status {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    capacity: shared.engine.capacity(),
                    dragging: shared.engine.dragging(),
                };
                let _ = tx.send(ipc::encode(&status));
            }
            ClientMsg::Watch => {
                is_watcher = true;
                shared.watcher_txs.push(tx.clone());
                let ack = DaemonMsg::Ack {
                    ok: true,
                    message: "watching".into(),
                };
                let _ = tx.send(ipc::encode(&ack));
            }
        }
    }

    // Client disconnected — remove watcher sender if registered
    if is_watcher {
        let mut shared = shared.lock().await;
        shared.watcher_txs.retain(|t| !t.is_closed());
    }

    write_handle.abort();
}
