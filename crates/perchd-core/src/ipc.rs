use crate::item::{Item, ItemId, ItemKind};
use serde::{Deserialize, Serialize};

/// Messages from frontends/clients to the daemon (JSON-lines over Unix socket).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Begin a gesture from a strip seat; hides the origin seat.
    #[serde(rename = "start_drag")]
    StartDrag { seat: usize },
    /// Begin a gesture carrying an item (plus optional batch) from outside
    /// the strip.
    #[serde(rename = "start_external_drag")]
    StartExternalDrag {
        item: Item,
        #[serde(default)]
        batch: Vec<Item>,
        /// Pointer-to-bitmap anchor of the drag view.
        #[serde(default)]
        registration: (f32, f32),
    },
    /// Pointer entered the strip region.
    #[serde(rename = "drag_enter")]
    DragEnter,
    /// Pointer moved while over the strip (strip-local coordinates).
    #[serde(rename = "drag_over")]
    DragOver { x: f32, y: f32 },
    /// Pointer left the strip region.
    #[serde(rename = "drag_exit")]
    DragExit,
    /// Pre-drop eligibility probe.
    #[serde(rename = "accept_drop")]
    AcceptDrop { x: f32, y: f32 },
    /// The payload was released over the strip.
    #[serde(rename = "drop")]
    Drop { x: f32, y: f32 },
    /// End of the whole gesture (success as reported by the drag controller).
    /// `info_target` marks a drop on an info/detail surface, which never
    /// hides the original view.
    #[serde(rename = "drag_end")]
    DragEnd {
        success: bool,
        #[serde(default)]
        info_target: bool,
    },
    /// An uninstall confirmation dialog is pending; defer drop completion.
    #[serde(rename = "defer_uninstall")]
    DeferUninstall,
    /// The pending uninstall confirmation resolved.
    #[serde(rename = "uninstall_result")]
    UninstallResult { success: bool },
    /// Request the current seat layout.
    #[serde(rename = "get_layout")]
    GetLayout,
    /// Request daemon status.
    #[serde(rename = "get_status")]
    GetStatus,
    /// Register this connection for pushed layout/feedback messages.
    #[serde(rename = "watch")]
    Watch,
}

/// Messages from the daemon to clients and registered watchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonMsg {
    /// Acknowledgement for commands.
    #[serde(rename = "ack")]
    Ack { ok: bool, message: String },
    /// Status response.
    #[serde(rename = "status")]
    Status {
        version: String,
        capacity: usize,
        dragging: bool,
    },
    /// Current seat layout, one entry per occupied seat.
    #[serde(rename = "layout")]
    Layout { seats: Vec<SeatInfo> },
    /// Outcome of a drop.
    #[serde(rename = "drop_result")]
    DropResult { handled: bool, cancelled: bool },
    /// Answer to an accept_drop probe.
    #[serde(rename = "accept")]
    Accept { accept: bool },
    /// Show or clear the folder-creation ring preview at a seat.
    #[serde(rename = "folder_preview")]
    FolderPreview { seat: usize, active: bool },
    /// The payload entered or left an existing folder's accept range.
    #[serde(rename = "folder_hover")]
    FolderHover { seat: usize, active: bool },
    /// The origin view of the dragged item should be shown or hidden.
    #[serde(rename = "origin_visibility")]
    OriginVisibility { visible: bool },
}

/// One occupied seat in a layout response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub seat: usize,
    pub id: ItemId,
    pub title: String,
    pub kind: ItemKind,
    pub visible: bool,
    pub member_count: usize,
}

/// Serialize a message as a JSON line (with trailing newline).
pub fn encode(msg: &impl Serialize) -> String {
    let mut s = serde_json::to_string(msg).expect("serialize IPC message");
    s.push('\n');
    s
}

/// Deserialize a JSON line. Returns None on empty/whitespace input.
pub fn decode_daemon(line: &str) -> Option<DaemonMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

pub fn decode_client(line: &str) -> Option<ClientMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
