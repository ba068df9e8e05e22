use crate::alarm::Alarm;
use crate::geometry::StripGeometry;
use crate::intent::{self, FolderIntent};
use crate::outcome::{Completion, DropTracker};
use crate::strip::{CommitError, Strip};
use perchd_core::config::Config;
use perchd_core::ipc::SeatInfo;
use perchd_core::item::{Container, Item, ItemId};
use std::time::{Duration, Instant};
use tracing::debug;

/// Drag session mode. Folder intent always wins over plain reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    None,
    PendingCreate,
    PendingMerge,
}

/// What is being dragged, and where it came from.
#[derive(Debug, Clone)]
pub struct DragPayload {
    pub item: Item,
    /// Additional items carried by a batch gesture, in drag order.
    pub batch: Vec<Item>,
    pub source: Container,
    /// Pointer-to-bitmap anchor; the payload's visual center is the pointer
    /// minus this offset.
    pub registration: (f32, f32),
}

/// Side effects the engine asks its caller to carry out. The engine mutates
/// the strip itself; everything that leaves the engine (persistence, frontend
/// feedback) goes through these.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Record the item's (container, seat) in the layout store.
    Persist {
        id: ItemId,
        container: Container,
        seat: Option<usize>,
    },
    /// Show or clear the folder-creation ring preview at a seat.
    FolderPreview { seat: usize, active: bool },
    /// The payload entered or left an existing folder's accept range.
    FolderHover { seat: usize, active: bool },
    /// The origin view of the dragged item should be shown or hidden.
    OriginVisibility { visible: bool },
    /// The seat arrangement changed; watchers need a fresh layout.
    LayoutChanged,
}

/// All mutable state of one gesture. Created at drag start, dropped at drag
/// end; nothing drag-related outlives it.
#[derive(Debug)]
struct DragSession {
    payload: DragPayload,
    mode: DragMode,
    /// Last seat hovered over a visible occupant; hysteresis anchor.
    hover_seat: Option<usize>,
    /// Latched folder-creation target.
    target_seat: Option<usize>,
    /// Seat the armed folder alarm will preview when it fires.
    pending_create_seat: Option<usize>,
    /// Seat currently showing the folder ring preview.
    preview_seat: Option<usize>,
    /// Seat of the folder currently showing hover feedback.
    hover_folder_seat: Option<usize>,
    create_on_drop: bool,
    merge_on_drop: bool,
    /// Whether the previous hover tick was inside the swap radius.
    last_in_swap_range: bool,
    /// True until an external payload has reserved its placeholder seat.
    from_external: bool,
    last_pointer: (f32, f32),
    folder_alarm: Alarm,
    reorder_alarm: Alarm,
}

impl DragSession {
    fn new(payload: DragPayload, from_external: bool) -> Self {
        Self {
            payload,
            mode: DragMode::None,
            hover_seat: None,
            target_seat: None,
            pending_create_seat: None,
            preview_seat: None,
            hover_folder_seat: None,
            create_on_drop: false,
            merge_on_drop: false,
            last_in_swap_range: false,
            from_external,
            last_pointer: (0.0, 0.0),
            folder_alarm: Alarm::new(),
            reorder_alarm: Alarm::new(),
        }
    }

    fn set_mode(&mut self, mode: DragMode, effects: &mut Vec<Effect>) {
        if mode == self.mode {
            return;
        }
        match mode {
            DragMode::None => {
                self.cleanup_merge(effects);
                self.cleanup_create(effects);
            }
            DragMode::PendingMerge => self.cleanup_create(effects),
            DragMode::PendingCreate => self.cleanup_merge(effects),
        }
        self.mode = mode;
    }

    fn cleanup_create(&mut self, effects: &mut Vec<Effect>) {
        if let Some(seat) = self.preview_seat.take() {
            effects.push(Effect::FolderPreview { seat, active: false });
        }
        self.folder_alarm.cancel();
        self.pending_create_seat = None;
    }

    fn cleanup_merge(&mut self, effects: &mut Vec<Effect>) {
        if let Some(seat) = self.hover_folder_seat.take() {
            effects.push(Effect::FolderHover { seat, active: false });
        }
    }

    /// Record the hovered seat. A change resets the mode and both debounce
    /// alarms so no pending decision survives the move.
    fn set_hover_seat(&mut self, seat: Option<usize>, effects: &mut Vec<Effect>) {
        if seat == self.hover_seat {
            return;
        }
        self.hover_seat = seat;
        self.set_mode(DragMode::None, effects);
        self.folder_alarm.cancel();
        self.pending_create_seat = None;
        self.reorder_alarm.cancel();
        self.last_in_swap_range = false;
    }
}

fn have_enough_space(strip: &Strip, session: &DragSession) -> bool {
    session.payload.batch.len() + 1 <= strip.capacity().saturating_sub(strip.visible_count())
}

fn manage_folder_feedback(
    session: &mut DragSession,
    folder_intent: FolderIntent,
    seat: usize,
    folder_delay: Duration,
    now: Instant,
    effects: &mut Vec<Effect>,
) {
    let create_pending = folder_intent == FolderIntent::Create;
    if session.mode == DragMode::None && create_pending && !session.folder_alarm.pending() {
        session.pending_create_seat = Some(seat);
        session.folder_alarm.arm(now, folder_delay);
        debug!(seat, "folder creation alarm armed");
        return;
    }

    let merge_pending = folder_intent == FolderIntent::Merge;
    if merge_pending && session.mode == DragMode::None {
        session.hover_folder_seat = Some(seat);
        effects.push(Effect::FolderHover { seat, active: true });
        session.set_mode(DragMode::PendingMerge, effects);
        debug!(seat, "merge pending over folder");
        return;
    }

    if session.mode == DragMode::PendingMerge && !merge_pending {
        session.set_mode(DragMode::None, effects);
    }
    if session.mode == DragMode::PendingCreate && !create_pending {
        session.set_mode(DragMode::None, effects);
    }
}

/// The drag-and-drop engine: owns the strip, the current drag session, and
/// the drop outcome bookkeeping. Every pointer/drop event and every alarm
/// firing goes through here, on the daemon's single event loop.
pub struct DragEngine {
    cfg: Config,
    geom: StripGeometry,
    strip: Strip,
    session: Option<DragSession>,
    outcome: DropTracker,
    next_id: ItemId,
}

impl DragEngine {
    pub fn new(cfg: Config, strip: Strip) -> Self {
        let next_id = strip
            .occupants()
            .flat_map(|(_, item)| item.members.iter().map(|m| m.id).chain([item.id]))
            .max()
            .unwrap_or(0)
            + 1;
        let geom = StripGeometry::new(&cfg.strip);
        Self {
            cfg,
            geom,
            strip,
            session: None,
            outcome: DropTracker::default(),
            next_id,
        }
    }

    pub fn dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.strip.capacity()
    }

    /// Begin a gesture from a strip seat; the origin seat goes hidden for the
    /// duration of the drag. None when the seat has no visible item or a
    /// gesture is already active.
    pub fn start_drag(&mut self, seat: usize) -> Option<Vec<Effect>> {
        if self.session.is_some() {
            return None;
        }
        let item = self.strip.get(seat).filter(|i| i.visible)?.clone();
        self.strip.set_visible(seat, false);
        self.outcome.reset();
        self.session = Some(DragSession::new(
            DragPayload {
                item,
                batch: Vec::new(),
                source: Container::Strip,
                registration: (0.0, 0.0),
            },
            false,
        ));
        debug!(seat, "drag started from strip");
        Some(vec![Effect::LayoutChanged])
    }

    /// Begin a gesture carrying an external item (plus optional batch).
    pub fn start_external_drag(
        &mut self,
        item: Item,
        batch: Vec<Item>,
        registration: (f32, f32),
    ) -> Option<Vec<Effect>> {
        if self.session.is_some() {
            return None;
        }
        self.outcome.reset();
        let source = item.container;
        debug!(id = item.id, batch = batch.len(), "external drag started");
        self.session = Some(DragSession::new(
            DragPayload {
                item,
                batch,
                source,
                registration,
            },
            true,
        ));
        Some(Vec::new())
    }

    pub fn on_drag_enter(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.outcome.clear_new_folder();
        debug!(occupied = self.strip.occupied_count(), "drag entered strip");
        let Some(session) = self.session.as_mut() else {
            return effects;
        };
        session.create_on_drop = false;
        session.merge_on_drop = false;
        session.set_mode(DragMode::None, &mut effects);
        session.cleanup_create(&mut effects);
        session.cleanup_merge(&mut effects);
        session.hover_seat = None;
        session.last_in_swap_range = false;
        effects
    }

    pub fn on_drag_over(&mut self, x: f32, y: f32, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.session.is_none() {
            return effects;
        }
        let capacity = self.strip.capacity();
        let center = {
            let session = self.session.as_ref().unwrap();
            let reg = session.payload.registration;
            (x - reg.0, y - reg.1)
        };
        let seat = self.geom.seat_for_pointer(center.0, center.1, capacity);
        let distance = StripGeometry::distance(center, self.geom.visual_center(seat));
        let occupant_visible = self.strip.get(seat).is_some_and(|i| i.visible);
        let swap_radius = self.cfg.swap_radius();
        let folder_radius = self.cfg.folder_accept_radius();
        let folder_delay = Duration::from_millis(self.cfg.drag.folder_delay_ms);
        let reorder_delay = Duration::from_millis(self.cfg.drag.reorder_delay_ms);
        let folder_intent = {
            let session = self.session.as_ref().unwrap();
            intent::classify(
                &session.payload.item,
                self.strip.get(seat),
                distance,
                folder_radius,
            )
        };
        let have_space = have_enough_space(&self.strip, self.session.as_ref().unwrap());

        let session = self.session.as_mut().unwrap();
        session.last_pointer = center;

        if occupant_visible {
            session.target_seat = Some(seat);
            session.set_hover_seat(Some(seat), &mut effects);
            manage_folder_feedback(session, folder_intent, seat, folder_delay, now, &mut effects);

            let in_swap = distance < swap_radius;
            if session.mode == DragMode::None && have_space {
                if !in_swap && !session.from_external {
                    session.reorder_alarm.cancel();
                } else if !session.reorder_alarm.pending() && !session.last_in_swap_range {
                    session.reorder_alarm.arm(now, reorder_delay);
                    debug!(seat, "reorder alarm armed");
                }
            }
            session.last_in_swap_range = in_swap;
        } else {
            session.last_in_swap_range = false;
            if session.mode != DragMode::None && have_space {
                // leaving a folder target for open space: settle the layout now
                session.reorder_alarm.arm(now, Duration::ZERO);
                session.set_mode(DragMode::None, &mut effects);
            }
        }

        // folder intent always suppresses plain reordering
        if session.mode != DragMode::None {
            session.reorder_alarm.cancel();
        }
        effects
    }

    pub fn on_drag_exit(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(session) = self.session.as_mut() else {
            return effects;
        };
        match session.mode {
            DragMode::PendingCreate => session.create_on_drop = true,
            DragMode::PendingMerge => session.merge_on_drop = true,
            DragMode::None => {}
        }
        debug!(
            create = session.create_on_drop,
            merge = session.merge_on_drop,
            "drag left the strip"
        );
        session.set_hover_seat(None, &mut effects);
        session.reorder_alarm.cancel();
        effects
    }

    /// Pre-drop eligibility probe. A refusal marks the gesture cancelled.
    pub fn accept_drop(&mut self, x: f32, y: f32) -> bool {
        let capacity = self.strip.capacity();
        let folder_radius = self.cfg.folder_accept_radius();
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        let reg = session.payload.registration;
        let center = (x - reg.0, y - reg.1);
        let seat = self.geom.seat_for_pointer(center.0, center.1, capacity);

        if session.create_on_drop {
            let target = session.target_seat.unwrap_or(seat);
            let distance = StripGeometry::distance(center, self.geom.visual_center(target));
            if intent::classify(&session.payload.item, self.strip.get(target), distance, folder_radius)
                == FolderIntent::Create
            {
                return true;
            }
        }
        if session.merge_on_drop {
            let distance = StripGeometry::distance(center, self.geom.visual_center(seat));
            if intent::classify(&session.payload.item, self.strip.get(seat), distance, folder_radius)
                == FolderIntent::Merge
            {
                return true;
            }
        }
        if have_enough_space(&self.strip, session) {
            return true;
        }
        self.outcome.mark_cancelled();
        debug!("drop refused: strip is full");
        false
    }

    /// The payload was released over the strip. Returns whether the drop was
    /// handled; an unhandled drop is a cancellation.
    pub fn on_drop(&mut self, x: f32, y: f32) -> (bool, Vec<Effect>) {
        let mut effects = Vec::new();
        if self.session.is_none() {
            return (false, effects);
        }
        if self.session.as_ref().unwrap().hover_seat.is_some() {
            // the controller skipped the exit notification; latch as if it came
            effects.extend(self.on_drag_exit());
        }
        if self.session.as_mut().unwrap().reorder_alarm.take() {
            // settle a pending reorder before deciding placement
            self.perform_reorder(&mut effects);
        }

        let capacity = self.strip.capacity();
        let folder_radius = self.cfg.folder_accept_radius();
        let (create_latch, merge_latch, latched_target, payload, batch, center) = {
            let session = self.session.as_mut().unwrap();
            let reg = session.payload.registration;
            let out = (
                session.create_on_drop,
                session.merge_on_drop,
                session.target_seat,
                session.payload.item.clone(),
                session.payload.batch.clone(),
                (x - reg.0, y - reg.1),
            );
            session.create_on_drop = false;
            session.merge_on_drop = false;
            out
        };
        let seat = self.geom.seat_for_pointer(center.0, center.1, capacity);

        if create_latch {
            let target = latched_target.unwrap_or(seat);
            let distance = StripGeometry::distance(center, self.geom.visual_center(target));
            if intent::classify(&payload, self.strip.get(target), distance, folder_radius)
                == FolderIntent::Create
            {
                let folder_id = self.alloc_id();
                if let Some(folder_seat) =
                    self.strip
                        .commit_folder_creation(payload.clone(), target, folder_id, batch.clone())
                {
                    self.outcome.mark_new_folder();
                    effects.push(Effect::LayoutChanged);
                    effects.push(Effect::Persist {
                        id: folder_id,
                        container: Container::Strip,
                        seat: Some(folder_seat),
                    });
                    if let Some(folder) = self.strip.get(folder_seat) {
                        for member in &folder.members {
                            effects.push(Effect::Persist {
                                id: member.id,
                                container: Container::Folder(folder_id),
                                seat: None,
                            });
                        }
                    }
                    debug!(seat = folder_seat, folder = folder_id, "folder created on drop");
                    return (true, effects);
                }
            }
        }

        if merge_latch {
            let distance = StripGeometry::distance(center, self.geom.visual_center(seat));
            if intent::classify(&payload, self.strip.get(seat), distance, folder_radius)
                == FolderIntent::Merge
                && self.strip.commit_merge(payload.clone(), seat, batch.clone())
            {
                let folder_id = self.strip.get(seat).map(|f| f.id).unwrap_or_default();
                effects.push(Effect::LayoutChanged);
                effects.push(Effect::Persist {
                    id: payload.id,
                    container: Container::Folder(folder_id),
                    seat: None,
                });
                for member in &batch {
                    effects.push(Effect::Persist {
                        id: member.id,
                        container: Container::Folder(folder_id),
                        seat: None,
                    });
                }
                debug!(seat, folder = folder_id, "merged into folder on drop");
                return (true, effects);
            }
        }

        // plain placement
        self.outcome.mark_will_restore_origin();
        let placeholder = self
            .strip
            .find_seat(payload.id)
            .or_else(|| self.strip.hidden_seat());
        let placement = if self.strip.get(seat).is_none() {
            self.strip.commit_placement(payload.clone(), seat)
        } else if let Some(reserved) = placeholder {
            self.strip.set_visible(reserved, true);
            Ok(reserved)
        } else {
            self.strip.commit_placement(payload.clone(), seat)
        };
        match placement {
            Ok(dest) => {
                effects.push(Effect::LayoutChanged);
                effects.push(Effect::Persist {
                    id: payload.id,
                    container: Container::Strip,
                    seat: Some(dest),
                });
                if !batch.is_empty() {
                    match self.strip.commit_batch(dest, batch) {
                        Ok(seats) => {
                            for member_seat in seats {
                                if let Some(item) = self.strip.get(member_seat) {
                                    effects.push(Effect::Persist {
                                        id: item.id,
                                        container: Container::Strip,
                                        seat: Some(member_seat),
                                    });
                                }
                            }
                        }
                        Err(CommitError::CapacityExceeded) => {
                            self.outcome.mark_cancelled();
                            debug!("batch placement exceeded capacity");
                        }
                    }
                }
                debug!(seat = dest, "plain placement on drop");
                (true, effects)
            }
            Err(CommitError::CapacityExceeded) => {
                self.outcome.mark_cancelled();
                debug!("drop rejected: no seat available");
                (false, effects)
            }
        }
    }

    /// End of the whole gesture. May defer behind an uninstall confirmation.
    pub fn on_drag_end(&mut self, success: bool, info_target: bool) -> Vec<Effect> {
        if self.session.is_none() {
            return Vec::new();
        }
        match self.outcome.complete(success, info_target) {
            None => {
                debug!("drop completion deferred until uninstall confirmation");
                Vec::new()
            }
            Some(completion) => self.finish_gesture(completion),
        }
    }

    pub fn defer_uninstall(&mut self) {
        self.outcome.defer_uninstall();
    }

    /// The uninstall confirmation resolved; replay the deferred completion if
    /// one is waiting. Safe to call more than once.
    pub fn uninstall_returned(&mut self, success: bool) -> Vec<Effect> {
        match self.outcome.uninstall_returned(success) {
            Some(completion) => self.finish_gesture(completion),
            None => Vec::new(),
        }
    }

    fn finish_gesture(&mut self, completion: Completion) -> Vec<Effect> {
        let mut effects = Vec::new();
        let restore = self.outcome.origin_should_be_visible(completion);
        if restore {
            if let Some(session) = self.session.as_ref() {
                if session.payload.source == Container::Strip {
                    if let Some(seat) = self.strip.find_seat(session.payload.item.id) {
                        self.strip.set_visible(seat, true);
                    }
                }
            }
        }
        effects.push(Effect::OriginVisibility { visible: restore });

        // idempotent sync pass: clear stale placeholders, re-persist the rest
        self.strip.sweep_hidden();
        for (seat, item) in self.strip.visible_items() {
            effects.push(Effect::Persist {
                id: item.id,
                container: Container::Strip,
                seat: Some(seat),
            });
        }
        effects.push(Effect::LayoutChanged);
        self.session = None;
        debug!(
            restore,
            new_folder = self.outcome.new_folder_created(),
            "gesture finished"
        );
        self.outcome.reset();
        effects
    }

    /// Whether the last drop ended in a cancellation (capacity refusal or a
    /// batch that could not fit).
    pub fn drop_cancelled(&self) -> bool {
        self.outcome.cancelled()
    }

    /// Earliest pending debounce deadline, for the event loop's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        let session = self.session.as_ref()?;
        match (
            session.folder_alarm.deadline(),
            session.reorder_alarm.deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire any due alarms. Stale fires re-validate and no-op.
    pub fn check_alarms(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        let reorder_due;
        {
            let Some(session) = self.session.as_mut() else {
                return effects;
            };
            if session.folder_alarm.fire_if_due(now) {
                if session.mode == DragMode::None {
                    if let Some(seat) = session.pending_create_seat.take() {
                        session.set_mode(DragMode::PendingCreate, &mut effects);
                        session.preview_seat = Some(seat);
                        effects.push(Effect::FolderPreview { seat, active: true });
                        debug!(seat, "folder creation pending");
                    }
                }
                session.reorder_alarm.cancel();
            }
            reorder_due = session.reorder_alarm.fire_if_due(now);
        }
        if reorder_due {
            self.perform_reorder(&mut effects);
        }
        effects
    }

    /// Apply a due reorder: reserve a placeholder for an external payload, or
    /// move the tracked placeholder to the hovered seat. No-ops when the
    /// layout already matches.
    fn perform_reorder(&mut self, effects: &mut Vec<Effect>) {
        let capacity = self.strip.capacity();
        let (pointer, from_external, payload) = {
            let Some(session) = self.session.as_ref() else {
                return;
            };
            (
                session.last_pointer,
                session.from_external,
                session.payload.item.clone(),
            )
        };
        let seat = self.geom.seat_for_pointer(pointer.0, pointer.1, capacity);

        if from_external && self.strip.hidden_seat().is_none() {
            if self.strip.first_empty().is_some() && self.strip.reserve_placeholder(payload, seat) {
                if let Some(session) = self.session.as_mut() {
                    session.from_external = false;
                }
                effects.push(Effect::LayoutChanged);
                debug!(seat, "placeholder reserved for external drag");
            }
        } else if let Some(current) = self.strip.find_seat(payload.id) {
            if current != seat {
                self.strip.relocate(current, seat);
                effects.push(Effect::LayoutChanged);
                debug!(from = current, to = seat, "seat reordered");
            }
        }
    }

    pub fn layout(&self) -> Vec<SeatInfo> {
        self.strip
            .occupants()
            .map(|(seat, item)| SeatInfo {
                seat,
                id: item.id,
                title: item.title.clone(),
                kind: item.kind,
                visible: item.visible,
                member_count: item.members.len(),
            })
            .collect()
    }

    /// Visible top-level items, for whole-layout persistence.
    pub fn snapshot(&self) -> Vec<Item> {
        self.strip
            .visible_items()
            .map(|(_, item)| item.clone())
            .collect()
    }

    fn alloc_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
