use perchd_core::item::Item;

/// How a hover over a seat should resolve once debounce settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderIntent {
    /// Nothing folder-related; plain reorder/placement rules apply.
    None,
    /// Hovering a shortcut with a shortcut: a new folder would be created.
    Create,
    /// Hovering a folder that accepts the payload: it would be merged in.
    Merge,
}

/// Classify the folder intent for one hover tick. Stateless: identical inputs
/// always produce the same classification; the session applies debounce.
///
/// Rules, first match wins:
/// 1. payload center too far from the seat center
/// 2. empty seat, hidden occupant, or hovering the payload's own seat
/// 3. shortcut over shortcut creates a folder
/// 4. shortcut over an accepting folder merges
pub fn classify(
    candidate: &Item,
    occupant: Option<&Item>,
    distance: f32,
    max_folder_dist: f32,
) -> FolderIntent {
    if distance > max_folder_dist {
        return FolderIntent::None;
    }
    let Some(occupant) = occupant else {
        return FolderIntent::None;
    };
    if !occupant.visible || occupant.id == candidate.id {
        return FolderIntent::None;
    }
    if occupant.is_shortcut() && candidate.is_shortcut() {
        return FolderIntent::Create;
    }
    if occupant.accepts(candidate) {
        return FolderIntent::Merge;
    }
    FolderIntent::None
}
