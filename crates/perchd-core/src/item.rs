use serde::{Deserialize, Serialize};

pub type ItemId = u64;

/// Maximum number of members a folder can hold.
pub const FOLDER_CAPACITY: usize = 12;

/// What kind of item occupies a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Shortcut,
    Folder,
}

/// Where an item lives, for persistence and for telling external drags apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// The seat strip itself.
    Strip,
    /// The outer workspace grid (an external drag source).
    Workspace,
    /// Inside the folder with the given id.
    Folder(ItemId),
}

/// One placeable item: an application shortcut or a folder of shortcuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub kind: ItemKind,
    pub container: Container,
    /// Seat index in the strip; `None` until placed.
    pub slot: Option<usize>,
    pub visible: bool,
    /// Folder members in display order. Always empty for shortcuts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Item>,
}

impl Item {
    pub fn shortcut(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            kind: ItemKind::Shortcut,
            container: Container::Strip,
            slot: None,
            visible: true,
            members: Vec::new(),
        }
    }

    pub fn folder(id: ItemId, title: impl Into<String>, members: Vec<Item>) -> Self {
        let mut members = members;
        for m in &mut members {
            m.container = Container::Folder(id);
            m.slot = None;
        }
        Self {
            id,
            title: title.into(),
            kind: ItemKind::Folder,
            container: Container::Strip,
            slot: None,
            visible: true,
            members,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    pub fn is_shortcut(&self) -> bool {
        self.kind == ItemKind::Shortcut
    }

    /// Folder acceptance check: only shortcuts, and only while there is room.
    pub fn accepts(&self, candidate: &Item) -> bool {
        self.is_folder() && candidate.is_shortcut() && self.members.len() < FOLDER_CAPACITY
    }

    /// Absorb a shortcut into this folder. Returns false if the acceptance
    /// check fails; the member list is untouched in that case.
    pub fn absorb(&mut self, mut candidate: Item) -> bool {
        if !self.accepts(&candidate) {
            return false;
        }
        candidate.container = Container::Folder(self.id);
        candidate.slot = None;
        self.members.push(candidate);
        true
    }
}
