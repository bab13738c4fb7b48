use serde::{Deserialize, Serialize};

/// A 64-bit tree identifier. Always a random positive (63-bit) integer,
/// never client-chosen, so trees can be created concurrently without
/// coordination (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeId(pub i64);

impl TreeId {
    pub fn get(self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeType {
    Log,
    PreorderedLog,
}

impl TreeType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Log => "LOG",
            Self::PreorderedLog => "PREORDERED_LOG",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "LOG" => Some(Self::Log),
            "PREORDERED_LOG" => Some(Self::PreorderedLog),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeState {
    Active,
    Frozen,
    Draining,
}

impl TreeState {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Frozen => "FROZEN",
            Self::Draining => "DRAINING",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "FROZEN" => Some(Self::Frozen),
            "DRAINING" => Some(Self::Draining),
            _ => None,
        }
    }
}

/// Storage options, encoded with an explicit "present" tag rather than a
/// structural serialization whose all-default value is indistinguishable
/// from "never written" (spec §9 design note). `Tree::storage_options` is
/// `Option<StorageOptions>`: `None` means the column is `NULL` (never
/// written); `Some(default())` means an explicit, if default, value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Whether subtree tiles are written with a real, strictly-increasing
    /// revision (enabling historical/time-travel reads) or overwritten in
    /// place at the sentinel revision 0.
    pub subtree_revisions_enabled: bool,
    /// How many historic subtree tile revisions to retain once
    /// `subtree_revisions_enabled` is set, before
    /// `prune_old_subtree_revisions` may reclaim the rest. `None` means
    /// retain all revisions (spec's Non-goals defer, rather than forbid,
    /// archival/compaction policy).
    pub subtree_retention: Option<u32>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            subtree_revisions_enabled: false,
            subtree_retention: None,
        }
    }
}

/// Operationally-mutable control flags, split out from the slow-changing
/// `Tree` record the way Trillian splits `Trees` from `TreeControl`: these
/// toggle independently of the tree's identity/type/display metadata and
/// are cascaded explicitly on `HardDeleteTree` rather than relying on a
/// foreign-key cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeControl {
    pub signing_enabled: bool,
    pub sequencing_enabled: bool,
}

impl Default for TreeControl {
    fn default() -> Self {
        Self {
            signing_enabled: true,
            sequencing_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub tree_id: TreeId,
    pub tree_type: TreeType,
    pub tree_state: TreeState,
    pub display_name: String,
    pub description: String,
    /// Milliseconds since epoch, truncated at creation (spec §4.1).
    pub create_time_millis: i64,
    pub update_time_millis: i64,
    /// How stale a tree head may become before a fresh one must be
    /// produced even without new leaves.
    pub max_root_duration_millis: i64,
    pub storage_options: Option<StorageOptions>,
    pub deleted: bool,
    pub deleted_at_millis: Option<i64>,
    pub tree_control: TreeControl,
}

impl Tree {
    /// Effective storage options, defaulted when the column was never
    /// written.
    pub fn storage_options_or_default(&self) -> StorageOptions {
        self.storage_options.unwrap_or_default()
    }
}

/// Fields a caller may request when creating a tree; the engine fills in
/// `tree_id`, timestamps, and `deleted*`.
#[derive(Debug, Clone)]
pub struct NewTree {
    pub tree_type: TreeType,
    pub display_name: String,
    pub description: String,
    pub max_root_duration_millis: i64,
    pub storage_options: Option<StorageOptions>,
}

/// A validated proposed transition applied by `UpdateTree`. Immutable
/// fields (`tree_id`, `tree_type`, hash strategy — the latter not
/// separately modeled since RFC 6962 SHA-256 is the only strategy this
/// engine supports) are simply absent from this struct.
#[derive(Debug, Clone, Default)]
pub struct TreeUpdate {
    pub tree_state: Option<TreeState>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub max_root_duration_millis: Option<i64>,
    pub storage_options: Option<StorageOptions>,
}
