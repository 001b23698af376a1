//! Hierarchical menu view logic: row identity, ordering, bulk actions and
//! the notifications they produce.

pub mod bulk;
pub mod detach;
pub mod kind;
pub mod notify;
pub mod registry;
pub mod reorder;
pub mod tree;

pub use bulk::{BatchObserver, BatchOutcome, BatchReport, BulkActionDispatcher, MenuMutations, NoopObserver};
pub use detach::{DetachHandler, DetachOutcome, Detacher, TargetIds};
pub use kind::EntityKind;
pub use notify::{MenuAction, Notification, NotificationVariant, Notifier, RecordingNotifier, TracingNotifier};
pub use registry::{IdentityRegistry, RegistryEntry, RowKey};
pub use reorder::{reorder_ids, DragState, DropOutcome, ReorderEngine, Reorderable};
pub use tree::{build_menu_tree, flatten_tree, scope_ordering, Expansion, FlatRow, MenuNode, MenuSnapshot};
