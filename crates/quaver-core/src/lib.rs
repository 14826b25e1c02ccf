//! Quaver Core - Playback queue engine
//!
//! This crate provides ordered playlists with explicit positions, a
//! playback queue manager that keeps normal and shuffled views of the
//! context queue in sync next to a user queue, offline-aware navigation,
//! and the persistence contract the manager commits through.

pub mod command;
pub mod item;
pub mod navigation;
pub mod playlist;
pub mod queue;
pub mod store;

pub use command::{ Command, CommandError };
pub use item::{ Playable, PlayableId };
pub use navigation::CachedNavigationIndex;
pub use playlist::{ Entry, EntryId, OrderedPlaylist, QueueKind };
pub use queue::{ CommitErrorReporter, LogReporter, PlaybackQueueManager, RepeatMode };
pub use store::{ JsonStore, MemoryStore, PlayerState, QueueStore, StoreError, StoreSnapshot };
