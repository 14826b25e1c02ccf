//! Queue persistence
//!
//! The engine talks to storage through `QueueStore`. Operations are staged
//! and only become visible when `commit` succeeds. A failed commit keeps the
//! staged batch, so the next commit persists it ahead of anything newer. Two stores are provided: `MemoryStore` for
//! embedding and tests, and `JsonStore`, which keeps a snapshot file on disk.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::item::Playable;
use crate::playlist::{ EntryId, QueueKind };
use crate::queue::RepeatMode;


/// Errors that can occur while loading or committing queue data.
#[derive( Debug, Error )]
pub enum StoreError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Invalid store data: {0}" )]
    Json( #[from] serde_json::Error ),

    #[error( "Commit rejected: {0}" )]
    Rejected( String ),
}


/// A persisted playlist entry.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
pub struct StoredEntry {
    pub id: EntryId,
    pub playable: Playable,
    pub position: usize,
}


/// Scalar player state persisted next to the queues.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( default )]
pub struct PlayerState {
    pub is_shuffle: bool,
    pub repeat_mode: RepeatMode,
    pub is_user_queue_playing: bool,
    pub current_index: i64,
}


/// Everything a store holds for one playback session.
#[derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct StoreSnapshot {
    pub state: PlayerState,
    pub normal: Vec<StoredEntry>,
    pub shuffled: Vec<StoredEntry>,
    pub user: Vec<StoredEntry>,
}


impl StoreSnapshot {
    pub fn entries( &self, kind: QueueKind ) -> &[StoredEntry] {
        match kind {
            QueueKind::Normal => &self.normal,
            QueueKind::Shuffled => &self.shuffled,
            QueueKind::User => &self.user,
        }
    }


    fn entries_mut( &mut self, kind: QueueKind ) -> &mut Vec<StoredEntry> {
        match kind {
            QueueKind::Normal => &mut self.normal,
            QueueKind::Shuffled => &mut self.shuffled,
            QueueKind::User => &mut self.user,
        }
    }


    fn apply( &mut self, op: StagedOp ) {
        match op {
            StagedOp::Create( kind, entry ) => {
                let entries = self.entries_mut( kind );
                entries.retain( |e| e.id != entry.id );
                entries.push( entry );
            }
            StagedOp::Reposition( kind, id, position ) => {
                if let Some( entry ) = self.entries_mut( kind ).iter_mut().find( |e| e.id == id ) {
                    entry.position = position;
                }
            }
            StagedOp::Delete( kind, id ) => {
                self.entries_mut( kind ).retain( |e| e.id != id );
            }
            StagedOp::State( state ) => self.state = state,
        }
    }
}


/// Storage backend for queue contents and player state.
pub trait QueueStore {
    /// Returns the last committed snapshot.
    fn load( &mut self ) -> Result<StoreSnapshot, StoreError>;

    fn create_entry( &mut self, kind: QueueKind, entry: StoredEntry );

    fn update_position( &mut self, kind: QueueKind, id: EntryId, position: usize );

    fn delete_entry( &mut self, kind: QueueKind, id: EntryId );

    fn save_state( &mut self, state: PlayerState );

    /// Makes every staged operation visible at once, or none of them.
    ///
    /// On failure the staged operations stay pending for the next commit.
    fn commit( &mut self ) -> Result<(), StoreError>;
}


/// A staged store operation.
#[derive( Debug, Clone )]
enum StagedOp {
    Create( QueueKind, StoredEntry ),
    Reposition( QueueKind, EntryId, usize ),
    Delete( QueueKind, EntryId ),
    State( PlayerState ),
}


/// In-memory store.
#[derive( Debug, Default )]
pub struct MemoryStore {
    committed: StoreSnapshot,
    staged: Vec<StagedOp>,
    fail_commits: bool,
    commits: usize,
}


impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }


    /// Creates a store that already holds `snapshot`.
    pub fn with_snapshot( snapshot: StoreSnapshot ) -> Self {
        Self {
            committed: snapshot,
            ..Self::default()
        }
    }


    /// Makes every following commit fail, leaving its batch staged.
    pub fn set_fail_commits( &mut self, fail: bool ) {
        self.fail_commits = fail;
    }


    pub fn snapshot( &self ) -> &StoreSnapshot {
        &self.committed
    }


    /// Number of successful commits.
    pub fn commit_count( &self ) -> usize {
        self.commits
    }
}


impl QueueStore for MemoryStore {
    fn load( &mut self ) -> Result<StoreSnapshot, StoreError> {
        Ok( self.committed.clone() )
    }


    fn create_entry( &mut self, kind: QueueKind, entry: StoredEntry ) {
        self.staged.push( StagedOp::Create( kind, entry ) );
    }


    fn update_position( &mut self, kind: QueueKind, id: EntryId, position: usize ) {
        self.staged.push( StagedOp::Reposition( kind, id, position ) );
    }


    fn delete_entry( &mut self, kind: QueueKind, id: EntryId ) {
        self.staged.push( StagedOp::Delete( kind, id ) );
    }


    fn save_state( &mut self, state: PlayerState ) {
        self.staged.push( StagedOp::State( state ) );
    }


    fn commit( &mut self ) -> Result<(), StoreError> {
        if self.fail_commits {
            return Err( StoreError::Rejected( format!( "{} staged operations pending", self.staged.len() ) ) );
        }

        for op in std::mem::take( &mut self.staged ) {
            self.committed.apply( op );
        }
        self.commits += 1;
        Ok(())
    }
}


/// Store that keeps a JSON snapshot file.
///
/// Commits write a temporary file next to the snapshot and rename it into
/// place, so readers never observe a half-written file.
#[derive( Debug )]
pub struct JsonStore {
    path: PathBuf,
    committed: StoreSnapshot,
    staged: Vec<StagedOp>,
}


impl JsonStore {
    /// Opens the snapshot at `path`. A missing file yields an empty store.
    pub fn open( path: impl Into<PathBuf> ) -> Result<Self, StoreError> {
        let path = path.into();
        let committed = if path.exists() {
            let contents = fs::read_to_string( &path )?;
            serde_json::from_str( &contents )?
        } else {
            tracing::debug!( "No queue snapshot at {:?}, starting empty", path );
            StoreSnapshot::default()
        };

        Ok( Self {
            path,
            committed,
            staged: Vec::new(),
        } )
    }


    pub fn path( &self ) -> &Path {
        &self.path
    }


    fn write_snapshot( &self, snapshot: &StoreSnapshot ) -> Result<(), StoreError> {
        if let Some( parent ) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all( parent )?;
            }
        }

        let json = serde_json::to_string_pretty( snapshot )?;
        let tmp = self.path.with_extension( "json.tmp" );
        fs::write( &tmp, json )?;
        fs::rename( &tmp, &self.path )?;
        Ok(())
    }
}


impl QueueStore for JsonStore {
    fn load( &mut self ) -> Result<StoreSnapshot, StoreError> {
        Ok( self.committed.clone() )
    }


    fn create_entry( &mut self, kind: QueueKind, entry: StoredEntry ) {
        self.staged.push( StagedOp::Create( kind, entry ) );
    }


    fn update_position( &mut self, kind: QueueKind, id: EntryId, position: usize ) {
        self.staged.push( StagedOp::Reposition( kind, id, position ) );
    }


    fn delete_entry( &mut self, kind: QueueKind, id: EntryId ) {
        self.staged.push( StagedOp::Delete( kind, id ) );
    }


    fn save_state( &mut self, state: PlayerState ) {
        self.staged.push( StagedOp::State( state ) );
    }


    fn commit( &mut self ) -> Result<(), StoreError> {
        if self.staged.is_empty() {
            return Ok(());
        }

        let mut next = self.committed.clone();
        for op in self.staged.iter().cloned() {
            next.apply( op );
        }

        self.write_snapshot( &next )?;
        self.committed = next;
        self.staged.clear();
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use tempfile::tempdir;


    fn entry( n: u64, position: usize ) -> StoredEntry {
        StoredEntry {
            id: EntryId( n ),
            playable: Playable::new( format!( "song-{}", n ), "x" ),
            position,
        }
    }


    #[test]
    fn test_memory_commit_applies_batch() {
        let mut store = MemoryStore::new();
        store.create_entry( QueueKind::Normal, entry( 0, 0 ) );
        store.create_entry( QueueKind::Normal, entry( 1, 1 ) );
        assert!( store.snapshot().normal.is_empty() );

        store.commit().unwrap();
        assert_eq!( store.snapshot().normal.len(), 2 );

        store.update_position( QueueKind::Normal, EntryId( 1 ), 0 );
        store.delete_entry( QueueKind::Normal, EntryId( 0 ) );
        store.commit().unwrap();
        assert_eq!( store.snapshot().entries( QueueKind::Normal ), &[ entry( 1, 0 ) ] );
        assert_eq!( store.commit_count(), 2 );
    }


    #[test]
    fn test_memory_failed_commit_keeps_batch_pending() {
        let mut store = MemoryStore::new();
        store.set_fail_commits( true );
        store.create_entry( QueueKind::User, entry( 0, 0 ) );

        assert!( matches!( store.commit(), Err( StoreError::Rejected( _ ) ) ) );
        assert!( store.snapshot().user.is_empty() );
        assert_eq!( store.commit_count(), 0 );

        store.set_fail_commits( false );
        store.create_entry( QueueKind::User, entry( 1, 1 ) );
        store.commit().unwrap();
        assert_eq!( store.snapshot().entries( QueueKind::User ), &[ entry( 0, 0 ), entry( 1, 1 ) ] );
    }


    #[test]
    fn test_json_failed_write_keeps_batch_pending() {
        let dir = tempdir().expect( "tempdir" );
        let blocker = dir.path().join( "blocker" );
        fs::write( &blocker, "file, not a directory" ).unwrap();

        // The parent of the snapshot is a plain file, so the write fails
        let mut store = JsonStore::open( blocker.join( "queue.json" ) ).unwrap();
        store.create_entry( QueueKind::Normal, entry( 0, 0 ) );
        assert!( matches!( store.commit(), Err( StoreError::Io( _ ) ) ) );
        assert!( store.load().unwrap().normal.is_empty() );

        fs::remove_file( &blocker ).unwrap();
        store.create_entry( QueueKind::Normal, entry( 1, 1 ) );
        store.commit().unwrap();

        let mut reopened = JsonStore::open( blocker.join( "queue.json" ) ).unwrap();
        assert_eq!( reopened.load().unwrap().normal, vec![ entry( 0, 0 ), entry( 1, 1 ) ] );
    }


    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().expect( "tempdir" );
        let path = dir.path().join( "nested" ).join( "queue.json" );

        let mut store = JsonStore::open( &path ).unwrap();
        store.create_entry( QueueKind::Shuffled, entry( 3, 0 ) );
        store.save_state( PlayerState {
            is_shuffle: true,
            repeat_mode: RepeatMode::All,
            is_user_queue_playing: false,
            current_index: 2,
        } );
        store.commit().unwrap();
        assert!( path.exists() );

        let mut reopened = JsonStore::open( &path ).unwrap();
        let snapshot = reopened.load().unwrap();
        assert_eq!( snapshot.shuffled, vec![ entry( 3, 0 ) ] );
        assert!( snapshot.state.is_shuffle );
        assert_eq!( snapshot.state.repeat_mode, RepeatMode::All );
        assert_eq!( snapshot.state.current_index, 2 );
    }


    #[test]
    fn test_json_missing_file_is_empty() {
        let dir = tempdir().expect( "tempdir" );
        let mut store = JsonStore::open( dir.path().join( "absent.json" ) ).unwrap();
        assert_eq!( store.load().unwrap(), StoreSnapshot::default() );
    }


    #[test]
    fn test_json_rejects_garbage() {
        let dir = tempdir().expect( "tempdir" );
        let path = dir.path().join( "queue.json" );
        fs::write( &path, "not json" ).unwrap();

        assert!( matches!( JsonStore::open( &path ), Err( StoreError::Json( _ ) ) ) );
    }
}
