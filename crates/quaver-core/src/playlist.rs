//! Ordered playlists with explicit positions
//!
//! Every entry carries its own position. Entries live in insertion order and
//! are sorted by position whenever an ordered view is needed, so positions
//! may drift (gaps, duplicates) after partial edits until
//! `ensure_consistent_order` repairs them.
//!
//! Mutations never fail. Out-of-range indices and absent items are no-ops.
//! Each change is recorded in a journal that the owner drains with
//! `take_changes` and forwards to a store.

use std::fmt;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{ Deserialize, Serialize };

use crate::item::Playable;
use crate::store::StoredEntry;


/// Which queue of a playback session a playlist represents.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize )]
#[serde( rename_all = "snake_case" )]
pub enum QueueKind {
    Normal,
    Shuffled,
    User,
}


impl QueueKind {
    /// Returns the display name of the queue.
    pub fn name( &self ) -> &'static str {
        match self {
            QueueKind::Normal => "Context",
            QueueKind::Shuffled => "Context (shuffled)",
            QueueKind::User => "User queue",
        }
    }
}


/// Store-level identity of an entry, unique within one playlist.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize )]
#[serde( transparent )]
pub struct EntryId( pub u64 );


/// A playable placed at a position.
#[derive( Debug, Clone )]
pub struct Entry {
    id: EntryId,
    playable: Arc<Playable>,
    position: usize,
}


impl Entry {
    pub fn id( &self ) -> EntryId {
        self.id
    }


    pub fn playable( &self ) -> &Arc<Playable> {
        &self.playable
    }


    pub fn position( &self ) -> usize {
        self.position
    }
}


/// A single journaled mutation.
#[derive( Debug, Clone, PartialEq )]
pub enum Change {
    Created { id: EntryId, playable: Arc<Playable>, position: usize },
    Repositioned { id: EntryId, position: usize },
    Deleted { id: EntryId },
}


/// Mutable ordered sequence of playables.
#[derive( Debug )]
pub struct OrderedPlaylist {
    kind: QueueKind,
    entries: Vec<Entry>,
    next_entry_id: u64,
    changes: Vec<Change>,
}


impl OrderedPlaylist {
    /// Creates an empty playlist.
    pub fn new( kind: QueueKind ) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            next_entry_id: 0,
            changes: Vec::new(),
        }
    }


    /// Rebuilds a playlist from persisted entries.
    ///
    /// Positions are taken as stored, without repair, and nothing is journaled.
    pub fn from_stored( kind: QueueKind, stored: Vec<StoredEntry> ) -> Self {
        let next_entry_id = stored.iter()
            .map( |e| e.id.0 + 1 )
            .max()
            .unwrap_or( 0 );

        let entries = stored.into_iter()
            .map( |e| Entry {
                id: e.id,
                playable: Arc::new( e.playable ),
                position: e.position,
            } )
            .collect();

        Self {
            kind,
            entries,
            next_entry_id,
            changes: Vec::new(),
        }
    }


    pub fn kind( &self ) -> QueueKind {
        self.kind
    }


    /// Appends a playable at the next position.
    pub fn append( &mut self, playable: Arc<Playable> ) {
        let id = EntryId( self.next_entry_id );
        self.next_entry_id += 1;

        let position = self.entries.len();
        self.changes.push( Change::Created {
            id,
            playable: Arc::clone( &playable ),
            position,
        } );
        self.entries.push( Entry { id, playable, position } );
    }


    /// Appends playables in iteration order.
    pub fn append_all( &mut self, playables: impl IntoIterator<Item = Arc<Playable>> ) {
        for playable in playables {
            self.append( playable );
        }
    }


    /// Moves the entry at sorted index `from` to sorted index `to`.
    ///
    /// Only the entries between the two indices are repositioned.
    ///
    /// @param from - Source index
    /// @param to - Destination index
    ///
    /// @returns true if anything moved
    pub fn move_entry( &mut self, from: usize, to: usize ) -> bool {
        let len = self.entries.len();
        if from == to || from >= len || to >= len {
            return false;
        }

        let order = self.sorted_order();
        let target_position = self.entries[ order[ to ] ].position;

        if from < to {
            for &slot in &order[ from + 1..=to ] {
                let position = self.entries[ slot ].position.saturating_sub( 1 );
                self.reposition( slot, position );
            }
        } else {
            for &slot in &order[ to..from ] {
                let position = self.entries[ slot ].position + 1;
                self.reposition( slot, position );
            }
        }
        self.reposition( order[ from ], target_position );

        true
    }


    /// Removes the entry at sorted index `index`.
    ///
    /// Every entry positioned after the removed one moves up by one.
    pub fn remove_at( &mut self, index: usize ) -> Option<Arc<Playable>> {
        let slot = *self.sorted_order().get( index )?;
        let removed = self.entries.remove( slot );

        for entry in self.entries.iter_mut() {
            if entry.position > removed.position {
                entry.position -= 1;
                self.changes.push( Change::Repositioned {
                    id: entry.id,
                    position: entry.position,
                } );
            }
        }
        self.changes.push( Change::Deleted { id: removed.id } );

        Some( removed.playable )
    }


    /// Removes the first entry with the same identity as `playable`.
    ///
    /// @returns true if an entry was removed
    pub fn remove_first_occurrence( &mut self, playable: &Playable ) -> bool {
        match self.first_index_of( playable ) {
            Some( index ) => self.remove_at( index ).is_some(),
            None => false,
        }
    }


    /// Sorted index of the first entry with the same identity as `playable`.
    pub fn first_index_of( &self, playable: &Playable ) -> Option<usize> {
        self.entries()
            .iter()
            .position( |e| e.playable.is_same( playable ) )
    }


    /// Removes every entry.
    pub fn clear( &mut self ) {
        for entry in self.entries.drain( .. ) {
            self.changes.push( Change::Deleted { id: entry.id } );
        }
    }


    /// Assigns a random permutation of `0..len` to the entries in their
    /// current order.
    pub fn shuffle( &mut self, rng: &mut SmallRng ) {
        if self.entries.is_empty() {
            return;
        }

        let order = self.sorted_order();
        let mut positions: Vec<usize> = ( 0..order.len() ).collect();
        positions.shuffle( rng );

        for ( slot, position ) in order.into_iter().zip( positions ) {
            self.reposition( slot, position );
        }
    }


    /// Rewrites positions to match sorted order exactly.
    ///
    /// Relative order is never changed.
    ///
    /// @returns true if any position had to be fixed
    pub fn ensure_consistent_order( &mut self ) -> bool {
        let mut repaired = false;

        for ( index, slot ) in self.sorted_order().into_iter().enumerate() {
            if self.entries[ slot ].position != index {
                self.reposition( slot, index );
                repaired = true;
            }
        }

        if repaired {
            tracing::debug!( "{} inconsistency detected and fixed", self.kind.name() );
        }
        repaired
    }


    /// Drains the change journal.
    pub fn take_changes( &mut self ) -> Vec<Change> {
        std::mem::take( &mut self.changes )
    }


    pub fn has_pending_changes( &self ) -> bool {
        !self.changes.is_empty()
    }


    /// Entries sorted by position.
    pub fn entries( &self ) -> Vec<&Entry> {
        self.sorted_order()
            .into_iter()
            .map( |slot| &self.entries[ slot ] )
            .collect()
    }


    /// Playables sorted by position.
    pub fn playables( &self ) -> Vec<Arc<Playable>> {
        self.entries()
            .into_iter()
            .map( |e| Arc::clone( &e.playable ) )
            .collect()
    }


    /// Locally available entries sorted by position.
    pub fn cached_entries( &self ) -> Vec<&Entry> {
        self.entries()
            .into_iter()
            .filter( |e| e.playable.is_cached )
            .collect()
    }


    pub fn has_cached_items( &self ) -> bool {
        self.entries.iter().any( |e| e.playable.is_cached )
    }


    /// Gets the entry at a sorted index.
    pub fn get( &self, index: usize ) -> Option<&Entry> {
        let slot = *self.sorted_order().get( index )?;
        self.entries.get( slot )
    }


    pub fn len( &self ) -> usize {
        self.entries.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.entries.is_empty()
    }


    /// Index of the last entry, 0 when empty.
    pub fn last_index( &self ) -> usize {
        self.entries.len().saturating_sub( 1 )
    }


    /// Indices into `entries`, stable-sorted by position.
    fn sorted_order( &self ) -> Vec<usize> {
        let mut order: Vec<usize> = ( 0..self.entries.len() ).collect();
        order.sort_by_key( |&slot| self.entries[ slot ].position );
        order
    }


    fn reposition( &mut self, slot: usize, position: usize ) {
        let entry = &mut self.entries[ slot ];
        if entry.position != position {
            entry.position = position;
            self.changes.push( Change::Repositioned { id: entry.id, position } );
        }
    }
}


impl fmt::Display for OrderedPlaylist {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        writeln!( f, "Name: {}", self.kind.name() )?;
        writeln!( f, "Count: {}", self.entries.len() )?;
        writeln!( f, "Items:" )?;
        for entry in self.entries() {
            writeln!(
                f,
                "{}: {} - {}",
                entry.position,
                entry.playable.artist.as_deref().unwrap_or( "NO ARTIST" ),
                entry.playable.title,
            )?;
        }
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use proptest::prop_assert_eq;
    use rand::SeedableRng;


    fn song( n: usize ) -> Arc<Playable> {
        Arc::new( Playable::new( format!( "song-{}", n ), format!( "Song {}", n ) ) )
    }


    fn filled( count: usize ) -> OrderedPlaylist {
        let mut playlist = OrderedPlaylist::new( QueueKind::Normal );
        playlist.append_all( ( 0..count ).map( song ) );
        playlist
    }


    fn ids( playlist: &OrderedPlaylist ) -> Vec<String> {
        playlist.playables()
            .iter()
            .map( |p| p.id.to_string() )
            .collect()
    }


    fn positions( playlist: &OrderedPlaylist ) -> Vec<usize> {
        playlist.entries().iter().map( |e| e.position() ).collect()
    }


    fn stored( n: usize, position: usize ) -> StoredEntry {
        StoredEntry {
            id: EntryId( n as u64 ),
            playable: Playable::new( format!( "song-{}", n ), format!( "Song {}", n ) ),
            position,
        }
    }


    #[test]
    fn test_append_assigns_next_position() {
        let mut playlist = filled( 3 );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2 ] );

        playlist.append( song( 9 ) );
        assert_eq!( playlist.len(), 4 );
        assert_eq!( playlist.get( 3 ).unwrap().position(), 3 );
        assert_eq!( playlist.get( 3 ).unwrap().playable().id.as_str(), "song-9" );
    }


    #[test]
    fn test_move_forward() {
        let mut playlist = filled( 5 );
        assert!( playlist.move_entry( 1, 3 ) );
        assert_eq!( ids( &playlist ), vec![ "song-0", "song-2", "song-3", "song-1", "song-4" ] );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2, 3, 4 ] );
    }


    #[test]
    fn test_move_backward() {
        let mut playlist = filled( 5 );
        assert!( playlist.move_entry( 4, 0 ) );
        assert_eq!( ids( &playlist ), vec![ "song-4", "song-0", "song-1", "song-2", "song-3" ] );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2, 3, 4 ] );
    }


    #[test]
    fn test_move_only_touches_affected_range() {
        let mut playlist = filled( 6 );
        playlist.take_changes();

        playlist.move_entry( 1, 3 );
        let changes = playlist.take_changes();

        // song-2 and song-3 shift down, song-1 takes position 3
        assert_eq!( changes, vec![
            Change::Repositioned { id: EntryId( 2 ), position: 1 },
            Change::Repositioned { id: EntryId( 3 ), position: 2 },
            Change::Repositioned { id: EntryId( 1 ), position: 3 },
        ] );
    }


    #[test]
    fn test_move_out_of_range_is_noop() {
        let mut playlist = filled( 3 );
        playlist.take_changes();

        assert!( !playlist.move_entry( 0, 3 ) );
        assert!( !playlist.move_entry( 5, 1 ) );
        assert!( !playlist.move_entry( 2, 2 ) );
        assert_eq!( ids( &playlist ), vec![ "song-0", "song-1", "song-2" ] );
        assert!( !playlist.has_pending_changes() );
    }


    #[test]
    fn test_remove_keeps_positions_dense() {
        let mut playlist = filled( 5 );
        let removed = playlist.remove_at( 2 ).unwrap();

        assert_eq!( removed.id.as_str(), "song-2" );
        assert_eq!( ids( &playlist ), vec![ "song-0", "song-1", "song-3", "song-4" ] );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2, 3 ] );
    }


    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut playlist = filled( 2 );
        assert!( playlist.remove_at( 2 ).is_none() );
        assert_eq!( playlist.len(), 2 );
    }


    #[test]
    fn test_remove_first_occurrence() {
        let mut playlist = filled( 3 );
        playlist.append( song( 1 ) );

        assert!( playlist.remove_first_occurrence( &song( 1 ) ) );
        assert_eq!( ids( &playlist ), vec![ "song-0", "song-2", "song-1" ] );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2 ] );

        assert!( !playlist.remove_first_occurrence( &song( 7 ) ) );
        assert_eq!( playlist.len(), 3 );
    }


    #[test]
    fn test_first_index_of() {
        let playlist = filled( 4 );
        assert_eq!( playlist.first_index_of( &song( 2 ) ), Some( 2 ) );
        assert_eq!( playlist.first_index_of( &song( 8 ) ), None );
    }


    #[test]
    fn test_clear_journals_deletions() {
        let mut playlist = filled( 3 );
        playlist.take_changes();

        playlist.clear();
        assert!( playlist.is_empty() );
        assert_eq!( playlist.take_changes().len(), 3 );
        assert_eq!( playlist.last_index(), 0 );
    }


    #[test]
    fn test_shuffle_yields_permutation() {
        let mut rng = SmallRng::seed_from_u64( 7 );
        let mut playlist = filled( 20 );
        playlist.shuffle( &mut rng );

        let mut shuffled_ids = ids( &playlist );
        shuffled_ids.sort();
        let mut expected_ids = ids( &filled( 20 ) );
        expected_ids.sort();
        assert_eq!( shuffled_ids, expected_ids );

        let mut raw: Vec<usize> = playlist.entries.iter().map( |e| e.position ).collect();
        raw.sort();
        assert_eq!( raw, ( 0..20 ).collect::<Vec<_>>() );
    }


    #[test]
    fn test_shuffle_empty_is_noop() {
        let mut rng = SmallRng::seed_from_u64( 1 );
        let mut playlist = OrderedPlaylist::new( QueueKind::Shuffled );
        playlist.shuffle( &mut rng );
        assert!( playlist.is_empty() );
        assert!( !playlist.has_pending_changes() );
    }


    #[test]
    fn test_repair_closes_gaps() {
        let mut playlist = OrderedPlaylist::from_stored(
            QueueKind::Normal,
            vec![ stored( 0, 0 ), stored( 1, 5 ), stored( 2, 2 ) ],
        );

        assert!( playlist.ensure_consistent_order() );
        assert_eq!( ids( &playlist ), vec![ "song-0", "song-2", "song-1" ] );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2 ] );

        assert!( !playlist.ensure_consistent_order() );
    }


    #[test]
    fn test_repair_breaks_duplicate_positions_by_insertion_order() {
        let mut playlist = OrderedPlaylist::from_stored(
            QueueKind::Normal,
            vec![ stored( 0, 1 ), stored( 1, 1 ), stored( 2, 0 ) ],
        );

        assert!( playlist.ensure_consistent_order() );
        assert_eq!( ids( &playlist ), vec![ "song-2", "song-0", "song-1" ] );
        assert_eq!( positions( &playlist ), vec![ 0, 1, 2 ] );
    }


    #[test]
    fn test_from_stored_continues_entry_ids() {
        let mut playlist = OrderedPlaylist::from_stored(
            QueueKind::User,
            vec![ stored( 4, 0 ), stored( 9, 1 ) ],
        );
        assert!( !playlist.has_pending_changes() );

        playlist.append( song( 3 ) );
        let changes = playlist.take_changes();
        assert!( matches!( changes[ 0 ], Change::Created { id: EntryId( 10 ), position: 2, .. } ) );
    }


    #[test]
    fn test_cached_entries() {
        let mut playlist = OrderedPlaylist::new( QueueKind::Normal );
        for n in 0..4 {
            playlist.append( Arc::new( Playable::new( format!( "song-{}", n ), "x" ).cached( n % 2 == 1 ) ) );
        }

        let cached: Vec<usize> = playlist.cached_entries().iter().map( |e| e.position() ).collect();
        assert_eq!( cached, vec![ 1, 3 ] );
        assert!( playlist.has_cached_items() );
    }


    #[test]
    fn test_display_lists_items() {
        let mut playlist = OrderedPlaylist::new( QueueKind::User );
        playlist.append( Arc::new( Playable::new( "a", "Alpha" ).with_artist( "Band" ) ) );
        playlist.append( Arc::new( Playable::new( "b", "Beta" ) ) );

        let text = playlist.to_string();
        assert!( text.starts_with( "Name: User queue\nCount: 2\n" ) );
        assert!( text.contains( "0: Band - Alpha\n" ) );
        assert!( text.contains( "1: NO ARTIST - Beta\n" ) );
    }


    proptest::proptest! {
        #[test]
        fn repaired_positions_are_dense(
            ops in proptest::collection::vec( ( 0u8..5, 0usize..12, 0usize..12 ), 1..120 )
        ) {
            let mut rng = SmallRng::seed_from_u64( 3 );
            let mut playlist = filled( 4 );
            let mut next = 4;

            for ( op, a, b ) in ops {
                match op {
                    0 => {
                        playlist.append( song( next ) );
                        next += 1;
                    }
                    1 => {
                        playlist.move_entry( a, b );
                    }
                    2 => {
                        playlist.remove_at( a );
                    }
                    3 => playlist.shuffle( &mut rng ),
                    _ => {
                        playlist.remove_first_occurrence( &song( a ) );
                    }
                }
            }

            playlist.ensure_consistent_order();
            prop_assert_eq!( positions( &playlist ), ( 0..playlist.len() ).collect::<Vec<_>>() );
        }
    }
}
