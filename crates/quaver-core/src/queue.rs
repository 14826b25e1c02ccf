//! Playback queue management
//!
//! `PlaybackQueueManager` owns the three queues of a playback session:
//!
//! - the normal context queue, which is authoritative for ordering,
//! - the shuffled context queue, holding the same items in random order,
//! - the user queue for ad-hoc "play next" items, which is never shuffled.
//!
//! Membership changes (append, remove) are applied to both context views.
//! Positional changes (move, repair) go to the normal view only. After every
//! change the pending journals are forwarded to the store and committed; the
//! in-memory state is kept even if the commit fails.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{ Deserialize, Serialize };

use crate::item::Playable;
use crate::navigation::CachedNavigationIndex;
use crate::playlist::{ Change, OrderedPlaylist, QueueKind };
use crate::store::{ PlayerState, QueueStore, StoreError, StoredEntry };


/// Repeat mode for playback.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "snake_case" )]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    Single,
}


impl RepeatMode {
    /// Returns the next mode in cycle order.
    pub fn next( self ) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::Single,
            RepeatMode::Single => RepeatMode::Off,
        }
    }


    pub fn name( &self ) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::Single => "single",
        }
    }
}


/// Playback cursor within the addressed queue.
///
/// Observed from outside as an integer where `-1` means `BeforeStart`.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
enum Cursor {
    BeforeStart,
    At( usize ),
}


impl Cursor {
    fn from_index( index: i64 ) -> Self {
        usize::try_from( index )
            .map( Cursor::At )
            .unwrap_or( Cursor::BeforeStart )
    }


    fn as_index( self ) -> i64 {
        match self {
            Cursor::BeforeStart => -1,
            Cursor::At( n ) => n as i64,
        }
    }
}


/// Receives commit failures.
pub trait CommitErrorReporter {
    fn report( &self, error: &StoreError );
}


/// Reporter that only logs.
#[derive( Debug, Default )]
pub struct LogReporter;


impl CommitErrorReporter for LogReporter {
    fn report( &self, error: &StoreError ) {
        tracing::error!( "Queue changes were not persisted: {}", error );
    }
}


/// Queue state of one playback session.
pub struct PlaybackQueueManager<S: QueueStore> {
    normal: OrderedPlaylist,
    shuffled: OrderedPlaylist,
    user: OrderedPlaylist,
    is_shuffle: bool,
    repeat_mode: RepeatMode,
    is_user_queue_playing: bool,
    cursor: Cursor,
    rng: SmallRng,
    store: S,
    reporter: Box<dyn CommitErrorReporter>,
}


impl<S: QueueStore> PlaybackQueueManager<S> {
    /// Creates an empty session backed by `store`.
    pub fn new( store: S ) -> Self {
        Self::with_rng( store, SmallRng::from_rng( &mut rand::rng() ) )
    }


    /// Creates an empty session with a caller-provided shuffle source.
    pub fn with_rng( store: S, rng: SmallRng ) -> Self {
        Self {
            normal: OrderedPlaylist::new( QueueKind::Normal ),
            shuffled: OrderedPlaylist::new( QueueKind::Shuffled ),
            user: OrderedPlaylist::new( QueueKind::User ),
            is_shuffle: false,
            repeat_mode: RepeatMode::Off,
            is_user_queue_playing: false,
            cursor: Cursor::At( 0 ),
            rng,
            store,
            reporter: Box::new( LogReporter ),
        }
    }


    /// Restores a session from the last committed snapshot of `store`.
    pub fn restore( store: S ) -> Result<Self, StoreError> {
        Self::restore_with_rng( store, SmallRng::from_rng( &mut rand::rng() ) )
    }


    /// Restores a session, repairing positions and a diverged shuffled view.
    ///
    /// Repairs are committed back to the store.
    pub fn restore_with_rng( mut store: S, rng: SmallRng ) -> Result<Self, StoreError> {
        let snapshot = store.load()?;
        let state = snapshot.state;

        let mut manager = Self::with_rng( store, rng );
        manager.normal = OrderedPlaylist::from_stored( QueueKind::Normal, snapshot.normal );
        manager.shuffled = OrderedPlaylist::from_stored( QueueKind::Shuffled, snapshot.shuffled );
        manager.user = OrderedPlaylist::from_stored( QueueKind::User, snapshot.user );
        manager.is_shuffle = state.is_shuffle;
        manager.repeat_mode = state.repeat_mode;
        manager.is_user_queue_playing = state.is_user_queue_playing;
        manager.cursor = Cursor::from_index( state.current_index );

        let mut changed = manager.repair_all();
        if manager.shuffled.len() != manager.normal.len() {
            tracing::warn!(
                "Shuffled queue out of sync ({} vs {} items), regenerating",
                manager.shuffled.len(),
                manager.normal.len()
            );
            manager.regenerate_shuffled();
            changed = true;
        }
        if changed {
            manager.commit();
        }

        tracing::info!(
            "Restored queues: {} context items, {} user items",
            manager.normal.len(),
            manager.user.len()
        );
        Ok( manager )
    }


    /// Replaces the commit error reporter.
    pub fn set_reporter( &mut self, reporter: Box<dyn CommitErrorReporter> ) {
        self.reporter = reporter;
    }


    /// The context view in use: shuffled when shuffle is on, else normal.
    pub fn context_queue( &self ) -> &OrderedPlaylist {
        if self.is_shuffle {
            &self.shuffled
        } else {
            &self.normal
        }
    }


    /// The queue the cursor points into.
    pub fn addressed_queue( &self ) -> &OrderedPlaylist {
        if self.is_user_queue_playing {
            &self.user
        } else {
            self.context_queue()
        }
    }


    pub fn normal_queue( &self ) -> &OrderedPlaylist {
        &self.normal
    }


    pub fn shuffled_queue( &self ) -> &OrderedPlaylist {
        &self.shuffled
    }


    pub fn user_queue( &self ) -> &OrderedPlaylist {
        &self.user
    }


    pub fn store( &self ) -> &S {
        &self.store
    }


    pub fn store_mut( &mut self ) -> &mut S {
        &mut self.store
    }


    /// Consumes the manager, returning its store.
    pub fn into_store( self ) -> S {
        self.store
    }


    pub fn is_shuffle( &self ) -> bool {
        self.is_shuffle
    }


    /// Sets shuffle mode.
    ///
    /// Turning shuffle on rebuilds the shuffled view from the normal view in
    /// a fresh random order. Turning it off leaves both views untouched. The
    /// cursor is not remapped in either direction.
    pub fn set_shuffle( &mut self, shuffle: bool ) {
        if shuffle == self.is_shuffle {
            return;
        }

        self.is_shuffle = shuffle;
        if shuffle {
            self.regenerate_shuffled();
        }
        self.commit();
    }


    pub fn repeat_mode( &self ) -> RepeatMode {
        self.repeat_mode
    }


    pub fn set_repeat_mode( &mut self, repeat: RepeatMode ) {
        self.repeat_mode = repeat;
        self.commit();
    }


    pub fn is_user_queue_playing( &self ) -> bool {
        self.is_user_queue_playing
    }


    /// Switches the cursor between the user queue and the context queue.
    ///
    /// The stored cursor is not validated here.
    pub fn set_user_queue_playing( &mut self, playing: bool ) {
        self.is_user_queue_playing = playing;
        self.commit();
    }


    /// Current cursor, validated against the addressed queue.
    ///
    /// In the user queue the range is `-1..=len-1` and out-of-range values
    /// clamp. In the context queue the range is `0..=len-1` and any
    /// out-of-range value reads as `0`.
    pub fn current_index( &self ) -> i64 {
        self.validate_index( self.cursor.as_index() )
    }


    /// Sets the cursor, applying the same rules as `current_index`.
    pub fn set_current_index( &mut self, index: i64 ) {
        self.cursor = Cursor::from_index( self.validate_index( index ) );
        self.commit();
    }


    /// The item under the cursor, if any.
    pub fn current_item( &self ) -> Option<Arc<Playable>> {
        let index = usize::try_from( self.current_index() ).ok()?;
        self.addressed_queue()
            .get( index )
            .map( |e| Arc::clone( e.playable() ) )
    }


    /// Appends items to the context queue.
    ///
    /// The items go to the end of both views in call order, whether or not
    /// shuffle is on.
    pub fn append_context_queue( &mut self, playables: impl IntoIterator<Item = Playable> ) {
        let playables: Vec<Arc<Playable>> = playables.into_iter().map( Arc::new ).collect();
        if playables.is_empty() {
            return;
        }

        self.normal.append_all( playables.iter().cloned() );
        self.shuffled.append_all( playables );
        self.commit();
    }


    /// Appends items to the user queue.
    pub fn append_user_queue( &mut self, playables: impl IntoIterator<Item = Playable> ) {
        let before = self.user.len();
        self.user.append_all( playables.into_iter().map( Arc::new ) );
        if self.user.len() != before {
            self.commit();
        }
    }


    /// Removes the entry at `index` of the active context view, and the
    /// first occurrence of the same item from the other view.
    pub fn remove_from_context_queue( &mut self, index: usize ) -> Option<Arc<Playable>> {
        let ( active, other ) = if self.is_shuffle {
            ( &mut self.shuffled, &mut self.normal )
        } else {
            ( &mut self.normal, &mut self.shuffled )
        };

        let removed = active.remove_at( index )?;
        other.remove_first_occurrence( &removed );

        if !self.is_user_queue_playing {
            self.adjust_cursor_for_removal( index );
        }
        self.commit();
        Some( removed )
    }


    /// Removes the entry at `index` of the user queue.
    pub fn remove_from_user_queue( &mut self, index: usize ) -> Option<Arc<Playable>> {
        let removed = self.user.remove_at( index )?;

        if self.is_user_queue_playing {
            self.adjust_cursor_for_removal( index );
        }
        self.commit();
        Some( removed )
    }


    /// Empties the user queue.
    pub fn clear_user_queue( &mut self ) {
        if self.user.is_empty() {
            return;
        }

        self.user.clear();
        if self.is_user_queue_playing {
            self.cursor = Cursor::BeforeStart;
        }
        self.commit();
    }


    /// Moves an entry within the normal view.
    ///
    /// Ordering is owned by the normal view, so this applies even while the
    /// shuffled view is active.
    ///
    /// @returns true if anything moved
    pub fn move_context_queue( &mut self, from: usize, to: usize ) -> bool {
        if !self.normal.move_entry( from, to ) {
            return false;
        }

        if !self.is_shuffle && !self.is_user_queue_playing {
            self.adjust_cursor_for_move( from, to );
        }
        self.commit();
        true
    }


    /// Moves an entry within the user queue.
    pub fn move_user_queue( &mut self, from: usize, to: usize ) -> bool {
        if !self.user.move_entry( from, to ) {
            return false;
        }

        if self.is_user_queue_playing {
            self.adjust_cursor_for_move( from, to );
        }
        self.commit();
        true
    }


    /// Clears all three queues and resets the cursor to 0.
    ///
    /// Shuffle and repeat settings are kept.
    pub fn remove_all_items( &mut self ) {
        self.normal.clear();
        self.shuffled.clear();
        self.user.clear();
        self.cursor = Cursor::At( 0 );
        self.commit();
    }


    /// Repairs positions in all queues and commits if anything was fixed.
    ///
    /// @returns true if a repair happened
    pub fn ensure_consistent_order( &mut self ) -> bool {
        let repaired = self.repair_all();
        if repaired {
            self.commit();
        }
        repaired
    }


    /// Index that playback would move to next.
    ///
    /// `Single` repeats the current entry. With `offline` set, entries that
    /// are not cached are skipped. Past the end, `All` wraps around.
    pub fn next_index( &self, offline: bool ) -> Option<usize> {
        let queue = self.addressed_queue();
        if queue.is_empty() {
            return None;
        }

        let current = self.current_index();
        if self.repeat_mode == RepeatMode::Single && current >= 0 {
            return Some( current as usize );
        }
        let wrap = self.repeat_mode == RepeatMode::All;

        if offline {
            let index = CachedNavigationIndex::new( queue );
            index.next_available( current )
                .or_else( || if wrap { index.next_available_beginning_at( 0 ) } else { None } )
        } else {
            let next = ( current + 1 ) as usize;
            if next < queue.len() {
                Some( next )
            } else if wrap {
                Some( 0 )
            } else {
                None
            }
        }
    }


    /// Index that playback would move back to.
    pub fn previous_index( &self, offline: bool ) -> Option<usize> {
        let queue = self.addressed_queue();
        if queue.is_empty() {
            return None;
        }

        let current = self.current_index();
        if self.repeat_mode == RepeatMode::Single && current >= 0 {
            return Some( current as usize );
        }
        let wrap = self.repeat_mode == RepeatMode::All;

        if offline {
            let index = CachedNavigationIndex::new( queue );
            index.previous_available( current )
                .or_else( || if wrap {
                    index.previous_available_beginning_at( queue.last_index() as i64 )
                } else {
                    None
                } )
        } else if current > 0 {
            Some( ( current - 1 ) as usize )
        } else if wrap {
            Some( queue.last_index() )
        } else {
            None
        }
    }


    /// Moves the cursor forward and returns the new current item.
    pub fn advance( &mut self, offline: bool ) -> Option<Arc<Playable>> {
        let next = self.next_index( offline )?;
        self.set_current_index( next as i64 );
        self.current_item()
    }


    /// Moves the cursor back and returns the new current item.
    pub fn go_back( &mut self, offline: bool ) -> Option<Arc<Playable>> {
        let previous = self.previous_index( offline )?;
        self.set_current_index( previous as i64 );
        self.current_item()
    }


    /// Scalar state as persisted.
    pub fn player_state( &self ) -> PlayerState {
        PlayerState {
            is_shuffle: self.is_shuffle,
            repeat_mode: self.repeat_mode,
            is_user_queue_playing: self.is_user_queue_playing,
            current_index: self.cursor.as_index(),
        }
    }


    fn validate_index( &self, index: i64 ) -> i64 {
        if self.is_user_queue_playing {
            let upper = self.user.len() as i64 - 1;
            if index < -1 {
                -1
            } else if index > upper {
                upper
            } else {
                index
            }
        } else {
            let count = self.context_queue().len() as i64;
            if index < 0 || index >= count {
                0
            } else {
                index
            }
        }
    }


    fn adjust_cursor_for_removal( &mut self, removed: usize ) {
        if let Cursor::At( current ) = self.cursor {
            if removed < current {
                self.cursor = Cursor::At( current - 1 );
            }
        }
    }


    fn adjust_cursor_for_move( &mut self, from: usize, to: usize ) {
        if let Cursor::At( current ) = self.cursor {
            let moved = if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            };
            self.cursor = Cursor::At( moved );
        }
    }


    fn regenerate_shuffled( &mut self ) {
        self.shuffled.clear();
        self.shuffled.append_all( self.normal.playables() );
        self.shuffled.shuffle( &mut self.rng );
        tracing::debug!( "Regenerated shuffled queue with {} items", self.shuffled.len() );
    }


    fn repair_all( &mut self ) -> bool {
        let normal = self.normal.ensure_consistent_order();
        let shuffled = self.shuffled.ensure_consistent_order();
        let user = self.user.ensure_consistent_order();
        normal || shuffled || user
    }


    /// Forwards pending changes and player state to the store and commits.
    fn commit( &mut self ) {
        for playlist in [ &mut self.normal, &mut self.shuffled, &mut self.user ] {
            let kind = playlist.kind();
            for change in playlist.take_changes() {
                match change {
                    Change::Created { id, playable, position } => {
                        self.store.create_entry( kind, StoredEntry {
                            id,
                            playable: playable.as_ref().clone(),
                            position,
                        } );
                    }
                    Change::Repositioned { id, position } => {
                        self.store.update_position( kind, id, position );
                    }
                    Change::Deleted { id } => {
                        self.store.delete_entry( kind, id );
                    }
                }
            }
        }

        let state = self.player_state();
        self.store.save_state( state );

        if let Err( e ) = self.store.commit() {
            tracing::warn!( "Commit failed, keeping in-memory queue state: {}", e );
            self.reporter.report( &e );
        }
    }
}


#[cfg( test )]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::store::{ MemoryStore, StoreSnapshot };
    use crate::playlist::EntryId;

    use proptest::prop_assert;
    use proptest::prop_assert_eq;


    const FILL_COUNT: usize = 5;


    fn song( n: usize ) -> Playable {
        Playable::new( format!( "song-{}", n ), format!( "Song {}", n ) )
    }


    fn manager() -> PlaybackQueueManager<MemoryStore> {
        PlaybackQueueManager::with_rng( MemoryStore::new(), SmallRng::seed_from_u64( 11 ) )
    }


    fn filled() -> PlaybackQueueManager<MemoryStore> {
        let mut manager = manager();
        for n in 0..FILL_COUNT {
            manager.append_context_queue( [ song( n ) ] );
        }
        manager
    }


    fn ids( playlist: &OrderedPlaylist ) -> Vec<String> {
        playlist.playables()
            .iter()
            .map( |p| p.id.to_string() )
            .collect()
    }


    fn sorted_ids( playlist: &OrderedPlaylist ) -> Vec<String> {
        let mut ids = ids( playlist );
        ids.sort();
        ids
    }


    fn check_default_order( manager: &PlaybackQueueManager<MemoryStore> ) {
        let expected: Vec<String> = ( 0..FILL_COUNT ).map( |n| format!( "song-{}", n ) ).collect();
        assert_eq!( ids( manager.context_queue() )[ ..FILL_COUNT ].to_vec(), expected );
    }


    /// Collects reported commit errors.
    #[derive( Clone, Default )]
    struct Collect( Arc<Mutex<Vec<String>>> );


    impl CommitErrorReporter for Collect {
        fn report( &self, error: &StoreError ) {
            self.0.lock().unwrap().push( error.to_string() );
        }
    }


    #[test]
    fn test_creation() {
        let manager = manager();
        assert_eq!( manager.context_queue().kind(), QueueKind::Normal );
        assert!( manager.current_item().is_none() );
        assert!( !manager.is_shuffle() );
        assert_eq!( manager.repeat_mode(), RepeatMode::Off );
        assert_eq!( manager.current_index(), 0 );
        assert!( manager.normal_queue().is_empty() );
        assert!( manager.shuffled_queue().is_empty() );
    }


    #[test]
    fn test_context_queue() {
        let manager = filled();
        assert_eq!( manager.context_queue().len(), FILL_COUNT );
        check_default_order( &manager );
    }


    #[test]
    fn test_current_item() {
        let mut manager = filled();
        for n in [ 3, 2, 4, 1, 0 ] {
            manager.set_current_index( n as i64 );
            assert_eq!( manager.current_item().unwrap().id.to_string(), format!( "song-{}", n ) );
        }
    }


    #[test]
    fn test_shuffle_toggle_switches_views() {
        let mut manager = manager();
        manager.set_shuffle( true );
        assert!( manager.is_shuffle() );
        assert_eq!( manager.context_queue().kind(), QueueKind::Shuffled );
        manager.set_shuffle( false );
        assert!( !manager.is_shuffle() );
        assert_eq!( manager.context_queue().kind(), QueueKind::Normal );
        manager.set_shuffle( true );

        for n in 0..FILL_COUNT {
            manager.append_context_queue( [ song( n ) ] );
        }
        assert_eq!( manager.context_queue().len(), FILL_COUNT );
        manager.set_shuffle( false );
        assert_eq!( manager.context_queue().len(), FILL_COUNT );
        check_default_order( &manager );
        manager.set_shuffle( true );
        assert_eq!( manager.context_queue().len(), FILL_COUNT );
        manager.set_shuffle( false );
        assert_eq!( manager.context_queue().len(), FILL_COUNT );
        check_default_order( &manager );
    }


    #[test]
    fn test_shuffle_regenerates_same_item_set() {
        let mut manager = filled();
        manager.set_shuffle( true );

        assert_eq!( sorted_ids( manager.shuffled_queue() ), sorted_ids( manager.normal_queue() ) );
        let mut positions: Vec<usize> = manager.shuffled_queue()
            .entries()
            .iter()
            .map( |e| e.position() )
            .collect();
        positions.sort();
        assert_eq!( positions, ( 0..FILL_COUNT ).collect::<Vec<_>>() );
    }


    #[test]
    fn test_repeat() {
        let mut manager = manager();
        manager.set_repeat_mode( RepeatMode::All );
        assert_eq!( manager.repeat_mode(), RepeatMode::All );
        manager.set_repeat_mode( RepeatMode::Single );
        assert_eq!( manager.repeat_mode(), RepeatMode::Single );
        manager.set_repeat_mode( RepeatMode::Off );
        assert_eq!( manager.repeat_mode(), RepeatMode::Off );
        assert_eq!( RepeatMode::Single.next(), RepeatMode::Off );
    }


    #[test]
    fn test_current_index_set() {
        let mut manager = filled();
        manager.set_current_index( 2 );
        assert_eq!( manager.current_index(), 2 );
        manager.set_current_index( -1 );
        assert_eq!( manager.current_index(), 0 );
        manager.set_current_index( -2 );
        assert_eq!( manager.current_index(), 0 );
        manager.set_user_queue_playing( true );
        manager.set_current_index( -1 );
        assert_eq!( manager.current_index(), -1 );
        manager.set_current_index( -2 );
        assert_eq!( manager.current_index(), -1 );
        manager.set_user_queue_playing( false );
        manager.set_current_index( -10 );
        assert_eq!( manager.current_index(), 0 );
        manager.set_current_index( FILL_COUNT as i64 - 1 );
        assert_eq!( manager.current_index(), FILL_COUNT as i64 - 1 );
        manager.set_current_index( FILL_COUNT as i64 );
        assert_eq!( manager.current_index(), 0 );
        manager.set_current_index( 100 );
        assert_eq!( manager.current_index(), 0 );
    }


    #[test]
    fn test_user_queue_clamps_to_upper_bound() {
        let mut manager = filled();
        manager.append_user_queue( [ song( 10 ), song( 11 ) ] );
        manager.set_user_queue_playing( true );

        manager.set_current_index( 7 );
        assert_eq!( manager.current_index(), 1 );
        assert_eq!( manager.current_item().unwrap().id.as_str(), "song-11" );
        assert_eq!( manager.user_queue().len(), 2 );
        assert_eq!( manager.context_queue().len(), FILL_COUNT );
    }


    #[test]
    fn test_switching_queues_does_not_rewrite_cursor() {
        let mut manager = filled();
        manager.set_current_index( 4 );
        manager.append_user_queue( [ song( 10 ) ] );

        manager.set_user_queue_playing( true );
        assert_eq!( manager.current_index(), 0 );

        manager.set_user_queue_playing( false );
        assert_eq!( manager.current_index(), 4 );
    }


    #[test]
    fn test_add_to_playlist() {
        let mut manager = filled();
        manager.append_context_queue( [ song( 6 ) ] );
        assert_eq!( manager.context_queue().len(), FILL_COUNT + 1 );
        manager.set_shuffle( true );
        assert_eq!( manager.context_queue().len(), FILL_COUNT + 1 );
        manager.append_context_queue( [ song( 7 ) ] );
        assert_eq!( manager.context_queue().len(), FILL_COUNT + 2 );
        manager.set_shuffle( false );
        assert_eq!( manager.context_queue().len(), FILL_COUNT + 2 );

        let queue = manager.context_queue();
        assert_eq!( queue.get( FILL_COUNT ).unwrap().playable().id.as_str(), "song-6" );
        assert_eq!( queue.get( FILL_COUNT ).unwrap().position(), FILL_COUNT );
        assert_eq!( queue.get( FILL_COUNT + 1 ).unwrap().playable().id.as_str(), "song-7" );
        assert_eq!( queue.get( FILL_COUNT + 1 ).unwrap().position(), FILL_COUNT + 1 );
    }


    #[test]
    fn test_appended_items_land_at_end_of_shuffled_view() {
        let mut manager = filled();
        manager.set_shuffle( true );
        manager.append_context_queue( [ song( 8 ) ] );

        let last = manager.shuffled_queue().get( FILL_COUNT ).unwrap();
        assert_eq!( last.playable().id.as_str(), "song-8" );
    }


    #[test]
    fn test_remove_all_items() {
        let mut manager = filled();
        manager.set_current_index( 3 );
        assert_eq!( manager.current_index(), 3 );
        manager.append_user_queue( [ song( 9 ) ] );
        manager.set_repeat_mode( RepeatMode::All );
        manager.set_shuffle( true );

        manager.remove_all_items();
        assert_eq!( manager.current_index(), 0 );
        assert!( manager.context_queue().is_empty() );
        assert!( manager.shuffled_queue().is_empty() );
        assert!( manager.user_queue().is_empty() );
        assert_eq!( manager.repeat_mode(), RepeatMode::All );
        assert!( manager.is_shuffle() );

        manager.append_context_queue( [ song( 6 ) ] );
        manager.append_context_queue( [ song( 7 ) ] );
        manager.remove_all_items();
        assert!( manager.context_queue().is_empty() );
    }


    #[test]
    fn test_remove_propagates_to_other_view() {
        let mut manager = filled();
        manager.set_shuffle( true );
        let removed = manager.remove_from_context_queue( 0 ).unwrap();

        assert_eq!( manager.normal_queue().len(), FILL_COUNT - 1 );
        assert_eq!( manager.shuffled_queue().len(), FILL_COUNT - 1 );
        assert!( manager.normal_queue().first_index_of( &removed ).is_none() );
        assert_eq!( sorted_ids( manager.shuffled_queue() ), sorted_ids( manager.normal_queue() ) );

        assert!( manager.remove_from_context_queue( 10 ).is_none() );
    }


    #[test]
    fn test_remove_before_cursor_keeps_current_item() {
        let mut manager = filled();
        manager.set_current_index( 3 );
        manager.remove_from_context_queue( 1 );

        assert_eq!( manager.current_index(), 2 );
        assert_eq!( manager.current_item().unwrap().id.as_str(), "song-3" );
    }


    #[test]
    fn test_move_targets_normal_view() {
        let mut manager = filled();
        manager.set_shuffle( true );
        let shuffled_before = ids( manager.shuffled_queue() );

        assert!( manager.move_context_queue( 0, 4 ) );
        assert_eq!( ids( manager.normal_queue() ), vec![ "song-1", "song-2", "song-3", "song-4", "song-0" ] );
        assert_eq!( ids( manager.shuffled_queue() ), shuffled_before );
        assert!( !manager.move_context_queue( 0, 9 ) );
    }


    #[test]
    fn test_move_follows_current_item() {
        let mut manager = filled();
        manager.set_current_index( 1 );
        manager.move_context_queue( 1, 3 );
        assert_eq!( manager.current_item().unwrap().id.as_str(), "song-1" );

        manager.move_context_queue( 4, 0 );
        assert_eq!( manager.current_item().unwrap().id.as_str(), "song-1" );
    }


    #[test]
    fn test_user_queue_operations() {
        let mut manager = manager();
        manager.append_user_queue( [ song( 0 ), song( 1 ), song( 2 ) ] );
        manager.set_user_queue_playing( true );
        manager.set_current_index( 2 );

        assert!( manager.move_user_queue( 2, 0 ) );
        assert_eq!( manager.current_item().unwrap().id.as_str(), "song-2" );

        manager.remove_from_user_queue( 1 );
        assert_eq!( ids( manager.user_queue() ), vec![ "song-2", "song-1" ] );

        manager.clear_user_queue();
        assert!( manager.user_queue().is_empty() );
        assert_eq!( manager.current_index(), -1 );
        assert!( manager.current_item().is_none() );
    }


    #[test]
    fn test_every_mutation_commits() {
        let mut manager = filled();
        assert_eq!( manager.store().commit_count(), FILL_COUNT );
        assert_eq!( manager.store().snapshot().normal.len(), FILL_COUNT );
        assert_eq!( manager.store().snapshot().shuffled.len(), FILL_COUNT );

        manager.set_current_index( 3 );
        assert_eq!( manager.store().snapshot().state.current_index, 3 );

        manager.set_shuffle( true );
        assert!( manager.store().snapshot().state.is_shuffle );
        assert_eq!( manager.store().commit_count(), FILL_COUNT + 2 );
    }


    #[test]
    fn test_failed_commit_keeps_memory_state() {
        let mut manager = filled();
        let reports = Collect::default();
        manager.set_reporter( Box::new( reports.clone() ) );
        manager.store_mut().set_fail_commits( true );

        manager.append_context_queue( [ song( 9 ) ] );
        assert_eq!( manager.context_queue().len(), FILL_COUNT + 1 );
        assert_eq!( manager.store().snapshot().normal.len(), FILL_COUNT );
        assert_eq!( reports.0.lock().unwrap().len(), 1 );
    }


    #[test]
    fn test_next_commit_persists_changes_from_failed_commit() {
        let mut manager = PlaybackQueueManager::with_rng( MemoryStore::new(), SmallRng::seed_from_u64( 3 ) );
        manager.set_reporter( Box::new( Collect::default() ) );
        manager.append_context_queue( [ song( 0 ) ] );

        manager.store_mut().set_fail_commits( true );
        manager.append_context_queue( [ song( 1 ) ] );
        manager.store_mut().set_fail_commits( false );

        manager.append_context_queue( [ song( 2 ) ] );
        manager.set_repeat_mode( RepeatMode::Single );
        assert_eq!( manager.store().snapshot().normal.len(), 3 );
        assert_eq!( manager.store().snapshot().shuffled.len(), 3 );

        let expected = ids( manager.normal_queue() );
        let restored = PlaybackQueueManager::restore_with_rng( manager.into_store(), SmallRng::seed_from_u64( 4 ) ).unwrap();
        assert_eq!( ids( restored.normal_queue() ), expected );
        assert_eq!( expected, vec![ "song-0", "song-1", "song-2" ] );
        assert_eq!( restored.repeat_mode(), RepeatMode::Single );
    }


    #[test]
    fn test_restore_round_trip() {
        let mut manager = filled();
        manager.set_shuffle( true );
        manager.append_user_queue( [ song( 20 ) ] );
        manager.set_repeat_mode( RepeatMode::All );
        manager.set_current_index( 2 );
        let normal = ids( manager.normal_queue() );
        let shuffled = ids( manager.shuffled_queue() );

        let store = manager.into_store();
        let restored = PlaybackQueueManager::restore_with_rng( store, SmallRng::seed_from_u64( 5 ) ).unwrap();

        assert!( restored.is_shuffle() );
        assert_eq!( restored.repeat_mode(), RepeatMode::All );
        assert_eq!( restored.current_index(), 2 );
        assert_eq!( ids( restored.normal_queue() ), normal );
        assert_eq!( ids( restored.shuffled_queue() ), shuffled );
        assert_eq!( ids( restored.user_queue() ), vec![ "song-20" ] );
    }


    #[test]
    fn test_restore_repairs_drifted_positions() {
        let stored = |n: usize, position: usize| StoredEntry {
            id: EntryId( n as u64 ),
            playable: song( n ),
            position,
        };
        let snapshot = StoreSnapshot {
            normal: vec![ stored( 0, 0 ), stored( 1, 4 ), stored( 2, 9 ) ],
            ..StoreSnapshot::default()
        };

        let restored = PlaybackQueueManager::restore_with_rng(
            MemoryStore::with_snapshot( snapshot ),
            SmallRng::seed_from_u64( 5 ),
        ).unwrap();

        let positions: Vec<usize> = restored.normal_queue().entries().iter().map( |e| e.position() ).collect();
        assert_eq!( positions, vec![ 0, 1, 2 ] );
        assert_eq!( restored.shuffled_queue().len(), 3 );

        let mut committed: Vec<usize> = restored.store().snapshot().normal.iter().map( |e| e.position ).collect();
        committed.sort();
        assert_eq!( committed, vec![ 0, 1, 2 ] );
        assert_eq!( restored.store().snapshot().shuffled.len(), 3 );
    }


    #[test]
    fn test_next_and_previous_index() {
        let mut manager = filled();
        manager.set_current_index( 4 );
        assert_eq!( manager.next_index( false ), None );
        assert_eq!( manager.previous_index( false ), Some( 3 ) );

        manager.set_repeat_mode( RepeatMode::All );
        assert_eq!( manager.next_index( false ), Some( 0 ) );
        manager.set_current_index( 0 );
        assert_eq!( manager.previous_index( false ), Some( 4 ) );

        manager.set_repeat_mode( RepeatMode::Single );
        assert_eq!( manager.next_index( false ), Some( 0 ) );
        assert_eq!( manager.previous_index( false ), Some( 0 ) );
    }


    #[test]
    fn test_offline_navigation_skips_uncached() {
        let mut manager = manager();
        manager.append_context_queue( ( 0..6 ).map( |n| song( n ).cached( matches!( n, 1 | 3 | 4 ) ) ) );

        manager.set_current_index( 1 );
        assert_eq!( manager.advance( true ).unwrap().id.as_str(), "song-3" );
        assert_eq!( manager.advance( true ).unwrap().id.as_str(), "song-4" );
        assert!( manager.advance( true ).is_none() );
        assert_eq!( manager.current_index(), 4 );

        manager.set_repeat_mode( RepeatMode::All );
        assert_eq!( manager.advance( true ).unwrap().id.as_str(), "song-1" );
        assert_eq!( manager.go_back( true ).unwrap().id.as_str(), "song-4" );
        assert_eq!( manager.go_back( true ).unwrap().id.as_str(), "song-3" );
    }


    #[test]
    fn test_user_queue_navigation_starts_before_first() {
        let mut manager = manager();
        manager.append_user_queue( [ song( 0 ), song( 1 ) ] );
        manager.set_user_queue_playing( true );
        manager.set_current_index( -1 );

        assert_eq!( manager.advance( false ).unwrap().id.as_str(), "song-0" );
        assert_eq!( manager.advance( false ).unwrap().id.as_str(), "song-1" );
        assert!( manager.advance( false ).is_none() );
    }


    #[test]
    fn test_ensure_consistent_order_without_drift() {
        let mut manager = filled();
        let commits = manager.store().commit_count();
        assert!( !manager.ensure_consistent_order() );
        assert_eq!( manager.store().commit_count(), commits );
    }


    proptest::proptest! {
        #[test]
        fn views_stay_in_sync(
            ops in proptest::collection::vec( ( 0u8..8, 0usize..10, 0usize..10 ), 1..150 )
        ) {
            let mut manager = manager();
            let mut next = 0;

            for ( op, a, b ) in ops {
                match op {
                    0 | 1 => {
                        manager.append_context_queue( [ song( next ) ] );
                        next += 1;
                    }
                    2 => {
                        manager.remove_from_context_queue( a );
                    }
                    3 => {
                        manager.move_context_queue( a, b );
                    }
                    4 => manager.set_shuffle( !manager.is_shuffle() ),
                    5 => manager.set_current_index( a as i64 - 2 ),
                    6 => manager.set_user_queue_playing( !manager.is_user_queue_playing() ),
                    _ => manager.append_user_queue( [ song( 100 + a ) ] ),
                }

                prop_assert_eq!( sorted_ids( manager.normal_queue() ), sorted_ids( manager.shuffled_queue() ) );

                let index = manager.current_index();
                if manager.is_user_queue_playing() {
                    prop_assert!( index >= -1 && index < manager.user_queue().len() as i64 );
                } else {
                    prop_assert!( index >= 0 );
                    prop_assert!( manager.context_queue().is_empty() || index < manager.context_queue().len() as i64 );
                }
            }

            manager.ensure_consistent_order();
            for queue in [ manager.normal_queue(), manager.shuffled_queue(), manager.user_queue() ] {
                let positions: Vec<usize> = queue.entries().iter().map( |e| e.position() ).collect();
                prop_assert_eq!( positions, ( 0..queue.len() ).collect::<Vec<_>>() );
            }
        }
    }
}
