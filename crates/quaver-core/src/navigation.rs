//! Offline-aware neighbour lookup
//!
//! A `CachedNavigationIndex` is a read-only snapshot of which positions in a
//! playlist hold playable content. It answers "nearest available entry above
//! or below here" so navigation can skip entries that are not stored locally.

use crate::item::Playable;
use crate::playlist::OrderedPlaylist;


/// Snapshot of the qualifying positions of a playlist.
#[derive( Debug, Clone )]
pub struct CachedNavigationIndex {
    /// Qualifying positions in ascending order
    available: Vec<usize>,
    count: usize,
}


impl CachedNavigationIndex {
    /// Builds an index over the locally cached entries of `playlist`.
    pub fn new( playlist: &OrderedPlaylist ) -> Self {
        Self::with_predicate( playlist, |p| p.is_cached )
    }


    /// Builds an index over the entries accepted by `predicate`.
    pub fn with_predicate<F>( playlist: &OrderedPlaylist, predicate: F ) -> Self
    where
        F: Fn( &Playable ) -> bool,
    {
        let available = playlist.entries()
            .into_iter()
            .filter( |e| predicate( e.playable().as_ref() ) )
            .map( |e| e.position() )
            .collect();

        Self {
            available,
            count: playlist.len(),
        }
    }


    /// Highest qualifying position strictly below `threshold`.
    pub fn previous_available( &self, downwards_from: i64 ) -> Option<usize> {
        if self.available.is_empty() || downwards_from > self.count as i64 {
            return None;
        }

        self.available
            .iter()
            .rev()
            .copied()
            .find( |&position| ( position as i64 ) < downwards_from )
    }


    /// Lowest qualifying position strictly above `threshold`.
    pub fn next_available( &self, upwards_from: i64 ) -> Option<usize> {
        if self.available.is_empty() || upwards_from >= self.count as i64 {
            return None;
        }

        self.available
            .iter()
            .copied()
            .find( |&position| ( position as i64 ) > upwards_from )
    }


    /// Like `previous_available`, but `index` itself qualifies.
    pub fn previous_available_beginning_at( &self, index: i64 ) -> Option<usize> {
        self.previous_available( index + 1 )
    }


    /// Like `next_available`, but `index` itself qualifies.
    pub fn next_available_beginning_at( &self, index: i64 ) -> Option<usize> {
        self.next_available( index - 1 )
    }


    pub fn is_empty( &self ) -> bool {
        self.available.is_empty()
    }
}


#[cfg( test )]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::playlist::QueueKind;


    /// Six entries, cached at positions 1, 3 and 4.
    fn sample() -> OrderedPlaylist {
        let mut playlist = OrderedPlaylist::new( QueueKind::Normal );
        for n in 0..6 {
            let cached = matches!( n, 1 | 3 | 4 );
            playlist.append( Arc::new( Playable::new( format!( "song-{}", n ), "x" ).cached( cached ) ) );
        }
        playlist
    }


    #[test]
    fn test_previous_available() {
        let index = CachedNavigationIndex::new( &sample() );
        assert_eq!( index.previous_available( 4 ), Some( 3 ) );
        assert_eq!( index.previous_available( 6 ), Some( 4 ) );
        assert_eq!( index.previous_available( 1 ), None );
        assert_eq!( index.previous_available( 7 ), None );
    }


    #[test]
    fn test_next_available() {
        let index = CachedNavigationIndex::new( &sample() );
        assert_eq!( index.next_available( 1 ), Some( 3 ) );
        assert_eq!( index.next_available( -1 ), Some( 1 ) );
        assert_eq!( index.next_available( 4 ), None );
        assert_eq!( index.next_available( 6 ), None );
    }


    #[test]
    fn test_beginning_at_includes_current() {
        let index = CachedNavigationIndex::new( &sample() );
        assert_eq!( index.next_available_beginning_at( 3 ), Some( 3 ) );
        assert_eq!( index.next_available_beginning_at( 0 ), Some( 1 ) );
        assert_eq!( index.previous_available_beginning_at( 4 ), Some( 4 ) );
        assert_eq!( index.previous_available_beginning_at( 2 ), Some( 1 ) );
        assert_eq!( index.previous_available_beginning_at( 0 ), None );
    }


    #[test]
    fn test_nothing_cached() {
        let mut playlist = OrderedPlaylist::new( QueueKind::Normal );
        playlist.append( Arc::new( Playable::new( "a", "a" ) ) );

        let index = CachedNavigationIndex::new( &playlist );
        assert!( index.is_empty() );
        assert_eq!( index.next_available( -1 ), None );
        assert_eq!( index.previous_available( 1 ), None );
    }


    #[test]
    fn test_custom_predicate() {
        let playlist = sample();
        let index = CachedNavigationIndex::with_predicate( &playlist, |p| p.id.as_str() == "song-5" );
        assert_eq!( index.next_available( 0 ), Some( 5 ) );
        assert_eq!( index.previous_available( 5 ), None );
    }
}
