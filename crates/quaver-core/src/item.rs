//! Playable media references
//!
//! The engine never inspects media content. A `Playable` only carries the
//! identity used for comparisons, a little display metadata, and whether the
//! content is available locally.

use std::fmt;

use serde::{ Deserialize, Serialize };


/// Unique identity of a playable item.
#[derive( Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize )]
#[serde( transparent )]
pub struct PlayableId( String );


impl PlayableId {
    pub fn new( id: impl Into<String> ) -> Self {
        Self( id.into() )
    }


    pub fn as_str( &self ) -> &str {
        &self.0
    }
}


impl fmt::Display for PlayableId {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.write_str( &self.0 )
    }
}


impl From<&str> for PlayableId {
    fn from( s: &str ) -> Self {
        Self::new( s )
    }
}


impl From<String> for PlayableId {
    fn from( s: String ) -> Self {
        Self( s )
    }
}


/// A playable item as seen by the queue engine.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
pub struct Playable {
    pub id: PlayableId,
    pub title: String,
    #[serde( default )]
    pub artist: Option<String>,
    #[serde( default )]
    pub album: Option<String>,
    #[serde( default )]
    pub duration_secs: Option<f64>,
    /// Content is stored locally and can be played offline
    #[serde( default )]
    pub is_cached: bool,
}


impl Playable {
    /// Creates a playable with the given identity and title.
    pub fn new( id: impl Into<PlayableId>, title: impl Into<String> ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            album: None,
            duration_secs: None,
            is_cached: false,
        }
    }


    pub fn with_artist( mut self, artist: impl Into<String> ) -> Self {
        self.artist = Some( artist.into() );
        self
    }


    pub fn cached( mut self, is_cached: bool ) -> Self {
        self.is_cached = is_cached;
        self
    }


    /// Identity comparison. Metadata is ignored.
    pub fn is_same( &self, other: &Playable ) -> bool {
        self.id == other.id
    }


    /// Returns "artist - title", or just the title when no artist is known.
    pub fn display_name( &self ) -> String {
        match &self.artist {
            Some( artist ) => format!( "{} - {}", artist, self.title ),
            None => self.title.clone(),
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_identity_ignores_metadata() {
        let a = Playable::new( "song-1", "First" ).cached( true );
        let b = Playable::new( "song-1", "Renamed" ).with_artist( "Someone" );
        let c = Playable::new( "song-2", "First" );

        assert!( a.is_same( &b ) );
        assert!( !a.is_same( &c ) );
    }


    #[test]
    fn test_display_name() {
        let plain = Playable::new( "x", "Title" );
        assert_eq!( plain.display_name(), "Title" );

        let with_artist = plain.with_artist( "Band" );
        assert_eq!( with_artist.display_name(), "Band - Title" );
    }
}
