use rand::SeedableRng;
use rand::rngs::SmallRng;
use tempfile::tempdir;

use quaver_core::{ CachedNavigationIndex, JsonStore, PlaybackQueueManager, Playable, RepeatMode };


fn song( n: usize ) -> Playable {
    Playable::new( format!( "song-{}", n ), format!( "Song {}", n ) )
        .cached( matches!( n, 1 | 3 | 4 ) )
}


fn ids<S: quaver_core::QueueStore>( manager: &PlaybackQueueManager<S> ) -> Vec<String> {
    manager.context_queue()
        .playables()
        .iter()
        .map( |p| p.id.to_string() )
        .collect()
}


#[test]
fn session_survives_reopen() {
    let dir = tempdir().expect( "tempdir" );
    let path = dir.path().join( "queue.json" );

    let store = JsonStore::open( &path ).expect( "open" );
    let mut manager = PlaybackQueueManager::with_rng( store, SmallRng::seed_from_u64( 1 ) );
    manager.append_context_queue( ( 0..6 ).map( song ) );
    manager.append_user_queue( [ song( 40 ) ] );
    manager.set_shuffle( true );
    manager.set_repeat_mode( RepeatMode::Single );
    manager.set_current_index( 3 );
    let shuffled = ids( &manager );
    drop( manager );

    let store = JsonStore::open( &path ).expect( "reopen" );
    let mut restored = PlaybackQueueManager::restore_with_rng( store, SmallRng::seed_from_u64( 2 ) )
        .expect( "restore" );

    assert!( restored.is_shuffle() );
    assert_eq!( restored.repeat_mode(), RepeatMode::Single );
    assert_eq!( restored.current_index(), 3 );
    assert_eq!( ids( &restored ), shuffled );
    assert_eq!( restored.user_queue().len(), 1 );

    restored.set_shuffle( false );
    let expected: Vec<String> = ( 0..6 ).map( |n| format!( "song-{}", n ) ).collect();
    assert_eq!( ids( &restored ), expected );
}


#[test]
fn shuffle_toggles_preserve_append_order() {
    let mut manager = PlaybackQueueManager::with_rng(
        quaver_core::MemoryStore::new(),
        SmallRng::seed_from_u64( 9 ),
    );
    manager.append_context_queue( ( 0..5 ).map( song ) );
    manager.append_context_queue( [ song( 5 ) ] );

    manager.set_shuffle( true );
    manager.append_context_queue( [ song( 6 ) ] );
    manager.set_shuffle( false );
    manager.set_shuffle( true );
    manager.set_shuffle( false );

    let expected: Vec<String> = ( 0..7 ).map( |n| format!( "song-{}", n ) ).collect();
    assert_eq!( ids( &manager ), expected );

    let positions: Vec<usize> = manager.context_queue().entries().iter().map( |e| e.position() ).collect();
    assert_eq!( positions, ( 0..7 ).collect::<Vec<_>>() );
}


#[test]
fn navigation_index_over_active_view() {
    let mut manager = PlaybackQueueManager::new( quaver_core::MemoryStore::new() );
    manager.append_context_queue( ( 0..6 ).map( song ) );

    let index = CachedNavigationIndex::new( manager.context_queue() );
    assert_eq!( index.previous_available( 4 ), Some( 3 ) );
    assert_eq!( index.next_available( 1 ), Some( 3 ) );
    assert_eq!( index.next_available( 4 ), None );
}
