//! Text rendering of queue state.

use quaver_core::{ OrderedPlaylist, PlaybackQueueManager, QueueStore };


/// Renders the status line, the active context view and the user queue.
pub fn render_queues<S: QueueStore>( manager: &PlaybackQueueManager<S> ) -> String {
    let current = manager.current_index();
    let mut lines = vec![ format!(
        "Shuffle: {} | Repeat: {} | Playing from: {} | Index: {}",
        if manager.is_shuffle() { "on" } else { "off" },
        manager.repeat_mode().name(),
        if manager.is_user_queue_playing() { "user queue" } else { "context" },
        current,
    ) ];

    let context_marker = ( !manager.is_user_queue_playing() ).then_some( current );
    let user_marker = manager.is_user_queue_playing().then_some( current );

    lines.extend( render_playlist( manager.context_queue(), context_marker ) );
    lines.extend( render_playlist( manager.user_queue(), user_marker ) );

    let mut out = lines.join( "\n" );
    out.push( '\n' );
    out
}


/// One header line, then one line per entry in position order.
fn render_playlist( playlist: &OrderedPlaylist, current: Option<i64> ) -> Vec<String> {
    let mut lines = vec![ format!( "{} ({}):", playlist.kind().name(), playlist.len() ) ];

    if playlist.is_empty() {
        lines.push( "  (empty)".to_string() );
        return lines;
    }

    for ( index, entry ) in playlist.entries().into_iter().enumerate() {
        let marker = if current == Some( index as i64 ) { '>' } else { ' ' };
        let cached = if entry.playable().is_cached { '*' } else { ' ' };
        lines.push( format!(
            "{} {:>3}{} {}",
            marker,
            entry.position(),
            cached,
            entry.playable().display_name(),
        ) );
    }
    lines
}


#[cfg( test )]
mod tests {
    use super::*;

    use quaver_core::{ MemoryStore, Playable };


    #[test]
    fn test_render_marks_current_and_cached() {
        let mut manager = PlaybackQueueManager::new( MemoryStore::new() );
        manager.append_context_queue( [
            Playable::new( "a", "Alpha" ),
            Playable::new( "b", "Beta" ).cached( true ),
        ] );
        manager.set_current_index( 1 );

        let text = render_queues( &manager );
        assert!( text.starts_with( "Shuffle: off | Repeat: off | Playing from: context | Index: 1\n" ) );
        assert!( text.contains( "Context (2):\n" ) );
        assert!( text.contains( "    0  Alpha\n" ) );
        assert!( text.contains( ">   1* Beta\n" ) );
        assert!( text.contains( "User queue (0):\n  (empty)\n" ) );
    }


    #[test]
    fn test_render_marks_user_queue_when_playing() {
        let mut manager = PlaybackQueueManager::new( MemoryStore::new() );
        manager.append_context_queue( [ Playable::new( "a", "Alpha" ) ] );
        manager.append_user_queue( [ Playable::new( "u", "Up Next" ) ] );
        manager.set_user_queue_playing( true );
        manager.set_current_index( 0 );

        let lines = render_playlist( manager.user_queue(), Some( manager.current_index() ) );
        assert_eq!( lines, vec![ "User queue (1):", ">   0  Up Next" ] );

        let text = render_queues( &manager );
        assert!( text.contains( "Playing from: user queue | Index: 0\n" ) );
        assert!( text.contains( "    0  Alpha\n" ) );
        assert!( text.ends_with( ">   0  Up Next\n" ) );
    }
}
