//! Command execution against a queue manager.

use quaver_core::command::help_text;
use quaver_core::{ Command, PlaybackQueueManager, QueueStore };

use crate::view;


/// Result of executing one command.
#[derive( Debug, Clone, PartialEq )]
pub enum Outcome {
    Continue( Option<String> ),
    Quit,
}


/// Executes a parsed command.
///
/// @param offline - Skip items that are not cached on next/prev
pub fn execute<S: QueueStore>(
    manager: &mut PlaybackQueueManager<S>,
    command: &Command,
    offline: bool,
) -> Outcome {
    let message = match command {
        Command::Add { .. } => {
            let playable = command.playable();
            manager.append_context_queue( playable );
            None
        }
        Command::Queue { .. } => {
            let playable = command.playable();
            manager.append_user_queue( playable );
            None
        }
        Command::Remove { index } => Some( match manager.remove_from_context_queue( *index ) {
            Some( p ) => format!( "Removed {}", p.display_name() ),
            None => format!( "No context item at {}", index ),
        } ),
        Command::Unqueue { index } => Some( match manager.remove_from_user_queue( *index ) {
            Some( p ) => format!( "Removed {}", p.display_name() ),
            None => format!( "No user queue item at {}", index ),
        } ),
        Command::Move { from, to } => {
            if manager.move_context_queue( *from, *to ) {
                None
            } else {
                Some( "Nothing moved".to_string() )
            }
        }
        Command::Clear => {
            manager.remove_all_items();
            Some( "Queues cleared".to_string() )
        }
        Command::Repair => Some( if manager.ensure_consistent_order() {
            "Positions repaired".to_string()
        } else {
            "Positions already consistent".to_string()
        } ),
        Command::Shuffle { enabled } => {
            let shuffle = enabled.unwrap_or( !manager.is_shuffle() );
            manager.set_shuffle( shuffle );
            Some( format!( "Shuffle: {}", if shuffle { "on" } else { "off" } ) )
        }
        Command::Repeat { mode } => {
            let repeat = mode.unwrap_or( manager.repeat_mode().next() );
            manager.set_repeat_mode( repeat );
            Some( format!( "Repeat: {}", repeat.name() ) )
        }
        Command::User { enabled } => {
            let playing = enabled.unwrap_or( !manager.is_user_queue_playing() );
            manager.set_user_queue_playing( playing );
            Some( format!( "Playing from: {}", if playing { "user queue" } else { "context" } ) )
        }
        Command::Index { index } => {
            manager.set_current_index( *index );
            Some( format!( "Index: {}", manager.current_index() ) )
        }
        Command::Next => Some( match manager.advance( offline ) {
            Some( p ) => format!( "Now playing: {}", p.display_name() ),
            None => "End of queue".to_string(),
        } ),
        Command::Prev => Some( match manager.go_back( offline ) {
            Some( p ) => format!( "Now playing: {}", p.display_name() ),
            None => "Start of queue".to_string(),
        } ),
        Command::Show => Some( view::render_queues( manager ) ),
        Command::Help => Some( help_text().to_string() ),
        Command::Quit => return Outcome::Quit,
    };

    Outcome::Continue( message )
}


/// Parses and executes one input line. Blank lines and `#` comments are skipped.
pub fn execute_line<S: QueueStore>(
    manager: &mut PlaybackQueueManager<S>,
    line: &str,
    offline: bool,
) -> Outcome {
    let line = line.trim();
    if line.is_empty() || line.starts_with( '#' ) {
        return Outcome::Continue( None );
    }

    match Command::parse( line ) {
        Ok( cmd ) => {
            tracing::debug!( "Executing {:?}", cmd );
            execute( manager, &cmd, offline )
        }
        Err( e ) => Outcome::Continue( Some( format!( "Error: {}", e ) ) ),
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use quaver_core::MemoryStore;


    fn run( manager: &mut PlaybackQueueManager<MemoryStore>, line: &str ) -> Option<String> {
        match execute_line( manager, line, false ) {
            Outcome::Continue( message ) => message,
            Outcome::Quit => panic!( "unexpected quit" ),
        }
    }


    #[test]
    fn test_add_and_navigate() {
        let mut manager = PlaybackQueueManager::new( MemoryStore::new() );
        run( &mut manager, "add a Alpha" );
        run( &mut manager, "add b Beta" );

        assert_eq!( run( &mut manager, "next" ).as_deref(), Some( "Now playing: Beta" ) );
        assert_eq!( run( &mut manager, "next" ).as_deref(), Some( "End of queue" ) );
        assert_eq!( run( &mut manager, "prev" ).as_deref(), Some( "Now playing: Alpha" ) );
    }


    #[test]
    fn test_index_contract_through_commands() {
        let mut manager = PlaybackQueueManager::new( MemoryStore::new() );
        for id in [ "a", "b", "c" ] {
            run( &mut manager, &format!( "add {}", id ) );
        }

        assert_eq!( run( &mut manager, "index 5" ).as_deref(), Some( "Index: 0" ) );
        run( &mut manager, "user on" );
        assert_eq!( run( &mut manager, "index -5" ).as_deref(), Some( "Index: -1" ) );
    }


    #[test]
    fn test_toggles_and_errors() {
        let mut manager = PlaybackQueueManager::new( MemoryStore::new() );

        assert_eq!( run( &mut manager, "shuffle" ).as_deref(), Some( "Shuffle: on" ) );
        assert_eq!( run( &mut manager, "repeat" ).as_deref(), Some( "Repeat: all" ) );
        assert_eq!( run( &mut manager, "remove 3" ).as_deref(), Some( "No context item at 3" ) );
        assert!( run( &mut manager, "bogus" ).unwrap().starts_with( "Error: Unknown command" ) );
        assert_eq!( run( &mut manager, "# comment" ), None );
        assert_eq!( execute_line( &mut manager, "quit", false ), Outcome::Quit );
    }


    #[test]
    fn test_offline_next_skips_uncached() {
        let mut manager = PlaybackQueueManager::new( MemoryStore::new() );
        run( &mut manager, "add a" );
        run( &mut manager, "add b" );
        run( &mut manager, "add c C cached" );

        let outcome = execute_line( &mut manager, "next", true );
        assert_eq!( outcome, Outcome::Continue( Some( "Now playing: C".to_string() ) ) );
    }
}
