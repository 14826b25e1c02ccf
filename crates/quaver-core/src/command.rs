//! Queue command parsing.
//!
//! Commands are short text lines such as `add song-1 Intro cached` or
//! `move 0 3`. A leading `/` is accepted and ignored, so the same syntax
//! works for slash-style input.

use std::str::FromStr;

use thiserror::Error;

use crate::item::Playable;
use crate::queue::RepeatMode;


/// Errors that can occur during command parsing.
#[derive( Debug, Error )]
pub enum CommandError {
    #[error( "Unknown command: {0}" )]
    Unknown( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),
}


/// Parsed queue command.
#[derive( Debug, Clone, PartialEq )]
pub enum Command {
    // Queue contents
    Add { id: String, title: Option<String>, cached: bool },
    Queue { id: String, title: Option<String>, cached: bool },
    Remove { index: usize },
    Unqueue { index: usize },
    Move { from: usize, to: usize },
    Clear,
    Repair,

    // Playback state
    Shuffle { enabled: Option<bool> },
    Repeat { mode: Option<RepeatMode> },
    User { enabled: Option<bool> },
    Index { index: i64 },
    Next,
    Prev,

    // Output
    Show,
    Help,
    Quit,
}


impl FromStr for RepeatMode {
    type Err = CommandError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Ok( RepeatMode::Off ),
            "all" | "1" => Ok( RepeatMode::All ),
            "single" | "one" | "2" => Ok( RepeatMode::Single ),
            _ => Err( CommandError::InvalidArgument(
                format!( "Invalid repeat mode: '{}'. Use 'off', 'all', or 'single'", s )
            )),
        }
    }
}


impl Command {
    /// Parses a command line.
    ///
    /// @param input - The command string to parse
    ///
    /// @returns The parsed command or an error
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim();
        let input = input.strip_prefix( '/' ).unwrap_or( input );
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or( "" ).to_lowercase();
        let args: Vec<&str> = parts.collect();

        match cmd.as_str() {
            "add" | "a" => {
                let ( id, title, cached ) = parse_item( &args )?;
                Ok( Command::Add { id, title, cached } )
            }
            "queue" | "q" => {
                let ( id, title, cached ) = parse_item( &args )?;
                Ok( Command::Queue { id, title, cached } )
            }
            "remove" | "rm" | "del" => Ok( Command::Remove { index: parse_index( args.first(), "index" )? } ),
            "unqueue" | "urm" => Ok( Command::Unqueue { index: parse_index( args.first(), "index" )? } ),
            "move" | "mv" => {
                let from = parse_index( args.first(), "from index" )?;
                let to = parse_index( args.get( 1 ), "to index" )?;
                Ok( Command::Move { from, to } )
            }
            "clear" | "cl" => Ok( Command::Clear ),
            "repair" | "fix" => Ok( Command::Repair ),

            "shuffle" | "sh" => Ok( Command::Shuffle { enabled: args.first().map( |s| parse_toggle( s ) ).transpose()? } ),
            "repeat" | "rep" => Ok( Command::Repeat { mode: args.first().map( |s| s.parse() ).transpose()? } ),
            "user" | "uq" => Ok( Command::User { enabled: args.first().map( |s| parse_toggle( s ) ).transpose()? } ),
            "index" | "i" => {
                let raw = args.first()
                    .ok_or_else( || CommandError::MissingArgument( "index".into() ) )?;
                let index = raw.parse()
                    .map_err( |_| CommandError::InvalidArgument( format!( "Invalid index: {}", raw ) ) )?;
                Ok( Command::Index { index } )
            }
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "pr" => Ok( Command::Prev ),

            "show" | "ls" | "list" => Ok( Command::Show ),
            "help" | "h" | "?" => Ok( Command::Help ),
            "quit" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::Unknown( "empty command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }


    /// Builds the playable described by an `add` or `queue` command.
    pub fn playable( &self ) -> Option<Playable> {
        match self {
            Command::Add { id, title, cached } | Command::Queue { id, title, cached } => {
                let title = title.clone().unwrap_or_else( || id.clone() );
                Some( Playable::new( id.as_str(), title ).cached( *cached ) )
            }
            _ => None,
        }
    }
}


/// Parses `<id> [title words...] [cached]`.
fn parse_item( args: &[&str] ) -> Result<( String, Option<String>, bool ), CommandError> {
    let ( id, rest ) = args.split_first()
        .ok_or_else( || CommandError::MissingArgument( "item id".into() ) )?;

    let ( rest, cached ) = match rest.split_last() {
        Some(( last, init )) if last.eq_ignore_ascii_case( "cached" ) => ( init, true ),
        _ => ( rest, false ),
    };

    let title = if rest.is_empty() { None } else { Some( rest.join( " " ) ) };
    Ok(( id.to_string(), title, cached ))
}


fn parse_index( arg: Option<&&str>, name: &str ) -> Result<usize, CommandError> {
    let raw = arg.ok_or_else( || CommandError::MissingArgument( name.into() ) )?;
    raw.parse()
        .map_err( |_| CommandError::InvalidArgument( format!( "Invalid {}: {}", name, raw ) ) )
}


fn parse_toggle( s: &str ) -> Result<bool, CommandError> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok( true ),
        "off" | "false" | "0" | "no" => Ok( false ),
        _ => Err( CommandError::InvalidArgument( format!( "Expected on/off, got '{}'", s ) ) ),
    }
}


/// Returns help text listing all available commands.
pub fn help_text() -> &'static str {
    r#"Queue Commands:
  add <id> [title] [cached]    Append to context queue
  queue <id> [title] [cached]  Append to user queue
  remove <index>               Remove from context queue
  unqueue <index>              Remove from user queue
  move <from> <to>             Move within context queue
  clear                        Clear all queues
  repair                       Repair item positions

Playback Commands:
  shuffle [on|off]             Toggle shuffle
  repeat [off|all|single]      Set or cycle repeat mode
  user [on|off]                Play from user queue
  index <n>                    Set current index
  next                         Next item
  prev                         Previous item

Other Commands:
  show                         Show queues
  help                         Show this help
  quit                         Exit"#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_add() {
        let cmd = Command::parse( "add song-1" ).unwrap();
        assert_eq!( cmd, Command::Add { id: "song-1".into(), title: None, cached: false } );
    }


    #[test]
    fn test_parse_add_with_title_and_cached() {
        let cmd = Command::parse( "/a song-1 Long Title Here cached" ).unwrap();
        assert_eq!( cmd, Command::Add {
            id: "song-1".into(),
            title: Some( "Long Title Here".into() ),
            cached: true,
        } );

        let playable = cmd.playable().unwrap();
        assert_eq!( playable.title, "Long Title Here" );
        assert!( playable.is_cached );
    }


    #[test]
    fn test_playable_defaults_title_to_id() {
        let cmd = Command::parse( "queue abc" ).unwrap();
        assert_eq!( cmd.playable().unwrap().title, "abc" );
        assert!( Command::Clear.playable().is_none() );
    }


    #[test]
    fn test_parse_move() {
        let cmd = Command::parse( "move 0 3" ).unwrap();
        assert_eq!( cmd, Command::Move { from: 0, to: 3 } );
    }


    #[test]
    fn test_parse_negative_index() {
        let cmd = Command::parse( "index -1" ).unwrap();
        assert_eq!( cmd, Command::Index { index: -1 } );
    }


    #[test]
    fn test_parse_repeat_with_mode() {
        let cmd = Command::parse( "repeat single" ).unwrap();
        assert_eq!( cmd, Command::Repeat { mode: Some( RepeatMode::Single ) } );
    }


    #[test]
    fn test_parse_repeat_toggle() {
        let cmd = Command::parse( "repeat" ).unwrap();
        assert_eq!( cmd, Command::Repeat { mode: None } );
    }


    #[test]
    fn test_parse_shuffle_toggle() {
        assert_eq!( Command::parse( "shuffle on" ).unwrap(), Command::Shuffle { enabled: Some( true ) } );
        assert_eq!( Command::parse( "sh" ).unwrap(), Command::Shuffle { enabled: None } );
        assert!( matches!( Command::parse( "shuffle maybe" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_unknown() {
        let result = Command::parse( "foobar" );
        assert!( matches!( result, Err( CommandError::Unknown( _ ) ) ) );
    }


    #[test]
    fn test_parse_missing_arg() {
        assert!( matches!( Command::parse( "add" ), Err( CommandError::MissingArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "move 1" ), Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_invalid_index() {
        let result = Command::parse( "remove x" );
        assert!( matches!( result, Err( CommandError::InvalidArgument( _ ) ) ) );
    }
}
