//! Command-line argument parsing for Quaver.

use std::path::PathBuf;

use clap::Parser;


/// Quaver - inspect and edit a persisted playback queue.
#[derive( Parser, Debug )]
#[command( name = "quaver" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Queue snapshot file to open.
    #[arg( short, long )]
    pub store: Option<PathBuf>,

    /// Skip items that are not cached when stepping through the queue.
    #[arg( short, long )]
    pub offline: bool,

    /// Seed for the shuffle order.
    #[arg( long )]
    pub seed: Option<u64>,

    /// Commands to run, separated by ';'. Reads commands from stdin if empty.
    #[arg( trailing_var_arg = true, allow_hyphen_values = true )]
    pub commands: Vec<String>,
}


impl Args {
    /// Splits the trailing arguments into individual command lines.
    pub fn command_lines( &self ) -> Vec<String> {
        self.commands
            .join( " " )
            .split( ';' )
            .map( str::trim )
            .filter( |line| !line.is_empty() )
            .map( String::from )
            .collect()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_command_lines_split_on_semicolon() {
        let args = Args::parse_from( [ "quaver", "--offline", "add", "a;", "index", "-1", ";", "show" ] );
        assert!( args.offline );
        assert_eq!( args.command_lines(), vec![ "add a", "index -1", "show" ] );
    }


    #[test]
    fn test_no_commands() {
        let args = Args::parse_from( [ "quaver", "--seed", "4" ] );
        assert_eq!( args.seed, Some( 4 ) );
        assert!( args.command_lines().is_empty() );
    }
}
