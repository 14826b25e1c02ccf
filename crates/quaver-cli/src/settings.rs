//! Application settings management
//!
//! Handles persistent settings for the default store location and offline
//! navigation.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };


/// Application settings.
#[derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Skip items that are not cached when stepping through the queue
    pub offline_mode: bool,

    /// Queue snapshot file used when `--store` is not given
    pub store_path: Option<PathBuf>,
}


impl Settings {
    /// Returns the path to the settings file.
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "quaver" ).join( "settings.json" ) )
    }


    /// Default queue snapshot location in the local data directory.
    pub fn default_store_path() -> Option<PathBuf> {
        dirs::data_local_dir().map( |d| d.join( "quaver" ).join( "queue.json" ) )
    }


    /// Loads settings from disk, or returns defaults if not found.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some( path ) => Self::load_from( &path ),
            None => Self::default(),
        }
    }


    /// Loads settings from `path`, falling back to defaults.
    pub fn load_from( path: &Path ) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( path ) {
            Ok( contents ) => {
                serde_json::from_str( &contents ).unwrap_or_else( |e| {
                    tracing::warn!( "Ignoring malformed settings {:?}: {}", path, e );
                    Self::default()
                } )
            }
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Saves settings to disk.
    pub fn save( &self ) {
        if let Some( path ) = Self::settings_path() {
            self.save_to( &path );
        }
    }


    /// Saves settings to `path`.
    pub fn save_to( &self, path: &Path ) {
        // Create parent directory if needed
        if let Some( parent ) = path.parent() {
            if !parent.exists() {
                if let Err( e ) = fs::create_dir_all( parent ) {
                    tracing::warn!( "Failed to create settings directory: {}", e );
                    return;
                }
            }
        }

        match serde_json::to_string_pretty( self ) {
            Ok( json ) => {
                if let Err( e ) = fs::write( path, json ) {
                    tracing::warn!( "Failed to save settings: {}", e );
                }
            }
            Err( e ) => {
                tracing::warn!( "Failed to serialize settings: {}", e );
            }
        }
    }


    /// Resolves the store path: explicit argument, then settings, then default.
    pub fn resolve_store_path( &self, explicit: Option<PathBuf> ) -> Option<PathBuf> {
        explicit
            .or_else( || self.store_path.clone() )
            .or_else( Self::default_store_path )
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use tempfile::tempdir;


    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().expect( "tempdir" );
        let path = dir.path().join( "conf" ).join( "settings.json" );

        let settings = Settings {
            offline_mode: true,
            store_path: Some( PathBuf::from( "/tmp/q.json" ) ),
        };
        settings.save_to( &path );

        assert_eq!( Settings::load_from( &path ), settings );
    }


    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().expect( "tempdir" );
        let path = dir.path().join( "settings.json" );
        fs::write( &path, r#"{ "offline_mode": true }"# ).unwrap();

        let settings = Settings::load_from( &path );
        assert!( settings.offline_mode );
        assert!( settings.store_path.is_none() );
    }


    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempdir().expect( "tempdir" );
        let path = dir.path().join( "settings.json" );
        fs::write( &path, "{" ).unwrap();

        assert_eq!( Settings::load_from( &path ), Settings::default() );
    }


    #[test]
    fn test_explicit_store_path_wins() {
        let settings = Settings {
            offline_mode: false,
            store_path: Some( PathBuf::from( "from-settings.json" ) ),
        };

        assert_eq!(
            settings.resolve_store_path( Some( PathBuf::from( "explicit.json" ) ) ),
            Some( PathBuf::from( "explicit.json" ) ),
        );
        assert_eq!(
            settings.resolve_store_path( None ),
            Some( PathBuf::from( "from-settings.json" ) ),
        );
    }
}
