//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::{fs::read_to_string, path::{Path, PathBuf}};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (IMAGEBOT_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file {0:?}: {1}")]
    DeserialiseError(PathBuf, toml::de::Error)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `$IMAGEBOT_SW_ROOT/params` directory.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    // Get the params dir
    let mut path = crate::host::get_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_from_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>
{
    let path = path.as_ref();

    // Load the file into a string
    let params_str = read_to_string(path)
        .map_err(|e| LoadError::FileLoadError(path.to_path_buf(), e))?;

    from_str(&params_str)
        .map_err(|e| LoadError::DeserialiseError(path.to_path_buf(), e))
}

/// Parse parameters from a TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, toml::de::Error>
where
    P: DeserializeOwned
{
    toml::from_str(params_str)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct LinkSection {
        baud_rate: u32,
        #[serde(default)]
        timeout_s: Option<f64>,
    }

    #[derive(Deserialize, Debug)]
    struct TestParams {
        link: LinkSection,
    }

    #[test]
    fn test_load_missing_file() {
        let res: Result<TestParams, _> = load_from_path("does/not/exist.toml");
        assert!(matches!(res, Err(LoadError::FileLoadError(_, _))));
    }

    #[test]
    fn test_from_str() {
        let p: TestParams = from_str("[link]\nbaud_rate = 9600\n").unwrap();
        assert_eq!(p.link, LinkSection { baud_rate: 9600, timeout_s: None });

        let bad: Result<TestParams, _> = from_str("[link]\nbaud_rate = \"fast\"\n");
        assert!(bad.is_err());
    }
}
