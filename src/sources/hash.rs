// Hash computation utilities

use crate::error::{KpmError, Result};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Lowercase hex SHA-1 of `data`
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Lowercase hex SHA-1 of a file's contents, read in chunks
pub fn file_sha1(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| KpmError::fs(path, e))?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(|e| KpmError::fs(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Digest from a `.sha1` companion file, which may be followed by a file name
pub fn parse_digest_file(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}
