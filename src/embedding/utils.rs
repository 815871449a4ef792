use std::io;
use std::path::Path;

use tokenizers::Tokenizer;

use crate::constants::TOKENIZER_FILE_NAME;

/// Loads a tokenizer from a `tokenizer.json` path or a directory containing one.
pub fn load_tokenizer(path: &Path) -> io::Result<Tokenizer> {
    let tokenizer_path = if path.is_dir() {
        path.join(TOKENIZER_FILE_NAME)
    } else {
        path.to_path_buf()
    };

    if !tokenizer_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("tokenizer not found at {}", tokenizer_path.display()),
        ));
    }

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(io::Error::other)?;

    // The oracle rejects over-long inputs itself, so the tokenizer must not
    // silently shorten or pad them.
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(None)
        .map_err(|e| io::Error::other(format!("failed to disable truncation: {}", e)))?;

    Ok(tokenizer)
}
