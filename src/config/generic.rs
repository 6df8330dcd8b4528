//! Numeric class configuration: the class count, then one unsigned integer
//! per class (a priority for SPQ, a quantum for DRR). Values are whitespace
//! separated and `#` starts a comment.

use std::path::Path;

use tracing::{info, warn};

use super::{ClassParams, ConfigError, read_file};

fn tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().flat_map(|(i, line)| {
        let line = line.split('#').next().unwrap_or("");
        line.split_whitespace().map(move |tok| (i + 1, tok))
    })
}

fn parse_int(line: usize, token: &str) -> Result<u32, ConfigError> {
    token.parse().map_err(|_| ConfigError::InvalidInteger {
        line,
        token: token.to_string(),
    })
}

pub fn parse(text: &str) -> Result<ClassParams, ConfigError> {
    let mut tokens = tokens(text);

    let (line, token) = tokens.next().ok_or(ConfigError::MissingClassCount)?;
    let count = parse_int(line, token)? as usize;

    let mut params = Vec::new();
    for _ in 0..count {
        let Some((line, token)) = tokens.next() else {
            return Err(ConfigError::MissingParameter {
                expected: count,
                found: params.len(),
            });
        };
        params.push(parse_int(line, token)?);
    }

    let trailing = tokens.count();
    if trailing > 0 {
        warn!(trailing, "ignoring values after the last class parameter");
    }

    Ok(ClassParams::new(params))
}

pub fn load(path: impl AsRef<Path>) -> Result<ClassParams, ConfigError> {
    let path = path.as_ref();
    let params = parse(&read_file(path)?)?;
    info!(path = %path.display(), classes = params.count(), "loaded class configuration");
    Ok(params)
}
