//! Job command parser
//!
//! Line-oriented parser for `.job` command scripts.
//!
//! ## Command Language
//! ```text
//! WRITE [(key,value)(key2,value2)...]
//! READ [key,key2,...]
//! DELETE [key,key2,...]
//! SHOW
//! WAIT <delay_ms>
//! BACKUP
//! HELP
//! ```
//! Empty lines are ignored; anything else parses to [`JobCommand::Invalid`]
//! and the script keeps going.

/// One parsed line of a job script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCommand {
    /// Batch upsert of key/value pairs
    Write { pairs: Vec<(String, String)> },

    /// Batch lookup
    Read { keys: Vec<String> },

    /// Batch removal
    Delete { keys: Vec<String> },

    /// List the whole key space
    Show,

    /// Suspend the executing worker
    Wait { millis: u64 },

    /// Snapshot the key space
    Backup,

    /// Usage text
    Help,

    /// Blank line
    Empty,

    /// Anything that did not parse
    Invalid,
}

/// Parse one line of a job script
pub fn parse_line(line: &str) -> JobCommand {
    let line = line.trim();
    if line.is_empty() {
        return JobCommand::Empty;
    }

    let (word, rest) = match line.find(|c: char| c.is_whitespace() || c == '[') {
        Some(pos) => (&line[..pos], line[pos..].trim_start()),
        None => (line, ""),
    };

    match word {
        "WRITE" => parse_pair_list(rest)
            .map(|pairs| JobCommand::Write { pairs })
            .unwrap_or(JobCommand::Invalid),
        "READ" => parse_key_list(rest)
            .map(|keys| JobCommand::Read { keys })
            .unwrap_or(JobCommand::Invalid),
        "DELETE" => parse_key_list(rest)
            .map(|keys| JobCommand::Delete { keys })
            .unwrap_or(JobCommand::Invalid),
        "SHOW" if rest.is_empty() => JobCommand::Show,
        "WAIT" => rest
            .parse::<u64>()
            .map(|millis| JobCommand::Wait { millis })
            .map_err(|_| ())
            .unwrap_or(JobCommand::Invalid),
        "BACKUP" if rest.is_empty() => JobCommand::Backup,
        "HELP" if rest.is_empty() => JobCommand::Help,
        _ => JobCommand::Invalid,
    }
}

/// Strip the surrounding `[` `]` of a list argument
fn strip_brackets(text: &str) -> Option<&str> {
    text.strip_prefix('[')?.strip_suffix(']')
}

/// Parse `[(k,v)(k2,v2)...]`; pairs may be separated by whitespace
fn parse_pair_list(text: &str) -> Option<Vec<(String, String)>> {
    let mut rest = strip_brackets(text)?.trim();
    let mut pairs = Vec::new();

    while !rest.is_empty() {
        let body_end = rest.strip_prefix('(')?.find(')')?;
        let body = &rest[1..1 + body_end];
        let (key, value) = body.split_once(',')?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() || value.contains(',') {
            return None;
        }
        pairs.push((key.to_owned(), value.to_owned()));
        rest = rest[body_end + 2..].trim_start();
    }

    if pairs.is_empty() {
        return None;
    }
    Some(pairs)
}

/// Parse `[k,k2,...]`
fn parse_key_list(text: &str) -> Option<Vec<String>> {
    let inner = strip_brackets(text)?.trim();
    if inner.is_empty() {
        return None;
    }

    let mut keys = Vec::new();
    for key in inner.split(',') {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        keys.push(key.to_owned());
    }
    Some(keys)
}
