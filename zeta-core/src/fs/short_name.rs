//! DOS 8.3 short names for long archive entries.

use std::collections::{HashMap, HashSet};

use crate::error::{ZetaError, ZetaResult};

/// Highest `~N` tail tried before giving up on a name.
pub const MAX_ALIAS_ATTEMPTS: u32 = 999;

/// Split a path segment into base and extension at the first period.
/// The extension loses any further periods and is cut to 3 characters.
fn split_segment(segment: &str) -> (&str, String) {
    match segment.find('.') {
        Some(pos) => (
            &segment[..pos],
            segment[pos + 1..].chars().filter(|&c| c != '.').take(3).collect(),
        ),
        None => (segment, String::new()),
    }
}

fn join(base: &str, ext: &str) -> String {
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, ext)
    }
}

/// Check for a `PREFIX~N` base as produced by [`short_name`].
fn is_alias_base(base: &str) -> bool {
    match base.rfind('~') {
        Some(pos) if pos > 0 => {
            let digits = &base[pos + 1..];
            !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
                && base[..pos].chars().count() + digits.len() == 8
        }
        _ => false,
    }
}

/// Whether a single segment already fits the 8.3 shape.
pub fn is_short_segment(segment: &str) -> bool {
    let (base, _) = split_segment(segment);
    let ext_len = segment
        .find('.')
        .map(|pos| segment[pos + 1..].chars().count())
        .unwrap_or(0);
    let dots = segment.matches('.').count();
    ext_len <= 3 && dots <= 1 && (base.chars().count() <= 8 || is_alias_base(base))
}

/// Whether every segment of a `/`-separated path fits the 8.3 shape.
pub fn is_short_path(path: &str) -> bool {
    path.split('/').all(is_short_segment)
}

/// Shorten one path segment to 8.3 form.
///
/// Bases of 8 characters or fewer are kept and only the extension is cut.
/// Longer bases lose their spaces and are replaced by the first `8 - digits`
/// characters followed by `~N`, with N counting up from 1 until `taken`
/// rejects the candidate. Fails once [`MAX_ALIAS_ATTEMPTS`] is exceeded.
///
/// Unlike real DOS, the `~N` tail is not counted against the 8 base
/// characters, so `LONGFILENAME.TXT` becomes `LONGFIL~1.TXT`.
///
/// ```
/// use zeta_core::fs::short_name;
/// assert_eq!(short_name("TOWN.ZZT", |_| false).unwrap(), "TOWN.ZZT");
/// assert_eq!(short_name("LONGFILENAME.TXT", |_| false).unwrap(), "LONGFIL~1.TXT");
/// ```
pub fn short_name(segment: &str, taken: impl Fn(&str) -> bool) -> ZetaResult<String> {
    let (base, ext) = split_segment(segment);
    if base.chars().count() <= 8 || is_alias_base(base) {
        return Ok(join(base, &ext));
    }

    let stripped: String = base.chars().filter(|&c| c != ' ').collect();
    for n in 1..=MAX_ALIAS_ATTEMPTS {
        let digits = n.to_string();
        let keep = 8 - digits.len();
        let prefix: String = stripped.chars().take(keep).collect();
        let candidate = join(&format!("{}~{}", prefix, digits), &ext);
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(ZetaError::NameExhausted(segment.to_string()))
}

/// Bidirectional mapping between stored long keys and their 8.3 aliases.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    short_to_long: HashMap<String, String>,
    long_to_short: HashMap<String, String>,
}

impl AliasTable {
    /// Assign aliases for every key that is not already 8.3.
    ///
    /// Keys are visited in sorted order and names that are already short
    /// are reserved first, so the result depends only on the key set.
    pub fn build<'a, I>(keys: I) -> ZetaResult<Self>
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self::build_reserving(keys, &HashSet::new())
    }

    /// Like [`AliasTable::build`], also avoiding every name in `reserved`.
    pub fn build_reserving<'a, I>(keys: I, reserved: &HashSet<String>) -> ZetaResult<Self>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut sorted: Vec<&String> = keys.into_iter().collect();
        sorted.sort();

        let mut taken: HashSet<String> = HashSet::new();
        for key in reserved {
            reserve_with_parents(&mut taken, key);
        }
        for key in sorted.iter().filter(|k| is_short_path(k)) {
            reserve_with_parents(&mut taken, key);
        }

        let mut table = Self::default();
        let mut dirs: HashMap<String, String> = HashMap::new();

        for key in sorted.into_iter().filter(|k| !is_short_path(k)) {
            let segments: Vec<&str> = key.split('/').collect();
            let mut long_prefix = String::new();
            let mut short_prefix = String::new();

            for (i, segment) in segments.iter().enumerate() {
                if i > 0 {
                    long_prefix.push('/');
                    short_prefix.push('/');
                }
                long_prefix.push_str(segment);
                let is_last = i + 1 == segments.len();

                let short = match dirs.get(&long_prefix) {
                    Some(known) if !is_last => known.clone(),
                    _ => {
                        let short = short_name(segment, |cand| {
                            taken.contains(&format!("{}{}", short_prefix, cand))
                        })?;
                        if !is_last && !is_short_segment(segment) {
                            dirs.insert(long_prefix.clone(), short.clone());
                        }
                        short
                    }
                };
                short_prefix.push_str(&short);
                if !is_last {
                    taken.insert(short_prefix.clone());
                }
            }

            taken.insert(short_prefix.clone());
            table.short_to_long.insert(short_prefix.clone(), key.clone());
            table.long_to_short.insert(key.clone(), short_prefix);
        }

        Ok(table)
    }

    /// Long key behind an alias.
    pub fn resolve(&self, short: &str) -> Option<&str> {
        self.short_to_long.get(short).map(|s| s.as_str())
    }

    /// Alias for a long key, if it has one.
    pub fn alias_of(&self, long: &str) -> Option<&str> {
        self.long_to_short.get(long).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.short_to_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_to_long.is_empty()
    }
}

fn reserve_with_parents(taken: &mut HashSet<String>, key: &str) {
    let mut end = 0;
    for segment in key.split('/') {
        end += segment.len();
        taken.insert(key[..end].to_string());
        end += 1;
    }
}
