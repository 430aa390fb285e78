use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed used when the command line names none.
pub const DEFAULT_SEED: u64 = 1337;

/// Largest range a single token may expand to.
const MAX_RANGE: u64 = 10_000;

/// Resolve CLI seed tokens into a deduplicated seed list.
///
/// Accepts literal integers (negative values use their magnitude) and
/// ranges written `a..b` (exclusive) or `a..=b` (inclusive).
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        for seed in expand_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }

    Ok(seeds)
}

fn expand_token(token: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = token.split_once("..") {
        let (end, inclusive) = match end.strip_prefix('=') {
            Some(end) => (end, true),
            None => (end, false),
        };
        let start = parse_seed(start)?;
        let end = parse_seed(end)?;
        let end = if inclusive {
            end.checked_add(1)
                .with_context(|| format!("seed range {token} overflows"))?
        } else {
            end
        };
        if end <= start {
            bail!("Empty seed range: {token}");
        }
        if end - start > MAX_RANGE {
            bail!("Seed range {token} spans more than {MAX_RANGE} seeds");
        }
        return Ok((start..end).collect());
    }
    Ok(vec![parse_seed(token)?])
}

fn parse_seed(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    bail!("Unrecognized seed token: {token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| (*token).to_string()).collect()
    }

    #[test]
    fn resolves_numbers_and_ranges() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "1..4", "3..=5"])).unwrap();
        assert_eq!(seeds, vec![42, 7, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn falls_back_to_default_seed() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
        assert_eq!(
            resolve_seed_inputs(&tokens(&["", " "])).unwrap(),
            vec![DEFAULT_SEED]
        );
    }

    #[test]
    fn rejects_garbage_and_empty_ranges() {
        assert!(resolve_seed_inputs(&tokens(&["CL-ORANGE42"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["5..5"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["0..100000"])).is_err());
    }
}
