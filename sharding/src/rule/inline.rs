// Copyright 2022 SphereEx Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Expansion of inline expressions such as `ds${0..1}.t_order${[0, 1]}`.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ConfigError, Error};

lazy_static! {
    static ref INLINE_GROUP: Regex = Regex::new(r"\$(?:->)?\{([^{}]*)\}").unwrap();
}

/// Expands every comma separated segment of `expr` into the cartesian product of its groups,
/// last group varying fastest.
pub fn expand(expr: &str) -> Result<Vec<String>, Error> {
    let mut result = vec![];
    for segment in split_segments(expr)? {
        result.extend(expand_segment(segment, expr)?);
    }
    Ok(result)
}

fn invalid(expr: &str) -> Error {
    ConfigError::InvalidInlineExpression(expr.to_string()).into()
}

fn split_segments(expr: &str) -> Result<Vec<&str>, Error> {
    let mut segments = vec![];
    let mut depth = 0i32;
    let mut from = 0;

    for (idx, ch) in expr.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid(expr));
                }
            }
            ',' if depth == 0 => {
                segments.push(expr[from..idx].trim());
                from = idx + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(invalid(expr));
    }
    segments.push(expr[from..].trim());

    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid(expr));
    }
    Ok(segments)
}

fn expand_segment(segment: &str, expr: &str) -> Result<Vec<String>, Error> {
    // Literal pieces interleaved with group values: lit0 g0 lit1 g1 ... litN
    let mut literals = vec![];
    let mut groups = vec![];
    let mut last = 0;

    for caps in INLINE_GROUP.captures_iter(segment) {
        let (whole, inner) = match (caps.get(0), caps.get(1)) {
            (Some(whole), Some(inner)) => (whole, inner),
            _ => return Err(invalid(expr)),
        };
        literals.push(&segment[last..whole.start()]);
        groups.push(expand_group(inner.as_str(), expr)?);
        last = whole.end();
    }
    literals.push(&segment[last..]);

    if literals.iter().any(|l| l.contains('$') || l.contains('{') || l.contains('}')) {
        return Err(invalid(expr));
    }

    if groups.is_empty() {
        return Ok(vec![segment.to_string()]);
    }

    Ok(groups
        .into_iter()
        .multi_cartesian_product()
        .map(|values| {
            let mut out = String::from(literals[0]);
            for (value, literal) in values.iter().zip(literals.iter().skip(1)) {
                out.push_str(value);
                out.push_str(literal);
            }
            out
        })
        .collect())
}

fn expand_group(inner: &str, expr: &str) -> Result<Vec<String>, Error> {
    let inner = inner.trim();

    if let Some((lower, upper)) = inner.split_once("..") {
        let lower = lower.trim().parse::<i64>().map_err(|_| invalid(expr))?;
        let upper = upper.trim().parse::<i64>().map_err(|_| invalid(expr))?;
        if lower > upper {
            return Err(invalid(expr));
        }
        return Ok((lower..=upper).map(|v| v.to_string()).collect());
    }

    let list = inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(inner);
    let values: Vec<String> = list
        .split(',')
        .map(|v| v.trim().trim_matches(|c: char| c == '\'' || c == '"').to_string())
        .collect();

    if values.iter().any(|v| v.is_empty()) {
        return Err(invalid(expr));
    }
    Ok(values)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_expand_range() {
        assert_eq!(
            expand("ds${0..1}.t_order${0..1}").unwrap(),
            vec!["ds0.t_order0", "ds0.t_order1", "ds1.t_order0", "ds1.t_order1"]
        );
    }

    #[test]
    fn test_expand_list_and_segments() {
        assert_eq!(
            expand("ds0.t_user, ds$->{['a', 'b']}.t_log_${[2021,2022]}").unwrap(),
            vec!["ds0.t_user", "dsa.t_log_2021", "dsa.t_log_2022", "dsb.t_log_2021", "dsb.t_log_2022"]
        );
    }

    #[test]
    fn test_expand_invalid() {
        for expr in ["ds${0..}.t", "ds${1..0}.t", "ds${0..1.t", "ds0.t,", "ds}0.t"] {
            assert!(expand(expr).is_err(), "{} should be rejected", expr);
        }
    }
}
