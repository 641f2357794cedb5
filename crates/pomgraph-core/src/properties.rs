//! `${...}` placeholder interpolation against a layered property lookup.
//!
//! Lookups walk an ordered chain of property maps (user properties, the POM's
//! merged properties, project built-ins) and, for `env.*` names, the process
//! environment. Placeholders that nothing defines are left as literal text.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::failure::PropertyCycle;

/// An ordered chain of property maps; the first map defining a name wins.
#[derive(Debug, Clone, Default)]
pub struct PropertyChain<'a> {
    layers: Vec<&'a BTreeMap<String, String>>,
    environment: bool,
}

impl<'a> PropertyChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower precedence than every layer already added.
    pub fn layer(mut self, properties: &'a BTreeMap<String, String>) -> Self {
        self.layers.push(properties);
        self
    }

    /// Resolve `env.NAME` from the process environment.
    pub fn with_environment(mut self) -> Self {
        self.environment = true;
        self
    }

    pub fn get(&self, name: &str) -> Option<Cow<'a, str>> {
        for layer in &self.layers {
            if let Some(value) = layer.get(name) {
                return Some(Cow::Borrowed(value.as_str()));
            }
        }
        if self.environment {
            if let Some(var) = name.strip_prefix("env.") {
                return std::env::var(var).ok().map(Cow::Owned);
            }
        }
        None
    }
}

/// Passes over a text before a result that keeps changing counts as a cycle.
const MAX_PASSES: usize = 16;

/// Replace every `${name}` in `text`, resolving names recursively.
///
/// A substituted value may complete a placeholder with the text that follows
/// it, so expansion repeats until the result no longer changes. Interpolating
/// the result again is therefore a no-op.
///
/// Fails with [`PropertyCycle`] when a name's value refers back to itself,
/// directly or through other properties, or when repeated expansion never
/// settles.
pub fn interpolate(text: &str, chain: &PropertyChain<'_>) -> Result<String, PropertyCycle> {
    let mut current = text.to_string();
    for _ in 0..MAX_PASSES {
        if !current.contains("${") {
            return Ok(current);
        }
        let mut stack = Vec::new();
        let next = expand(&current, chain, &mut stack)?;
        if next == current {
            return Ok(next);
        }
        current = next;
    }
    Err(PropertyCycle {
        chain: placeholders(&current),
    })
}

/// Names of the `${...}` placeholders in `text`, in order.
fn placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        names.push(after[..end].to_string());
        rest = &after[end + 1..];
    }
    names
}

/// Like [`interpolate`], but a cycle leaves `text` untouched and is pushed
/// onto `cycles` instead of failing.
pub fn interpolate_lenient(
    text: &str,
    chain: &PropertyChain<'_>,
    cycles: &mut Vec<PropertyCycle>,
) -> String {
    if !text.contains("${") {
        return text.to_string();
    }
    match interpolate(text, chain) {
        Ok(value) => value,
        Err(cycle) => {
            tracing::warn!("{cycle}; leaving '{text}' uninterpolated");
            if !cycles.contains(&cycle) {
                cycles.push(cycle);
            }
            text.to_string()
        }
    }
}

fn expand(
    text: &str,
    chain: &PropertyChain<'_>,
    stack: &mut Vec<String>,
) -> Result<String, PropertyCycle> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        match resolve_name(name, chain, stack)? {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn resolve_name(
    name: &str,
    chain: &PropertyChain<'_>,
    stack: &mut Vec<String>,
) -> Result<Option<String>, PropertyCycle> {
    if let Some(pos) = stack.iter().position(|n| n == name) {
        let mut cycle: Vec<String> = stack[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(PropertyCycle { chain: cycle });
    }
    let Some(raw) = chain.get(name) else {
        return Ok(None);
    };
    stack.push(name.to_string());
    let value = expand(&raw, chain, stack);
    stack.pop();
    value.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn nested_resolution() {
        let p = props(&[("a", "${b}-x"), ("b", "1.0")]);
        let chain = PropertyChain::new().layer(&p);
        assert_eq!(interpolate("v=${a}", &chain).unwrap(), "v=1.0-x");
    }

    #[test]
    fn earlier_layer_shadows_later() {
        let child = props(&[("v", "2")]);
        let parent = props(&[("v", "1"), ("only.parent", "p")]);
        let chain = PropertyChain::new().layer(&child).layer(&parent);
        assert_eq!(interpolate("${v}/${only.parent}", &chain).unwrap(), "2/p");
    }

    #[test]
    fn unresolved_left_literal() {
        let chain = PropertyChain::new();
        assert_eq!(interpolate("${missing}-1", &chain).unwrap(), "${missing}-1");
    }

    #[test]
    fn unterminated_placeholder_kept() {
        let chain = PropertyChain::new();
        assert_eq!(interpolate("abc${oops", &chain).unwrap(), "abc${oops");
    }

    #[test]
    fn self_cycle_detected() {
        let p = props(&[("a", "${a}")]);
        let chain = PropertyChain::new().layer(&p);
        let err = interpolate("${a}", &chain).unwrap_err();
        assert_eq!(err.chain, vec!["a", "a"]);
    }

    #[test]
    fn same_name_twice_is_not_a_cycle() {
        let p = props(&[("v", "1")]);
        let chain = PropertyChain::new().layer(&p);
        assert_eq!(interpolate("${v}.${v}", &chain).unwrap(), "1.1");
    }
}
