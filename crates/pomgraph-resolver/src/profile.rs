//! Profile activation.
//!
//! Activation is decided per POM, before inheritance: a parent's profiles
//! are activated against the parent's own declarations.

use std::collections::BTreeMap;
use std::path::Path;

use pomgraph_core::config::ResolverConfig;
use pomgraph_core::pom::{Activation, FileActivation, Pom, Profile, PropertyActivation};

use crate::version::{parse_ranges, MavenVersion};

/// Inputs that decide which profiles are active.
#[derive(Debug, Clone, Default)]
pub struct ActivationContext {
    /// Profile ids requested explicitly.
    pub active_ids: Vec<String>,
    /// Profile ids deactivated explicitly (`!id` or `-id`).
    pub inactive_ids: Vec<String>,
    /// User properties, consulted by `<property>` activation.
    pub user_properties: BTreeMap<String, String>,
    /// The JDK version `<jdk>` activation is evaluated against.
    pub jdk_version: Option<String>,
}

impl ActivationContext {
    /// Build a context from `-P`-style ids, where `!id` or `-id` deactivates.
    pub fn new(
        profiles: &[String],
        user_properties: BTreeMap<String, String>,
        jdk_version: Option<String>,
    ) -> Self {
        let mut ctx = Self {
            user_properties,
            jdk_version,
            ..Self::default()
        };
        for id in profiles.iter().flat_map(|p| p.split(',')).map(str::trim) {
            if let Some(inactive) = id.strip_prefix('!').or_else(|| id.strip_prefix('-')) {
                ctx.inactive_ids.push(inactive.to_string());
            } else if !id.is_empty() {
                ctx.active_ids.push(id.to_string());
            }
        }
        ctx
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            &config.resolver.active_profiles,
            config.properties.clone(),
            config.resolver.jdk_version.clone(),
        )
    }
}

/// The profiles of `pom` that are active, in declaration order.
///
/// `activeByDefault` profiles are active only when no other profile of the
/// same POM is.
pub fn active_profiles<'p>(pom: &'p Pom, ctx: &ActivationContext) -> Vec<&'p Profile> {
    let mut active = Vec::new();
    let mut by_default = Vec::new();

    for profile in &pom.profiles {
        if ctx.inactive_ids.contains(&profile.id) {
            continue;
        }
        if ctx.active_ids.contains(&profile.id) {
            active.push(profile);
            continue;
        }
        let Some(activation) = &profile.activation else {
            continue;
        };
        if has_conditions(activation) {
            if conditions_hold(activation, pom.base_dir(), ctx) {
                active.push(profile);
            }
        } else if activation.active_by_default {
            by_default.push(profile);
        }
    }

    if active.is_empty() {
        by_default
    } else {
        active
    }
}

/// Module paths a POM contributes: its own plus those of active profiles.
pub fn modules_of(pom: &Pom, ctx: &ActivationContext) -> Vec<String> {
    let mut modules = pom.modules.clone();
    for profile in active_profiles(pom, ctx) {
        for module in &profile.modules {
            if !modules.contains(module) {
                modules.push(module.clone());
            }
        }
    }
    modules
}

fn has_conditions(activation: &Activation) -> bool {
    activation.jdk.is_some() || activation.property.is_some() || activation.file.is_some()
}

fn conditions_hold(activation: &Activation, base_dir: Option<&Path>, ctx: &ActivationContext) -> bool {
    activation
        .jdk
        .as_deref()
        .map_or(true, |jdk| jdk_matches(jdk, ctx.jdk_version.as_deref()))
        && activation
            .property
            .as_ref()
            .map_or(true, |p| property_matches(p, &ctx.user_properties))
        && activation
            .file
            .as_ref()
            .map_or(true, |f| file_matches(f, base_dir))
}

fn jdk_matches(condition: &str, jdk: Option<&str>) -> bool {
    let Some(jdk) = jdk else {
        return false;
    };
    let condition = condition.trim();
    if let Some(negated) = condition.strip_prefix('!') {
        return !jdk_matches(negated, Some(jdk));
    }
    if let Some(ranges) = parse_ranges(condition) {
        let version = MavenVersion::parse(jdk);
        return ranges.iter().any(|r| r.contains(&version));
    }
    jdk == condition || jdk.starts_with(&format!("{condition}."))
}

fn property_matches(condition: &PropertyActivation, properties: &BTreeMap<String, String>) -> bool {
    let (name, absent) = match condition.name.strip_prefix('!') {
        Some(name) => (name, true),
        None => (condition.name.as_str(), false),
    };
    let actual = properties.get(name);
    if absent {
        return actual.is_none();
    }
    match condition.value.as_deref() {
        None => actual.is_some(),
        Some(expected) => match expected.strip_prefix('!') {
            Some(excluded) => actual.map_or(true, |v| v != excluded),
            None => actual.is_some_and(|v| v == expected),
        },
    }
}

fn file_matches(condition: &FileActivation, base_dir: Option<&Path>) -> bool {
    let exists = |path: &str| -> Option<bool> {
        let base = base_dir?;
        let expanded = path
            .replace("${project.basedir}", &base.display().to_string())
            .replace("${basedir}", &base.display().to_string());
        Some(base.join(expanded).exists())
    };
    let exists_ok = condition
        .exists
        .as_deref()
        .map_or(true, |p| exists(p).unwrap_or(false));
    let missing_ok = condition
        .missing
        .as_deref()
        .map_or(true, |p| exists(p).is_some_and(|e| !e));
    exists_ok && missing_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, activation: Option<Activation>) -> Profile {
        Profile {
            id: id.into(),
            activation,
            ..Default::default()
        }
    }

    fn ids(profiles: Vec<&Profile>) -> Vec<&str> {
        profiles.iter().map(|p| p.id.as_str()).collect()
    }

    fn pom_with(profiles: Vec<Profile>) -> Pom {
        Pom {
            artifact_id: "app".into(),
            profiles,
            ..Default::default()
        }
    }

    #[test]
    fn active_by_default_yields_to_other_active_profiles() {
        let default = Activation {
            active_by_default: true,
            ..Default::default()
        };
        let pom = pom_with(vec![profile("dflt", Some(default)), profile("ci", None)]);

        let none = ActivationContext::default();
        assert_eq!(ids(active_profiles(&pom, &none)), vec!["dflt"]);

        let ci = ActivationContext::new(&["ci".into()], BTreeMap::new(), None);
        assert_eq!(ids(active_profiles(&pom, &ci)), vec!["ci"]);

        let off = ActivationContext::new(&["!dflt".into()], BTreeMap::new(), None);
        assert!(active_profiles(&pom, &off).is_empty());
    }

    #[test]
    fn property_activation() {
        let on_release = Activation {
            property: Some(PropertyActivation {
                name: "release".into(),
                value: Some("true".into()),
            }),
            ..Default::default()
        };
        let without_skip = Activation {
            property: Some(PropertyActivation {
                name: "!skip".into(),
                value: None,
            }),
            ..Default::default()
        };
        let pom = pom_with(vec![
            profile("release", Some(on_release)),
            profile("noskip", Some(without_skip)),
        ]);

        let props = BTreeMap::from([("release".to_string(), "true".to_string())]);
        let ctx = ActivationContext::new(&[], props, None);
        assert_eq!(ids(active_profiles(&pom, &ctx)), vec!["release", "noskip"]);

        let props = BTreeMap::from([("skip".to_string(), String::new())]);
        let ctx = ActivationContext::new(&[], props, None);
        assert!(active_profiles(&pom, &ctx).is_empty());
    }

    #[test]
    fn jdk_activation() {
        assert!(jdk_matches("17", Some("17.0.2")));
        assert!(!jdk_matches("1", Some("17")));
        assert!(jdk_matches("!1.8", Some("21")));
        assert!(jdk_matches("[11,)", Some("17")));
        assert!(!jdk_matches("[11,)", Some("1.8")));
        assert!(!jdk_matches("17", None));
    }

    #[test]
    fn file_activation_relative_to_pom() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marker.txt"), "").unwrap();
        let base = Some(tmp.path());

        let exists = FileActivation {
            exists: Some("${basedir}/marker.txt".into()),
            missing: None,
        };
        let missing = FileActivation {
            exists: None,
            missing: Some("marker.txt".into()),
        };
        assert!(file_matches(&exists, base));
        assert!(!file_matches(&missing, base));
        assert!(!file_matches(&exists, None));
    }

    #[test]
    fn conditions_are_combined() {
        let both = Activation {
            jdk: Some("17".into()),
            property: Some(PropertyActivation {
                name: "fast".into(),
                value: None,
            }),
            ..Default::default()
        };
        let pom = pom_with(vec![profile("both", Some(both))]);
        let props = BTreeMap::from([("fast".to_string(), "1".to_string())]);

        let jdk_only = ActivationContext::new(&[], BTreeMap::new(), Some("17".into()));
        assert!(active_profiles(&pom, &jdk_only).is_empty());
        let all = ActivationContext::new(&[], props, Some("17".into()));
        assert_eq!(ids(active_profiles(&pom, &all)), vec!["both"]);
    }

    #[test]
    fn profile_modules_are_added() {
        let mut pom = pom_with(vec![Profile {
            modules: vec!["extra".into(), "core".into()],
            ..profile("all", None)
        }]);
        pom.modules = vec!["core".into()];
        let ctx = ActivationContext::new(&["all".into()], BTreeMap::new(), None);
        assert_eq!(modules_of(&pom, &ctx), vec!["core", "extra"]);
        assert_eq!(modules_of(&pom, &ActivationContext::default()), vec!["core"]);
    }
}
