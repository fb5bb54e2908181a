// src/solver.rs

//! Dependency solving.
//!
//! Given the package universe (every known release, tagged with whether
//! it is the installed one) and a request of install / remove / upgrade
//! wishes, `resolve` produces candidate solutions: ordered batches of
//! actions that move the installed set to a consistent target.
//!
//! Two strategies are tried: prefer the newest satisfying versions, and
//! prefer keeping what is already installed. When they agree a single
//! solution is returned.

use crate::version::{Constraint, Dependency, HeadState, NV};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One release in the solver's universe
#[derive(Debug, Clone)]
pub struct CandidatePackage {
    pub nv: NV,
    pub depends: Vec<Dependency>,
    /// Is this the version currently installed?
    pub installed: bool,
}

/// A named wish with an optional version constraint
pub type Wish = (String, Option<Constraint>);

/// What the user asked for
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub wish_install: Vec<Wish>,
    pub wish_remove: Vec<Wish>,
    pub wish_upgrade: Vec<Wish>,
}

/// State a `Change` action replaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Previous {
    Installed(NV),
    NotInstalled,
}

/// One step of a solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Install `1`, first removing `0` if it was installed
    Change(Previous, NV),
    /// Remove an installed release
    Delete(NV),
    /// Rebuild an installed release in place (its dependencies moved)
    Recompile(NV),
}

impl Action {
    /// Does this action delete or replace an installed version?
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Delete(_) | Action::Change(Previous::Installed(_), _))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Change(Previous::NotInstalled, nv) => write!(f, "install   {nv}"),
            Action::Change(Previous::Installed(old), nv) if old.version == nv.version => {
                write!(f, "reinstall {nv}")
            }
            Action::Change(Previous::Installed(old), nv) => {
                write!(f, "change    {} -> {}", old, nv)
            }
            Action::Delete(nv) => write!(f, "delete    {nv}"),
            Action::Recompile(nv) => write!(f, "recompile {nv}"),
        }
    }
}

/// Actions safe to run side by side
pub type Batch = Vec<Action>;

/// An ordered sequence of batches
pub type Solution = Vec<Batch>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Newest,
    KeepInstalled,
}

/// Compute candidate solutions for a request.
///
/// An empty vector means the request cannot be satisfied; a solution
/// with no batches means there is nothing to do.
pub fn resolve(universe: &[CandidatePackage], request: &Request) -> Vec<Solution> {
    let mut solutions = Vec::new();
    for strategy in [Strategy::Newest, Strategy::KeepInstalled] {
        if let Some(solution) = solve(universe, request, strategy) {
            if !solutions.contains(&solution) {
                solutions.push(solution);
            }
        }
    }
    solutions
}

fn installed_map(universe: &[CandidatePackage]) -> BTreeMap<String, NV> {
    universe
        .iter()
        .filter(|p| p.installed)
        .map(|p| (p.nv.name.clone(), p.nv.clone()))
        .collect()
}

fn by_name(universe: &[CandidatePackage]) -> BTreeMap<&str, Vec<&CandidatePackage>> {
    let mut map: BTreeMap<&str, Vec<&CandidatePackage>> = BTreeMap::new();
    for package in universe {
        map.entry(package.nv.name.as_str()).or_default().push(package);
    }
    for candidates in map.values_mut() {
        candidates.sort_by(|a, b| b.nv.version.cmp(&a.nv.version));
    }
    map
}

fn solve(
    universe: &[CandidatePackage],
    request: &Request,
    strategy: Strategy,
) -> Option<Solution> {
    let installed = installed_map(universe);
    let candidates = by_name(universe);
    let mut target = installed.clone();
    let mut force_reinstall = BTreeSet::new();

    for (name, _) in &request.wish_remove {
        let mut doomed = dependent_closure(universe, &[name.clone()]);
        doomed.push(name.clone());
        for name in doomed {
            target.remove(&name);
        }
    }

    for (name, constraint) in &request.wish_install {
        add_with_deps(&candidates, &mut target, name, constraint.as_ref(), strategy)?;
    }

    for (name, constraint) in &request.wish_upgrade {
        // Upgrades always chase the newest satisfying version
        add_with_deps(&candidates, &mut target, name, constraint.as_ref(), Strategy::Newest)?;
        if let (Some(old), Some(new)) = (installed.get(name), target.get(name)) {
            let stale = matches!(
                old.version.head_state(),
                Some(HeadState::Behind) | Some(HeadState::Unknown)
            );
            if stale && old.version == new.version {
                force_reinstall.insert(name.clone());
            }
        }
    }

    // Close over dependencies of everything now in the target; bounded
    // so conflicting constraints cannot ping-pong forever
    for _ in 0..128 {
        let pending: Vec<(String, Option<Constraint>)> = target
            .values()
            .filter_map(|nv| find_candidate(&candidates, nv))
            .flat_map(|p| p.depends.iter())
            .filter(|d| !version_in_target(&target, &d.name, d.constraint.as_ref()))
            .map(|d| (d.name.clone(), d.constraint.clone()))
            .collect();
        if pending.is_empty() {
            break;
        }
        for (name, constraint) in pending {
            add_with_deps(&candidates, &mut target, &name, constraint.as_ref(), strategy)?;
        }
    }

    Some(plan(universe, &installed, &target, &force_reinstall))
}

fn find_candidate<'a>(
    candidates: &BTreeMap<&str, Vec<&'a CandidatePackage>>,
    nv: &NV,
) -> Option<&'a CandidatePackage> {
    candidates
        .get(nv.name.as_str())?
        .iter()
        .find(|p| p.nv.version == nv.version)
        .copied()
}

fn version_in_target(
    target: &BTreeMap<String, NV>,
    name: &str,
    constraint: Option<&Constraint>,
) -> bool {
    target
        .get(name)
        .is_some_and(|nv| constraint.map_or(true, |c| c.satisfied_by(&nv.version)))
}

/// Put a satisfying version of `name` in the target, then its
/// dependencies. Returns `None` when the name is unknown or no version
/// satisfies the constraint.
///
/// `Newest` moves the target to the highest satisfying version even
/// when an older installed one would do; `KeepInstalled` holds any
/// satisfying version already in the target.
fn add_with_deps(
    candidates: &BTreeMap<&str, Vec<&CandidatePackage>>,
    target: &mut BTreeMap<String, NV>,
    name: &str,
    constraint: Option<&Constraint>,
    strategy: Strategy,
) -> Option<()> {
    let versions = candidates.get(name)?;
    let satisfying: Vec<&CandidatePackage> = versions
        .iter()
        .copied()
        .filter(|p| constraint.map_or(true, |c| c.satisfied_by(&p.nv.version)))
        .collect();
    let pick: &CandidatePackage = match strategy {
        Strategy::KeepInstalled => satisfying
            .iter()
            .copied()
            .find(|p| p.installed)
            .or_else(|| satisfying.first().copied())?,
        Strategy::Newest => satisfying.first().copied()?,
    };
    // already where we want it: stop, also cutting dependency cycles
    if target.get(name).is_some_and(|nv| nv.version == pick.nv.version) {
        return Some(());
    }
    if strategy == Strategy::KeepInstalled && version_in_target(target, name, constraint) {
        return Some(());
    }
    target.insert(name.to_string(), pick.nv.clone());
    for dep in &pick.depends {
        add_with_deps(candidates, target, &dep.name, dep.constraint.as_ref(), strategy)?;
    }
    Some(())
}

/// Diff installed against target and lay the actions out in batches
fn plan(
    universe: &[CandidatePackage],
    installed: &BTreeMap<String, NV>,
    target: &BTreeMap<String, NV>,
    force_reinstall: &BTreeSet<String>,
) -> Solution {
    let mut deletes = Vec::new();
    let mut moved = BTreeSet::new();
    let mut actions: BTreeMap<String, Action> = BTreeMap::new();

    for (name, old) in installed {
        match target.get(name) {
            None => deletes.push(name.clone()),
            Some(new) if old.version != new.version || force_reinstall.contains(name) => {
                moved.insert(name.clone());
                actions.insert(
                    name.clone(),
                    Action::Change(Previous::Installed(old.clone()), new.clone()),
                );
            }
            Some(_) => {}
        }
    }
    for (name, new) in target {
        if !installed.contains_key(name) {
            moved.insert(name.clone());
            actions.insert(name.clone(), Action::Change(Previous::NotInstalled, new.clone()));
        }
    }

    // Anything still installed whose dependencies moved gets rebuilt
    loop {
        let mut grew = false;
        for (name, nv) in target {
            if moved.contains(name) || !installed.contains_key(name) {
                continue;
            }
            let depends_moved = dependencies_of(universe, nv)
                .iter()
                .any(|d| moved.contains(&d.name));
            if depends_moved {
                moved.insert(name.clone());
                actions.insert(name.clone(), Action::Recompile(nv.clone()));
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    let mut solution = Vec::new();
    if !deletes.is_empty() {
        // Dependents go before their dependencies
        let ordered = order_dependents_first(universe, installed, &deletes);
        solution.push(
            ordered
                .into_iter()
                .map(|name| Action::Delete(installed[&name].clone()))
                .collect(),
        );
    }
    solution.extend(layer_actions(universe, target, actions));
    solution
}

fn dependencies_of<'a>(universe: &'a [CandidatePackage], nv: &NV) -> &'a [Dependency] {
    universe
        .iter()
        .find(|p| p.nv == *nv)
        .map(|p| p.depends.as_slice())
        .unwrap_or(&[])
}

/// Kahn layering: a batch holds actions whose in-target dependencies all
/// landed in earlier batches
fn layer_actions(
    universe: &[CandidatePackage],
    target: &BTreeMap<String, NV>,
    mut actions: BTreeMap<String, Action>,
) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut placed: BTreeSet<String> = BTreeSet::new();
    while !actions.is_empty() {
        let ready: Vec<String> = actions
            .keys()
            .filter(|name| {
                target
                    .get(*name)
                    .map(|nv| dependencies_of(universe, nv))
                    .unwrap_or(&[])
                    .iter()
                    .all(|d| !actions.contains_key(&d.name) || placed.contains(&d.name))
            })
            .cloned()
            .collect();
        if ready.is_empty() {
            // Dependency cycle: flush the rest as one batch
            batches.push(std::mem::take(&mut actions).into_values().collect());
            break;
        }
        let mut batch = Vec::new();
        for name in ready {
            batch.push(actions.remove(&name).expect("ready names come from actions"));
            placed.insert(name);
        }
        batches.push(batch);
    }
    batches
}

/// Order `names` so every package precedes the packages it depends on
fn order_dependents_first(
    universe: &[CandidatePackage],
    installed: &BTreeMap<String, NV>,
    names: &[String],
) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();
    let mut remaining: BTreeSet<String> = names.iter().cloned().collect();
    while !remaining.is_empty() {
        // A name is ready once no still-remaining package depends on it
        let ready: Vec<String> = remaining
            .iter()
            .filter(|name| {
                remaining.iter().all(|other| {
                    other == *name
                        || !installed
                            .get(other)
                            .map(|nv| dependencies_of(universe, nv))
                            .unwrap_or(&[])
                            .iter()
                            .any(|d| d.name == **name)
                })
            })
            .cloned()
            .collect();
        if ready.is_empty() {
            ordered.extend(remaining.iter().cloned());
            break;
        }
        for name in ready {
            remaining.remove(&name);
            ordered.push(name);
        }
    }
    ordered
}

/// Names of packages in `universe` that transitively depend on `roots`
/// (the roots themselves excluded)
pub fn dependent_closure(universe: &[CandidatePackage], roots: &[String]) -> Vec<String> {
    let installed = installed_map(universe);
    let mut closure: BTreeSet<String> = roots.iter().cloned().collect();
    loop {
        let mut grew = false;
        for (name, nv) in &installed {
            if closure.contains(name) {
                continue;
            }
            if dependencies_of(universe, nv).iter().any(|d| closure.contains(&d.name)) {
                closure.insert(name.clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    closure.retain(|name| !roots.contains(name));
    closure.into_iter().collect()
}

/// Names of `roots` plus everything they transitively depend on, in
/// dependencies-first order
pub fn dependency_closure(universe: &[CandidatePackage], roots: &[String]) -> Vec<String> {
    let installed = installed_map(universe);
    let mut ordered = Vec::new();
    let mut seen = BTreeSet::new();
    fn visit(
        universe: &[CandidatePackage],
        installed: &BTreeMap<String, NV>,
        name: &str,
        seen: &mut BTreeSet<String>,
        ordered: &mut Vec<String>,
    ) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(nv) = installed.get(name) {
            for dep in dependencies_of(universe, nv) {
                visit(universe, installed, &dep.name, seen, ordered);
            }
        }
        ordered.push(name.to_string());
    }
    for root in roots {
        visit(universe, &installed, root, &mut seen, &mut ordered);
    }
    ordered
}
