// src/resolver.rs

//! Bridge between user wishes and the solver.
//!
//! Builds the solver universe from the on-disk index and installed set,
//! runs the request, and walks the candidate solutions past the user:
//! destructive solutions need an explicit yes, harmless ones apply
//! straight away, and rejecting one solution moves on to the next.

use crate::error::Result;
use crate::prompt::Prompter;
use crate::solver::{self, CandidatePackage, Request, Solution};
use crate::spec::PackageSpec;
use crate::state::{self, Snapshot};
use tracing::debug;

/// Every known release, tagged with whether it is the installed one.
///
/// For git-tracked packages the installed entry carries the head
/// sub-state, so the solver can tell a stale checkout from a current one.
pub fn universe(snapshot: &Snapshot) -> Result<Vec<CandidatePackage>> {
    let installed = state::read_installed(snapshot)?;
    let mut out = Vec::new();
    for nv in state::index_list(snapshot)? {
        let spec = PackageSpec::read(&snapshot.spec_path(&nv))?;
        let depends = spec.dependencies()?;
        let (nv, is_installed) = match installed.get(&nv.name) {
            Some(version) if *version == nv.version => {
                // Prefer the installed rendering: it knows the head state
                (crate::version::NV::new(&nv.name, version.clone()), true)
            }
            _ => (nv, false),
        };
        out.push(CandidatePackage { nv, depends, installed: is_installed });
    }
    debug!("Universe holds {} release(s)", out.len());
    Ok(out)
}

fn render(solution: &Solution) -> String {
    if solution.is_empty() {
        return "Nothing to do.\n".to_string();
    }
    let mut out = String::new();
    for batch in solution {
        for action in batch {
            out.push_str(&format!("  - {action}\n"));
        }
    }
    out
}

fn is_destructive(solution: &Solution) -> bool {
    solution.iter().flatten().any(|a| a.is_destructive())
}

/// Resolve a request and let the user pick a solution.
///
/// `Ok(None)` means nothing is to be applied: the solver found no
/// solution (reported to the user) or every candidate was declined.
pub fn request_solution(
    snapshot: &Snapshot,
    request: &Request,
    prompter: &mut dyn Prompter,
) -> Result<Option<Solution>> {
    let universe = universe(snapshot)?;
    let solutions = solver::resolve(&universe, request);
    if solutions.is_empty() {
        println!("No solution found.");
        return Ok(None);
    }

    for (i, solution) in solutions.iter().enumerate() {
        print!("{}", render(solution));
        if !is_destructive(solution) {
            return Ok(Some(solution.clone()));
        }
        let question = if i == 0 {
            "Continue ?"
        } else {
            "Continue ? (press [n] to try another solution)"
        };
        if prompter.confirm(question)? {
            return Ok(Some(solution.clone()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::solver::{Action, Previous};
    use crate::version::{ReleaseVersion, Version, NV};

    fn nv(name: &str, version: &str) -> NV {
        NV::new(name, Version::Release(ReleaseVersion::new(version)))
    }

    #[test]
    fn test_render_names_the_operations() {
        let solution: Solution = vec![vec![
            Action::Change(Previous::NotInstalled, nv("app", "1.0")),
            Action::Delete(nv("old", "0.9")),
        ]];
        let text = render(&solution);
        assert!(text.contains("install   app-1.0"));
        assert!(text.contains("delete    old-0.9"));
    }

    #[test]
    fn test_destructive_detection() {
        let harmless: Solution =
            vec![vec![Action::Change(Previous::NotInstalled, nv("app", "1.0"))]];
        assert!(!is_destructive(&harmless));

        let destructive: Solution = vec![vec![Action::Delete(nv("app", "1.0"))]];
        assert!(is_destructive(&destructive));

        let upgrade: Solution = vec![vec![Action::Change(
            Previous::Installed(nv("app", "1.0")),
            nv("app", "2.0"),
        )]];
        assert!(is_destructive(&upgrade));
    }

    #[test]
    fn test_scripted_rejection_consumes_prompt() {
        let mut prompter = ScriptedPrompter::new(&[false]);
        // rejection exercised end-to-end in the integration tests; here
        // just check the prompt wording used for the first solution
        assert!(!prompter.confirm("Continue ?").unwrap());
        assert_eq!(prompter.asked, vec!["Continue ?"]);
    }
}
