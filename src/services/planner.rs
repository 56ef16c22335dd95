//! Stage planning: one spec per stage of increasing completeness.

use crate::domain::models::{BuildArgs, ShellSpec};
use crate::domain::ports::BuildFn;
#[cfg(debug_assertions)]
use crate::services::fingerprint::fingerprint;

/// The ordered specs for one build request, stage 1 first.
///
/// Discarded once every stage resolves or the request is superseded.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    stages: Vec<ShellSpec>,
}

impl BuildPlan {
    /// Spec for a 1-based stage index.
    pub fn stage(&self, stage: usize) -> &ShellSpec {
        &self.stages[stage - 1]
    }

    /// Spec for the final (most complete) stage.
    pub fn final_stage(&self) -> &ShellSpec {
        self.stages.last().expect("plans have at least one stage")
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}

/// Decomposes a build request into an ordered sequence of stage specs by
/// invoking the caller-supplied build function once per stage.
pub struct StagePlanner;

impl StagePlanner {
    /// Plan `num_stages` stages (clamped to >= 1) for the given request.
    ///
    /// In debug builds the build function is invoked a second time per
    /// stage and the fingerprints compared, so a build function that
    /// violates its referential-transparency contract fails loudly here
    /// instead of corrupting the cache.
    pub fn plan(build: &dyn BuildFn, num_stages: usize, args: &BuildArgs) -> BuildPlan {
        let num_stages = num_stages.max(1);
        let stages = (1..=num_stages)
            .map(|stage| {
                let spec = build.spec(stage, args);
                #[cfg(debug_assertions)]
                {
                    let again = build.spec(stage, args);
                    assert_eq!(
                        fingerprint(&spec),
                        fingerprint(&again),
                        "build function is not referentially transparent at stage {stage}: \
                         two invocations with identical arguments produced different specs"
                    );
                }
                spec
            })
            .collect();
        BuildPlan { stages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_build(stage: usize, _args: &BuildArgs) -> ShellSpec {
        let packages: Vec<String> = ["curl", "jq", "git"][..stage]
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        ShellSpec::mk_shell(packages)
    }

    #[test]
    fn plan_invokes_build_fn_per_stage() {
        let plan = StagePlanner::plan(&staged_build, 3, &BuildArgs::new());
        assert_eq!(plan.num_stages(), 3);
        assert_eq!(plan.stage(1).packages, vec!["curl"]);
        assert_eq!(plan.stage(3).packages, vec!["curl", "jq", "git"]);
        assert_eq!(plan.final_stage().packages.len(), 3);
    }

    #[test]
    fn zero_stages_degenerates_to_one() {
        let plan = StagePlanner::plan(&staged_build, 0, &BuildArgs::new());
        assert_eq!(plan.num_stages(), 1);
    }

    #[test]
    fn args_reach_the_build_fn() {
        let build = |_stage: usize, args: &BuildArgs| {
            let pkg = args
                .get("package")
                .and_then(|v| v.as_str())
                .unwrap_or("hello");
            ShellSpec::mk_shell([pkg])
        };
        let args = BuildArgs::new().set("package", "ripgrep");
        let plan = StagePlanner::plan(&build, 1, &args);
        assert_eq!(plan.stage(1).packages, vec!["ripgrep"]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not referentially transparent")]
    fn impure_build_fn_fails_loudly_in_debug() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let counter = AtomicUsize::new(0);
        let build = move |_stage: usize, _args: &BuildArgs| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            ShellSpec::mk_shell([format!("pkg-{n}")])
        };
        StagePlanner::plan(&build, 1, &BuildArgs::new());
    }
}
