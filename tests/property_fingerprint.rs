use nixforge::domain::models::ShellSpec;
use nixforge::services::fingerprint::fingerprint;
use proptest::collection::vec;
use proptest::prelude::*;

proptest! {
    /// Property: package sets are order-independent
    ///
    /// Two specs over the same packages in any order must fingerprint
    /// identically, so request shuffling never causes a cache miss.
    #[test]
    fn prop_package_order_is_canonicalized(
        mut packages in vec("[a-z][a-z0-9-]{0,12}", 1..8)
    ) {
        let forward = fingerprint(&ShellSpec::mk_shell(packages.clone()));
        packages.reverse();
        let reversed = fingerprint(&ShellSpec::mk_shell(packages));
        prop_assert_eq!(forward.digest(), reversed.digest());
    }

    /// Property: library-path order is semantically significant
    ///
    /// Reordering library paths changes linker resolution, so it must
    /// change the fingerprint.
    #[test]
    fn prop_library_path_order_is_significant(
        paths in vec("[a-z]{1,8}", 2..6)
    ) {
        prop_assume!(paths.first() != paths.last());
        let forward = fingerprint(&ShellSpec::mk_shell(["hello"]).with_library_paths(paths.clone()));
        let mut reordered = paths;
        reordered.reverse();
        let backward = fingerprint(&ShellSpec::mk_shell(["hello"]).with_library_paths(reordered));
        prop_assert_ne!(forward.digest(), backward.digest());
    }

    /// Property: purity participates in identity
    ///
    /// An impure spec never aliases its pure counterpart, and its
    /// fingerprint is flagged uncacheable.
    #[test]
    fn prop_purity_diverges(
        packages in vec("[a-z][a-z0-9-]{0,12}", 1..8)
    ) {
        let pure = fingerprint(&ShellSpec::mk_shell(packages.clone()));
        let impure = fingerprint(&ShellSpec::mk_shell(packages).impure());
        prop_assert_ne!(pure.digest(), impure.digest());
        prop_assert!(pure.is_cacheable());
        prop_assert!(!impure.is_cacheable());
    }

    /// Property: fingerprints are deterministic, hex-encoded SHA-256
    #[test]
    fn prop_fingerprint_is_deterministic(
        packages in vec("[a-z][a-z0-9-]{0,12}", 0..8),
        hook in proptest::option::of(".{0,40}")
    ) {
        let mut spec = ShellSpec::mk_shell(packages);
        if let Some(hook) = hook {
            spec = spec.with_shell_hook(hook);
        }
        let first = fingerprint(&spec);
        let second = fingerprint(&spec);
        prop_assert_eq!(first.digest(), second.digest());
        prop_assert_eq!(first.digest().len(), 64);
        prop_assert!(first.digest().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
