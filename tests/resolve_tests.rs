//! File resolution: bundled extensions short-circuit the search.

use camino::{Utf8Path, Utf8PathBuf};
use gosh_freeze::ir::NativeExtensionSet;
use gosh_freeze::resolve::{
    ExtensionTable, FileProbe, MissPolicy, ResolveError, SearchSpec, resolve,
};
use mockall::{Sequence, mock};
use rstest::{fixture, rstest};

mock! {
    pub Probe {}
    impl FileProbe for Probe {
        fn is_file(&self, path: &Utf8Path) -> bool;
    }
}

struct Setup {
    search: Vec<Utf8PathBuf>,
    suffixes: Vec<String>,
    extensions: NativeExtensionSet,
}

impl Setup {
    fn spec(&self) -> SearchSpec<'_> {
        SearchSpec {
            search_paths: &self.search,
            suffixes: &self.suffixes,
            home: None,
        }
    }
}

#[fixture]
fn setup() -> Setup {
    Setup {
        search: vec![Utf8PathBuf::from("/site"), Utf8PathBuf::from("/lib")],
        suffixes: vec![".sci".to_owned(), ".scm".to_owned()],
        extensions: NativeExtensionSet::new(vec![Utf8PathBuf::from(
            "/usr/lib/gauche/x86_64/gauche--collection.so",
        )]),
    }
}

#[rstest]
#[case("/usr/lib/gauche/x86_64/gauche--collection.so")]
#[case("gauche--collection.so")]
#[case("x86_64/gauche--collection.so")]
fn bundled_extensions_resolve_without_touching_the_filesystem(
    setup: Setup,
    #[case] request: &str,
) {
    let mut probe = MockProbe::new();
    probe.expect_is_file().never();
    let table = ExtensionTable::from_set(&setup.extensions);
    let found = resolve(request, &setup.spec(), &table, &probe, MissPolicy::Error)
        .expect("table hit");
    assert_eq!(
        found.as_deref(),
        Some(Utf8Path::new("/usr/lib/gauche/x86_64/gauche--collection.so"))
    );
}

#[rstest]
fn search_tries_each_directory_bare_then_suffixed(setup: Setup) {
    let mut probe = MockProbe::new();
    let mut seq = Sequence::new();
    let misses = [
        "/site/srfi-1",
        "/site/srfi-1.sci",
        "/site/srfi-1.scm",
        "/lib/srfi-1",
        "/lib/srfi-1.sci",
    ];
    for candidate in misses {
        probe
            .expect_is_file()
            .withf(move |path| path == candidate)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
    }
    probe
        .expect_is_file()
        .withf(|path| path == "/lib/srfi-1.scm")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(true);
    let table = ExtensionTable::from_set(&setup.extensions);
    let found = resolve("srfi-1", &setup.spec(), &table, &probe, MissPolicy::Error)
        .expect("found under /lib");
    assert_eq!(found, Some(Utf8PathBuf::from("/lib/srfi-1.scm")));
}

#[rstest]
fn direct_paths_ignore_the_search_path(setup: Setup) {
    let mut probe = MockProbe::new();
    probe
        .expect_is_file()
        .withf(|path| path.as_str().starts_with("./"))
        .returning(|path| path == "./local.scm");
    let table = ExtensionTable::empty();
    let found = resolve("./local", &setup.spec(), &table, &probe, MissPolicy::Error)
        .expect("direct hit");
    assert_eq!(found, Some(Utf8PathBuf::from("./local.scm")));
}

#[rstest]
fn quiet_miss_returns_none(setup: Setup) {
    let mut probe = MockProbe::new();
    probe.expect_is_file().return_const(false);
    let found = resolve("absent", &setup.spec(), &ExtensionTable::empty(), &probe, MissPolicy::Quiet)
        .expect("quiet");
    assert_eq!(found, None);
}

#[rstest]
fn loud_miss_lists_search_directories(setup: Setup) {
    let mut probe = MockProbe::new();
    probe.expect_is_file().return_const(false);
    let err = resolve("absent", &setup.spec(), &ExtensionTable::empty(), &probe, MissPolicy::Error)
        .expect_err("miss");
    let ResolveError::NotFound { request, searched } = &err;
    assert_eq!(request, "absent");
    assert_eq!(searched, &setup.search);
    assert_eq!(err.to_string(), "cannot find \"absent\" in (/site /lib)");
}
