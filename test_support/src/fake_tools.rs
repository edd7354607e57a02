//! Shell-script stand-ins for the external tools the pipeline drives.
//!
//! Every script records its arguments, one per line, in `<name>.args` inside
//! the tool directory so tests can assert on exact invocations.

use std::ffi::OsString;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use tool_env::{CC_ENV, GAUCHE_CONFIG_ENV, GOSH_ENV, LDD_ENV, STATIFIER_ENV};

/// Libraries the fake `ldd` reports as resolved, in output order.
pub const FAKE_LIBS: [&str; 2] = ["/fake/lib/libgauche-0.98.so.0", "/fake/lib/libm.so.6"];

/// Flags the fake `gauche-config` prints, in `-I`, `-L`, `-l` query order.
pub const FAKE_FLAGS: [&str; 4] = [
    "-I/fake/gauche/include",
    "-L/fake/gauche/lib",
    "-lgauche-0.98",
    "-lm",
];

/// One of the faked tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeTool {
    /// Interpreter; prints the configured trace on stderr.
    Gosh,
    /// Build-flag helper.
    GaucheConfig,
    /// C compiler; copies the `.c` input aside and writes the `-o` output.
    Cc,
    /// Link dependency lister.
    Ldd,
    /// Static-image tool; copies its input binary to its output path.
    Statifier,
}

impl FakeTool {
    /// Every fake, in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Gosh,
        Self::GaucheConfig,
        Self::Cc,
        Self::Ldd,
        Self::Statifier,
    ];

    /// Script file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Gosh => "gosh",
            Self::GaucheConfig => "gauche-config",
            Self::Cc => "cc",
            Self::Ldd => "ldd",
            Self::Statifier => "statifier",
        }
    }

    /// Environment variable that points gosh-freeze at this fake.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Gosh => GOSH_ENV,
            Self::GaucheConfig => GAUCHE_CONFIG_ENV,
            Self::Cc => CC_ENV,
            Self::Ldd => LDD_ENV,
            Self::Statifier => STATIFIER_ENV,
        }
    }
}

/// A temporary directory holding one fake of every tool.
#[derive(Debug)]
pub struct FakeTools {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl FakeTools {
    /// Create fakes that all succeed; `gosh` prints `trace` on stderr.
    ///
    /// # Panics
    ///
    /// Panics if the scripts cannot be written.
    #[must_use]
    pub fn new(trace: &str) -> Self {
        let dir = TempDir::new().expect("fake tool dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        fs::write(root.join("trace.txt"), trace).expect("write trace");
        let tools = Self { _dir: dir, root };
        for tool in FakeTool::ALL {
            tools.install(tool, 0);
        }
        tools
    }

    /// Make `tool` exit with `code` after recording its arguments.
    ///
    /// # Panics
    ///
    /// Panics if the script cannot be rewritten.
    #[must_use]
    pub fn failing(self, tool: FakeTool, code: i32) -> Self {
        self.install(tool, code);
        self
    }

    /// Directory holding the scripts.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of the fake for `tool`.
    #[must_use]
    pub fn path(&self, tool: FakeTool) -> Utf8PathBuf {
        self.root.join(tool.file_name())
    }

    /// `(variable, value)` pairs selecting every fake.
    #[must_use]
    pub fn env_pairs(&self) -> Vec<(&'static str, Utf8PathBuf)> {
        FakeTool::ALL
            .iter()
            .map(|tool| (tool.env_var(), self.path(*tool)))
            .collect()
    }

    /// Environment lookup that resolves to the fakes, for in-process runs.
    #[must_use]
    pub fn read_env(&self) -> impl FnMut(&str) -> Option<OsString> + '_ {
        move |key| {
            FakeTool::ALL
                .iter()
                .find(|tool| tool.env_var() == key)
                .map(|tool| OsString::from(self.path(*tool).into_string()))
        }
    }

    /// Arguments `tool` received on its most recent run, or `None` if it
    /// never ran.
    #[must_use]
    pub fn recorded_args(&self, tool: FakeTool) -> Option<Vec<String>> {
        let path = self.root.join(format!("{}.args", tool.file_name()));
        fs::read_to_string(path)
            .ok()
            .map(|text| text.lines().map(str::to_owned).collect())
    }

    /// The C program the fake compiler was given, if it ran.
    #[must_use]
    pub fn captured_program(&self) -> Option<String> {
        fs::read_to_string(self.root.join("captured.c")).ok()
    }

    fn install(&self, tool: FakeTool, code: i32) {
        let record = format!(
            ": > '{root}/{name}.args'\nfor arg in \"$@\"; do printf '%s\\n' \"$arg\" >> '{root}/{name}.args'; done\n",
            root = self.root,
            name = tool.file_name(),
        );
        let body = match tool {
            FakeTool::Gosh => format!("cat '{}/trace.txt' >&2\nexit {code}\n", self.root),
            FakeTool::GaucheConfig => format!(
                concat!(
                    "[ {code} -ne 0 ] && exit {code}\n",
                    "case \"$1\" in\n",
                    "  -I) echo '{i}' ;;\n",
                    "  -L) echo '{l}' ;;\n",
                    "  -l) echo '{lib1} {lib2}' ;;\n",
                    "  *) exit 2 ;;\n",
                    "esac\n",
                ),
                code = code,
                i = FAKE_FLAGS[0],
                l = FAKE_FLAGS[1],
                lib1 = FAKE_FLAGS[2],
                lib2 = FAKE_FLAGS[3],
            ),
            FakeTool::Cc => format!(
                concat!(
                    "out=''\nsrc=''\nprev=''\n",
                    "for arg in \"$@\"; do\n",
                    "  [ \"$prev\" = '-o' ] && out=\"$arg\"\n",
                    "  case \"$arg\" in *.c) src=\"$arg\" ;; esac\n",
                    "  prev=\"$arg\"\n",
                    "done\n",
                    "[ -n \"$src\" ] && cp \"$src\" '{root}/captured.c'\n",
                    "[ {code} -ne 0 ] && exit {code}\n",
                    "printf 'fake binary\\n' > \"$out\"\n",
                    "chmod 755 \"$out\"\n",
                ),
                root = self.root,
                code = code,
            ),
            FakeTool::Ldd => format!(
                concat!(
                    "[ {code} -ne 0 ] && exit {code}\n",
                    "printf '\\tlinux-vdso.so.1 (0x00007ffd)\\n'\n",
                    "printf '\\tlibgauche-0.98.so.0 => {lib1} (0x00007f01)\\n'\n",
                    "printf '\\tlibm.so.6 => {lib2} (0x00007f02)\\n'\n",
                    "printf '\\t/lib64/ld-linux-x86-64.so.2 (0x00007f03)\\n'\n",
                ),
                code = code,
                lib1 = FAKE_LIBS[0],
                lib2 = FAKE_LIBS[1],
            ),
            FakeTool::Statifier => format!(
                concat!(
                    "[ {code} -ne 0 ] && exit {code}\n",
                    "cp \"$3\" \"$4\"\n",
                    "chmod 755 \"$4\"\n",
                ),
                code = code,
            ),
        };
        let path = self.path(tool);
        fs::write(&path, format!("#!/bin/sh\n{record}{body}")).expect("write fake tool");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path).expect("meta").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("perms");
        }
    }
}
