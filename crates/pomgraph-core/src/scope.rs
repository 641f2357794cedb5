//! Maven dependency scopes, scope transitivity, and resolution classpaths.

use std::fmt;
use std::str::FromStr;

/// Maven-compatible dependency scope as declared on a `<dependency>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Provided,
    System,
    Test,
    Import,
}

impl Scope {
    /// Parse a `<scope>` value. A missing or empty scope means `compile`.
    pub fn from_name(name: Option<&str>) -> Option<Self> {
        match name.map(str::trim).unwrap_or("") {
            "" | "compile" => Some(Self::Compile),
            "runtime" => Some(Self::Runtime),
            "provided" => Some(Self::Provided),
            "system" => Some(Self::System),
            "test" => Some(Self::Test),
            "import" => Some(Self::Import),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Provided => "provided",
            Self::System => "system",
            Self::Test => "test",
            Self::Import => "import",
        }
    }

    /// Scope at which a dependency declared with `declared` is seen by a
    /// consumer that reaches its declaring artifact at scope `self`.
    ///
    /// Returns `None` when the dependency is not transitive at all:
    /// `test`, `provided`, `system` and `import` dependencies of a
    /// dependency are never inherited, and nothing is inherited through a
    /// `test` or `system` edge.
    pub fn transitive(self, declared: Scope) -> Option<Scope> {
        match (self, declared) {
            (Self::Compile, Self::Compile) => Some(Self::Compile),
            (Self::Compile, Self::Runtime) => Some(Self::Runtime),
            (Self::Runtime, Self::Compile | Self::Runtime) => Some(Self::Runtime),
            (Self::Provided, Self::Compile | Self::Runtime) => Some(Self::Provided),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classpath buckets a dependency graph is resolved for.
///
/// Each bucket is resolved independently, so conflict resolution guarantees
/// one entry per dependency key within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classpath {
    Compile,
    Runtime,
    Provided,
    TestCompile,
    TestRuntime,
}

impl Classpath {
    pub const ALL: [Classpath; 5] = [
        Classpath::Compile,
        Classpath::Runtime,
        Classpath::Provided,
        Classpath::TestCompile,
        Classpath::TestRuntime,
    ];

    /// Whether a dependency at effective scope `scope` belongs on this classpath.
    pub fn includes(&self, scope: Scope) -> bool {
        match self {
            Self::Compile => matches!(scope, Scope::Compile | Scope::Provided | Scope::System),
            Self::Runtime => matches!(scope, Scope::Compile | Scope::Runtime),
            Self::Provided => matches!(scope, Scope::Provided | Scope::System),
            Self::TestCompile => matches!(
                scope,
                Scope::Compile | Scope::Provided | Scope::System | Scope::Test
            ),
            Self::TestRuntime => matches!(
                scope,
                Scope::Compile | Scope::Runtime | Scope::Provided | Scope::System | Scope::Test
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Provided => "provided",
            Self::TestCompile => "test-compile",
            Self::TestRuntime => "test-runtime",
        }
    }
}

impl FromStr for Classpath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compile" => Ok(Self::Compile),
            "runtime" => Ok(Self::Runtime),
            "provided" => Ok(Self::Provided),
            "test-compile" | "test" => Ok(Self::TestCompile),
            "test-runtime" => Ok(Self::TestRuntime),
            other => Err(format!(
                "unknown scope '{other}' (expected compile, runtime, provided, test-compile or test-runtime)"
            )),
        }
    }
}

impl fmt::Display for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
