use std::collections::HashMap;

/// Driver exit codes. The driver loop itself lives outside the core; the
/// core only classifies outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    Error = 1,
    CmdErr = 2,
    SysErr = 3,
    Abnormal = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Language levels the core can be asked to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceVersion {
    Jdk6,
    Jdk7,
    Jdk8,
    Jdk9,
    Jdk11,
    Jdk17,
    Jdk21,
}

/// Feature gates the core queries. Each maps to the release that
/// introduced it; everything newer is allowed transitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Generics,
    Diamond,
    Lambda,
    MethodReferences,
    /// Post-8 target-typed inference; its absence selects the capture
    /// fallback in the inference context.
    GraphInference,
    Modules,
}

impl SourceVersion {
    pub const DEFAULT: SourceVersion = SourceVersion::Jdk21;

    pub fn from_name(name: &str) -> Option<SourceVersion> {
        match name {
            "6" | "1.6" => Some(SourceVersion::Jdk6),
            "7" | "1.7" => Some(SourceVersion::Jdk7),
            "8" | "1.8" => Some(SourceVersion::Jdk8),
            "9" => Some(SourceVersion::Jdk9),
            "11" => Some(SourceVersion::Jdk11),
            "17" => Some(SourceVersion::Jdk17),
            "21" => Some(SourceVersion::Jdk21),
            _ => None,
        }
    }

    /// The single capability predicate the rest of the core goes through.
    pub fn allows(self, feature: Feature) -> bool {
        let introduced = match feature {
            Feature::Generics => SourceVersion::Jdk6,
            Feature::Diamond => SourceVersion::Jdk7,
            Feature::Lambda | Feature::MethodReferences | Feature::GraphInference => {
                SourceVersion::Jdk8
            }
            Feature::Modules => SourceVersion::Jdk9,
        };
        self >= introduced
    }
}

/// Insertion-ordered option map. The external driver parses the command
/// line and pokes results in here; the core only reads. `-XD` raw options
/// land in the same map with their prefix stripped.
#[derive(Default)]
pub struct Options {
    keys: Vec<String>,
    map: HashMap<String, Option<String>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: Option<&str>) {
        if !self.map.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.map.insert(key.to_string(), value.map(str::to_string));
    }

    /// Stores a raw `-XD<key>[=<val>]` poke.
    pub fn put_raw(&mut self, arg: &str) {
        let body = arg.strip_prefix("-XD").unwrap_or(arg);
        match body.split_once('=') {
            Some((k, v)) => self.put(k, Some(v)),
            None => self.put(body, None),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(|v| v.as_deref())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn source_version(&self) -> SourceVersion {
        self.get("--source")
            .or_else(|| self.get("-source"))
            .and_then(SourceVersion::from_name)
            .unwrap_or(SourceVersion::DEFAULT)
    }
}
