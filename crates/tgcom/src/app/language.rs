//! Language registry mapping names and file extensions to comment markers.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use once_cell::sync::Lazy;

use crate::domain::errors::CommentError;
use crate::domain::model::Marker;
use crate::infra::config::Config;

struct BuiltinLanguage {
    name: &'static str,
    aliases: &'static [&'static str],
    marker: &'static str,
    extensions: &'static [&'static str],
}

#[rustfmt::skip]
const BUILTIN_LANGUAGES: &[BuiltinLanguage] = &[
    BuiltinLanguage { name: "go", aliases: &["golang"], marker: "//", extensions: &["go"] },
    BuiltinLanguage { name: "js", aliases: &["javascript"], marker: "//", extensions: &["js"] },
    BuiltinLanguage { name: "ts", aliases: &["typescript"], marker: "//", extensions: &["ts"] },
    BuiltinLanguage { name: "bash", aliases: &["sh", "shell"], marker: "#", extensions: &["sh", "bash"] },
    BuiltinLanguage { name: "c", aliases: &["c++", "cpp"], marker: "//", extensions: &["c", "h", "cc", "cpp"] },
    BuiltinLanguage { name: "java", aliases: &[], marker: "//", extensions: &["java"] },
    BuiltinLanguage { name: "python", aliases: &["py"], marker: "#", extensions: &["py"] },
    BuiltinLanguage { name: "ruby", aliases: &["rb"], marker: "#", extensions: &["rb"] },
    BuiltinLanguage { name: "perl", aliases: &[], marker: "#", extensions: &["pl"] },
    BuiltinLanguage { name: "php", aliases: &[], marker: "//", extensions: &["php"] },
    BuiltinLanguage { name: "swift", aliases: &[], marker: "//", extensions: &["swift"] },
    BuiltinLanguage { name: "kotlin", aliases: &[], marker: "//", extensions: &["kt", "kts"] },
    BuiltinLanguage { name: "r", aliases: &[], marker: "#", extensions: &["r"] },
    BuiltinLanguage { name: "haskell", aliases: &[], marker: "--", extensions: &["hs"] },
    BuiltinLanguage { name: "sql", aliases: &[], marker: "--", extensions: &["sql"] },
    BuiltinLanguage { name: "rust", aliases: &[], marker: "//", extensions: &["rs"] },
    BuiltinLanguage { name: "scala", aliases: &[], marker: "//", extensions: &["scala"] },
    BuiltinLanguage { name: "dart", aliases: &[], marker: "//", extensions: &["dart"] },
    BuiltinLanguage { name: "objective-c", aliases: &["objc"], marker: "//", extensions: &["mm"] },
    BuiltinLanguage { name: "matlab", aliases: &[], marker: "%", extensions: &["m"] },
    BuiltinLanguage { name: "lua", aliases: &[], marker: "--", extensions: &["lua"] },
    BuiltinLanguage { name: "erlang", aliases: &[], marker: "%", extensions: &["erl"] },
    BuiltinLanguage { name: "elixir", aliases: &[], marker: "#", extensions: &["ex", "exs"] },
    BuiltinLanguage { name: "vhdl", aliases: &[], marker: "--", extensions: &["vhdl", "vhd"] },
    BuiltinLanguage { name: "verilog", aliases: &[], marker: "//", extensions: &["v", "sv"] },
    BuiltinLanguage { name: "html", aliases: &[], marker: "<!-- -->", extensions: &["html", "htm"] },
];

static BUILTIN_REGISTRY: Lazy<LanguageRegistry> = Lazy::new(|| {
    let mut registry = LanguageRegistry::empty();
    for spec in BUILTIN_LANGUAGES {
        let marker = Marker::parse(spec.marker)
            .unwrap_or_else(|_| Marker::simple(spec.marker));
        registry.insert(
            spec.name,
            marker,
            spec.extensions.iter().map(|ext| ext.to_string()).collect(),
        );
        for alias in spec.aliases {
            let name = spec.name.to_string();
            registry.aliases.insert(alias.to_string(), name);
        }
    }
    registry
});

/// A language known to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub name: String,
    pub marker: Marker,
    pub extensions: Vec<String>,
}

/// Lookup table from language names and extensions to markers.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, Language>,
    aliases: HashMap<String, String>,
    extensions: HashMap<String, String>,
}

impl LanguageRegistry {
    fn empty() -> Self {
        Self::default()
    }

    /// The built-in language table.
    pub fn builtin() -> Self {
        BUILTIN_REGISTRY.clone()
    }

    /// Built-in languages extended with the `[languages]` entries from `config`.
    pub fn from_config(config: &Config) -> Result<Self, CommentError> {
        let mut registry = Self::builtin();
        for (name, custom) in &config.languages {
            let marker = Marker::parse(&custom.marker)?;
            registry.insert(name, marker, custom.extensions.clone());
        }
        Ok(registry)
    }

    /// Register or replace a language.
    ///
    /// Extensions claimed by another language move to this one. Redefining a
    /// known language with an empty extension list keeps its extensions;
    /// otherwise the new list replaces the old one.
    pub fn insert(&mut self, name: &str, marker: Marker, extensions: Vec<String>) {
        let name = name.to_ascii_lowercase();
        let mut extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        if let Some(previous) = self.languages.get(&name) {
            if extensions.is_empty() {
                extensions = previous.extensions.clone();
            } else {
                for ext in &previous.extensions {
                    if !extensions.contains(ext) {
                        self.extensions.remove(ext);
                    }
                }
            }
        }

        for ext in &extensions {
            if let Some(previous) = self.extensions.insert(ext.clone(), name.clone())
                && previous != name
                && let Some(language) = self.languages.get_mut(&previous)
            {
                language.extensions.retain(|claimed| claimed != ext);
            }
        }

        self.aliases.remove(&name);
        self.languages.insert(
            name.clone(),
            Language {
                name,
                marker,
                extensions,
            },
        );
    }

    /// Marker for a language name or alias, case-insensitive.
    pub fn by_name(&self, name: &str) -> Result<&Marker, CommentError> {
        let key = name.trim().to_ascii_lowercase();
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        self.languages
            .get(canonical)
            .map(|language| &language.marker)
            .ok_or_else(|| CommentError::UnsupportedLanguage(name.to_string()))
    }

    /// Marker for the extension of `path`, case-insensitive.
    pub fn by_path(&self, path: &Path) -> Result<&Marker, CommentError> {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return Err(CommentError::UnsupportedExtension(format!(
                "{} has no extension",
                path.display()
            )));
        };

        self.extensions
            .get(&ext.to_ascii_lowercase())
            .and_then(|name| self.languages.get(name))
            .map(|language| &language.marker)
            .ok_or_else(|| CommentError::UnsupportedExtension(format!(".{ext}")))
    }

    /// Resolve the marker for a run: an explicit language wins over the file extension.
    pub fn resolve_marker(
        &self,
        language: Option<&str>,
        path: Option<&Path>,
    ) -> Result<Marker, CommentError> {
        match (language.filter(|name| !name.trim().is_empty()), path) {
            (Some(name), _) => self.by_name(name).cloned(),
            (None, Some(path)) => self.by_path(path).cloned(),
            (None, None) => Err(CommentError::MissingLanguage),
        }
    }

    /// Registered languages in name order.
    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.languages.values()
    }
}
