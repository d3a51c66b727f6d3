//! ---
//! zko_section: "04-configuration-orchestration"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Desired pod spec construction from settings and membership."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SpecError, TemplateError};

const CONF_DIR: &str = "conf";
const SCRIPTS_DIR: &str = "scripts";

/// Substitute `$name` / `${name}` placeholders; `$$` yields a literal `$`.
///
/// Every placeholder must resolve; nothing is left in place silently.
pub fn render(
    text: &str,
    vars: &IndexMap<String, String>,
) -> std::result::Result<String, TemplateError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        out.push_str(&text[literal_start..i]);
        let offset = i;
        match bytes.get(i + 1) {
            Some(b'$') => {
                out.push('$');
                i += 2;
            }
            Some(b'{') => {
                let name_start = i + 2;
                let Some(len) = text[name_start..].find('}') else {
                    return Err(TemplateError::Malformed {
                        offset,
                        reason: "unterminated '${'",
                    });
                };
                let name = &text[name_start..name_start + len];
                if !is_identifier(name) {
                    return Err(TemplateError::Malformed {
                        offset,
                        reason: "invalid placeholder name",
                    });
                }
                out.push_str(lookup(vars, name, offset)?);
                i = name_start + len + 1;
            }
            Some(c) if is_ident_start(*c) => {
                let name_start = i + 1;
                let mut end = name_start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                out.push_str(lookup(vars, &text[name_start..end], offset)?);
                i = end;
            }
            _ => {
                return Err(TemplateError::Malformed {
                    offset,
                    reason: "'$' must be followed by '$', '{' or a name",
                })
            }
        }
        literal_start = i;
    }
    out.push_str(&text[literal_start..]);
    Ok(out)
}

fn lookup<'a>(
    vars: &'a IndexMap<String, String>,
    name: &str,
    offset: usize,
) -> std::result::Result<&'a str, TemplateError> {
    vars.get(name)
        .map(String::as_str)
        .ok_or_else(|| TemplateError::Unresolved {
            placeholder: name.to_owned(),
            offset,
        })
}

fn is_ident_start(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

fn is_ident_char(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphanumeric()
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(c) if is_ident_start(c)) && bytes.all(is_ident_char)
}

/// A template file, identified by its file name inside the mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub name: String,
    pub body: String,
}

impl TemplateFile {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Resolved template sources for the `conf` and `scripts` mounts.
///
/// Files are kept sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    conf: Vec<TemplateFile>,
    scripts: Vec<TemplateFile>,
}

impl TemplateSet {
    pub fn new(conf: Vec<TemplateFile>, scripts: Vec<TemplateFile>) -> Self {
        let mut set = Self { conf, scripts };
        set.conf.sort_by(|a, b| a.name.cmp(&b.name));
        set.scripts.sort_by(|a, b| a.name.cmp(&b.name));
        set
    }

    /// Templates compiled into the crate.
    pub fn bundled() -> Self {
        Self::new(
            vec![
                TemplateFile::new(
                    "log4j.properties",
                    include_str!("../templates/conf/log4j.properties"),
                ),
                TemplateFile::new("zoo.cfg", include_str!("../templates/conf/zoo.cfg")),
            ],
            vec![TemplateFile::new(
                "docker-entrypoint.sh",
                include_str!("../templates/scripts/docker-entrypoint.sh"),
            )],
        )
    }

    /// Load `conf/*` and `scripts/*` from `root`. Missing subdirectories yield empty sets.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let conf = read_dir_files(&root.join(CONF_DIR))?;
        let scripts = read_dir_files(&root.join(SCRIPTS_DIR))?;
        debug!(
            root = %root.display(),
            conf = conf.len(),
            scripts = scripts.len(),
            "templates loaded"
        );
        Ok(Self::new(conf, scripts))
    }

    /// Templates rendered into the `conf` mount.
    pub fn conf(&self) -> &[TemplateFile] {
        &self.conf
    }

    /// Files copied verbatim into the `scripts` mount.
    pub fn scripts(&self) -> &[TemplateFile] {
        &self.scripts
    }
}

fn read_dir_files(dir: &Path) -> Result<Vec<TemplateFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| SpecError::TemplateIo {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let body = fs::read_to_string(path).map_err(|source| SpecError::TemplateIo {
            path: path.to_path_buf(),
            source,
        })?;
        files.push(TemplateFile::new(
            entry.file_name().to_string_lossy().into_owned(),
            body,
        ));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> IndexMap<String, String> {
        IndexMap::from([
            ("ZOO_TICK_TIME".to_owned(), "2000".to_owned()),
            ("port".to_owned(), "2181".to_owned()),
        ])
    }

    #[test]
    fn substitutes_both_placeholder_forms() {
        let out = render("tickTime=${ZOO_TICK_TIME}\nclientPort=$port\n", &vars()).unwrap();
        assert_eq!(out, "tickTime=2000\nclientPort=2181\n");
    }

    #[test]
    fn dollar_dollar_escapes() {
        let out = render("cost: $$5 ${port}$$", &vars()).unwrap();
        assert_eq!(out, "cost: $5 2181$");
    }

    #[test]
    fn bare_name_stops_at_non_identifier() {
        let out = render("$port.suffix", &vars()).unwrap();
        assert_eq!(out, "2181.suffix");
    }

    #[test]
    fn unresolved_placeholder_is_an_error() {
        let err = render("a=${ZOO_MISSING}", &vars()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Unresolved {
                placeholder: "ZOO_MISSING".into(),
                offset: 2
            }
        );
    }

    #[test]
    fn malformed_placeholders_are_errors() {
        for text in ["${port", "${a.b}", "${}", "trailing $", "$1"] {
            assert!(
                matches!(render(text, &vars()), Err(TemplateError::Malformed { .. })),
                "expected malformed for {text:?}"
            );
        }
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let text = "plain text with ünïcode";
        assert_eq!(render(text, &IndexMap::new()).unwrap(), text);
    }

    #[test]
    fn bundled_templates_are_sorted() {
        let set = TemplateSet::bundled();
        let names: Vec<_> = set.conf().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["log4j.properties", "zoo.cfg"]);
        assert_eq!(set.scripts()[0].name, "docker-entrypoint.sh");
    }

    #[test]
    fn load_reads_conf_and_scripts_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("conf")).unwrap();
        fs::write(dir.path().join("conf/b.cfg"), "b=${port}").unwrap();
        fs::write(dir.path().join("conf/a.cfg"), "a=1").unwrap();

        let set = TemplateSet::load(dir.path()).unwrap();
        let names: Vec<_> = set.conf().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.cfg", "b.cfg"]);
        assert!(set.scripts().is_empty());
    }
}
