//! Image vector: the table of container images an extension deploys
//!
//! Loaded once at startup from `images.yaml` and shared read-only. Entries
//! may restrict themselves to a range of target Kubernetes versions with a
//! comma-separated constraint such as `>= 1.12, < 1.14`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// One image entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    /// Logical image name (e.g. `etcd-backup-restore`)
    pub name: String,

    /// Repository of the image sources, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_repository: Option<String>,

    /// Image repository
    pub repository: String,

    /// Image tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Kubernetes versions of the cluster the image runs in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    /// Kubernetes versions of the cluster the image acts on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
}

/// A resolved image reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Logical image name
    pub name: String,
    /// Image repository
    pub repository: String,
    /// Image tag
    pub tag: Option<String>,
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => f.write_str(&self.repository),
        }
    }
}

#[derive(Deserialize)]
struct ImageVectorFile {
    images: Vec<ImageSource>,
}

/// Ordered list of image entries
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageVector(Vec<ImageSource>);

impl ImageVector {
    /// Build an image vector from entries
    pub fn new(images: Vec<ImageSource>) -> Self {
        Self(images)
    }

    /// Parse the `images.yaml` layout (`images: [...]`)
    pub fn from_yaml(data: &str) -> Result<Self> {
        let file: ImageVectorFile = serde_yaml::from_str(data)
            .map_err(|e| Error::decode("images", "image vector", e))?;
        Ok(Self(file.images))
    }

    /// Entries in declaration order
    pub fn images(&self) -> &[ImageSource] {
        &self.0
    }

    /// Resolve `name` for a cluster running `target_version`
    ///
    /// An entry whose target constraint matches wins over an unconstrained
    /// entry; among equals the first declared wins. With no target version
    /// only unconstrained entries are considered. Entries with a malformed
    /// constraint are skipped; their error is reported only when nothing else
    /// resolves.
    pub fn find_image(&self, name: &str, target_version: Option<&str>) -> Result<Image> {
        let target = target_version
            .filter(|v| !v.is_empty())
            .map(Version::parse)
            .transpose()?;

        let mut fallback = None;
        let mut invalid = None;
        for source in self.0.iter().filter(|s| s.name == name) {
            match (&source.target_version, &target) {
                (None, _) => {
                    fallback.get_or_insert(source);
                }
                (Some(constraint), Some(version)) => match Constraint::parse(constraint) {
                    Ok(c) if c.matches(version) => return Ok(source.to_image()),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            image = %name,
                            constraint = %constraint,
                            error = %e,
                            "Skipping image entry with invalid target version"
                        );
                        invalid.get_or_insert(e);
                    }
                },
                (Some(_), None) => {}
            }
        }

        if let Some(source) = fallback {
            return Ok(source.to_image());
        }
        if let Some(e) = invalid {
            return Err(e);
        }
        Err(Error::image(
            name,
            match target_version {
                Some(v) if !v.is_empty() => format!("no image matches target version {v}"),
                _ => "no image with that name".to_string(),
            },
        ))
    }
}

impl ImageSource {
    fn to_image(&self) -> Image {
        Image {
            name: self.name.clone(),
            repository: self.repository.clone(),
            tag: self.tag.clone(),
        }
    }
}

// =============================================================================
// Version constraints
// =============================================================================

/// `major.minor.patch`; pre-release and build suffixes are ignored
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Version(u64, u64, u64);

impl Version {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_partial(input).map(|(v, _)| v)
    }

    /// Parse a possibly shortened version, also returning how many
    /// components were given
    fn parse_partial(input: &str) -> Result<(Self, usize)> {
        let trimmed = input.trim().trim_start_matches('v');
        let core = trimmed
            .split(['-', '+'])
            .next()
            .unwrap_or_default();
        let mut parts = [0u64; 3];
        let mut given = 0;
        for (i, part) in core.split('.').enumerate() {
            if i >= parts.len() {
                return Err(Error::validation(format!("invalid version '{input}'")));
            }
            parts[i] = part
                .parse()
                .map_err(|_| Error::validation(format!("invalid version '{input}'")))?;
            given = i + 1;
        }
        Ok((Self(parts[0], parts[1], parts[2]), given))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Tilde,
    Caret,
}

/// Comparator with the number of version components written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
    given: usize,
}

/// Conjunction of comparators, e.g. `>= 1.12, < 1.14`
#[derive(Clone, Debug, PartialEq, Eq)]
struct Constraint(Vec<Comparator>);

impl Constraint {
    fn parse(input: &str) -> Result<Self> {
        let mut comparators = Vec::new();
        for raw in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (op, rest) = [
                (">=", Op::Ge),
                ("<=", Op::Le),
                ("!=", Op::Ne),
                ("==", Op::Eq),
                (">", Op::Gt),
                ("<", Op::Lt),
                ("=", Op::Eq),
                ("~", Op::Tilde),
                ("^", Op::Caret),
            ]
            .iter()
            .find_map(|(prefix, op)| raw.strip_prefix(prefix).map(|rest| (*op, rest)))
            .unwrap_or((Op::Eq, raw));
            let (version, given) = Version::parse_partial(rest)?;
            comparators.push(Comparator { op, version, given });
        }
        if comparators.is_empty() {
            return Err(Error::validation(format!("empty version constraint '{input}'")));
        }
        Ok(Self(comparators))
    }

    fn matches(&self, v: &Version) -> bool {
        self.0.iter().all(|&Comparator { op, version: c, given }| {
            let ord = v.cmp(&c);
            match op {
                Op::Eq => ord == Ordering::Equal,
                Op::Ne => ord != Ordering::Equal,
                Op::Gt => ord == Ordering::Greater,
                Op::Ge => ord != Ordering::Less,
                Op::Lt => ord == Ordering::Less,
                Op::Le => ord != Ordering::Greater,
                // `~1` allows any 1.x; `~1.2` and `~1.2.3` allow patch changes
                Op::Tilde if given <= 1 => ord != Ordering::Less && *v < Version(c.0 + 1, 0, 0),
                Op::Tilde => ord != Ordering::Less && *v < Version(c.0, c.1 + 1, 0),
                Op::Caret => ord != Ordering::Less && *v < Version(c.0 + 1, 0, 0),
            }
        })
    }
}
