//! Finding the IPECMD executable on disk.
use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    constants::{EXECUTABLE_NAME, INSTALL_ROOTS, IPE_SUBDIR},
    error::{Error, Result},
    tool::IpeVersion,
};

/// Where a resolved executable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOrigin {
    Explicit,
    Version(IpeVersion),
}

impl ToolOrigin {
    pub fn version(&self) -> Option<IpeVersion> {
        match self {
            ToolOrigin::Explicit => None,
            ToolOrigin::Version(v) => Some(*v),
        }
    }
}

impl fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOrigin::Explicit => write!(f, "explicit path"),
            ToolOrigin::Version(v) => write!(f, "v{}", v),
        }
    }
}

/// An IPECMD executable that existed when it was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToolPath {
    pub path: PathBuf,
    pub origin: ToolOrigin,
}

/// Maps versions to install locations under a set of MPLAB X roots.
#[derive(Debug, Clone)]
pub struct Locator {
    roots: Vec<PathBuf>,
}

impl Default for Locator {
    fn default() -> Self {
        Locator {
            roots: INSTALL_ROOTS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl Locator {
    /// A locator searching custom roots instead of the platform defaults.
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Locator {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Expected executable location for a version under the primary root.
    pub fn version_path(&self, version: IpeVersion) -> Option<PathBuf> {
        self.roots
            .first()
            .map(|root| executable_under(root, version))
    }

    /// Executable locations for a version, one per root, in search order.
    pub fn candidates(&self, version: IpeVersion) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| executable_under(root, version))
            .collect()
    }

    /// First existing executable for a version.
    pub fn find(&self, version: IpeVersion) -> Option<PathBuf> {
        self.candidates(version).into_iter().find(|path| path.is_file())
    }

    /// Resolve the executable. An explicit path is authoritative: when it
    /// doesn't exist there is no fallback to `version`.
    pub fn resolve(
        &self,
        explicit: Option<&Path>,
        version: Option<IpeVersion>,
    ) -> Result<ResolvedToolPath> {
        if let Some(path) = explicit {
            log::debug!("Checking explicit IPECMD path {}", path.display());
            return if path.is_file() {
                Ok(ResolvedToolPath {
                    path: path.to_path_buf(),
                    origin: ToolOrigin::Explicit,
                })
            } else {
                Err(Error::ToolNotFound {
                    searched: vec![path.to_path_buf()],
                })
            };
        }

        let Some(version) = version else {
            return Err(Error::ToolNotFound { searched: vec![] });
        };
        let searched = self.candidates(version);
        for path in &searched {
            log::debug!("Checking IPECMD v{} at {}", version, path.display());
            if path.is_file() {
                return Ok(ResolvedToolPath {
                    path: path.clone(),
                    origin: ToolOrigin::Version(version),
                });
            }
        }
        Err(Error::ToolNotFound { searched })
    }

    /// Known versions with an executable under any root, oldest first.
    pub fn installed_versions(&self) -> Vec<IpeVersion> {
        let mut found = vec![];
        for root in &self.roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(err) => {
                    log::trace!("Skipping {}: {}", root.display(), err);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                let Some(raw) = name.strip_prefix('v') else {
                    continue;
                };
                let Ok(version) = raw.parse::<IpeVersion>() else {
                    log::trace!("Ignoring unknown install {}", name);
                    continue;
                };
                if executable_under(root, version).is_file() && !found.contains(&version) {
                    log::debug!("Found MPLAB X v{} under {}", version, root.display());
                    found.push(version);
                }
            }
        }
        found.sort();
        found
    }

    /// Latest installed version, if any.
    pub fn detect_latest(&self) -> Option<IpeVersion> {
        self.installed_versions().pop()
    }
}

fn executable_under(root: &Path, version: IpeVersion) -> PathBuf {
    let mut path = root.join(version.dir_name());
    for dir in IPE_SUBDIR {
        path.push(dir);
    }
    path.push(EXECUTABLE_NAME);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn install(root: &Path, version: &str) -> PathBuf {
        let dir = root
            .join(format!("v{}", version))
            .join("mplab_platform")
            .join("mplab_ipe");
        fs::create_dir_all(&dir).unwrap();
        let exe = dir.join(EXECUTABLE_NAME);
        fs::write(&exe, b"").unwrap();
        exe
    }

    #[test]
    fn version_path_template() {
        let locator = Locator::with_roots(["/opt/microchip/mplabx"]);
        let path = locator.version_path(IpeVersion::V6_20).unwrap();
        let expected = Path::new("/opt/microchip/mplabx/v6.20/mplab_platform/mplab_ipe")
            .join(EXECUTABLE_NAME);
        assert_eq!(path, expected);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn default_root_on_linux() {
        let locator = Locator::default();
        assert_eq!(
            locator.version_path(IpeVersion::V6_20).unwrap(),
            PathBuf::from("/opt/microchip/mplabx/v6.20/mplab_platform/mplab_ipe/ipecmd")
        );
    }

    #[test]
    fn explicit_path_wins_over_version() {
        let dir = tempfile::tempdir().unwrap();
        let installed = install(dir.path(), "6.20");
        let custom = dir.path().join("custom-ipecmd");
        fs::write(&custom, b"").unwrap();

        let locator = Locator::with_roots([dir.path()]);
        let resolved = locator
            .resolve(Some(&custom), Some(IpeVersion::V6_20))
            .unwrap();
        assert_eq!(resolved.path, custom);
        assert_eq!(resolved.origin, ToolOrigin::Explicit);

        let resolved = locator.resolve(None, Some(IpeVersion::V6_20)).unwrap();
        assert_eq!(resolved.path, installed);
        assert_eq!(resolved.origin, ToolOrigin::Version(IpeVersion::V6_20));
    }

    #[test]
    fn missing_explicit_path_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "6.20");
        let missing = dir.path().join("nope").join("ipecmd");

        let locator = Locator::with_roots([dir.path()]);
        match locator.resolve(Some(&missing), Some(IpeVersion::V6_20)) {
            Err(Error::ToolNotFound { searched }) => assert_eq!(searched, vec![missing]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_version_install_names_computed_path() {
        let dir = tempfile::tempdir().unwrap();
        let locator = Locator::with_roots([dir.path()]);
        match locator.resolve(None, Some(IpeVersion::V6_05)) {
            Err(Error::ToolNotFound { searched }) => {
                assert_eq!(searched, vec![locator.version_path(IpeVersion::V6_05).unwrap()])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn version_found_under_later_root() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let installed = install(second.path(), "6.20");

        let locator = Locator::with_roots([first.path(), second.path()]);
        assert_eq!(locator.detect_latest(), Some(IpeVersion::V6_20));
        assert_eq!(locator.find(IpeVersion::V6_20), Some(installed.clone()));
        let resolved = locator.resolve(None, Some(IpeVersion::V6_20)).unwrap();
        assert_eq!(resolved.path, installed);
        assert_eq!(resolved.origin, ToolOrigin::Version(IpeVersion::V6_20));
    }

    #[test]
    fn missing_version_lists_every_root() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let locator = Locator::with_roots([first.path(), second.path()]);
        match locator.resolve(None, Some(IpeVersion::V6_25)) {
            Err(Error::ToolNotFound { searched }) => {
                assert_eq!(searched.len(), 2);
                assert!(searched[0].starts_with(first.path()));
                assert!(searched[1].starts_with(second.path()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nothing_given_is_not_found() {
        let locator = Locator::default();
        assert!(matches!(
            locator.resolve(None, None),
            Err(Error::ToolNotFound { searched }) if searched.is_empty()
        ));
    }

    #[test]
    fn detect_latest_install() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        install(first.path(), "6.15");
        install(second.path(), "6.20");
        install(second.path(), "9.99");
        // directory without the executable
        fs::create_dir_all(second.path().join("v6.25")).unwrap();

        let locator = Locator::with_roots([first.path(), second.path()]);
        assert_eq!(
            locator.installed_versions(),
            vec![IpeVersion::V6_15, IpeVersion::V6_20]
        );
        assert_eq!(locator.detect_latest(), Some(IpeVersion::V6_20));
    }

    #[test]
    fn detect_without_installs() {
        let dir = tempfile::tempdir().unwrap();
        let locator = Locator::with_roots([dir.path().join("missing")]);
        assert_eq!(locator.detect_latest(), None);
    }
}
