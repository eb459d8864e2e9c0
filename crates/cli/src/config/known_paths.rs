use std::path::{Path, PathBuf};

use directories::ProjectDirs;

#[derive(Debug)]
pub struct KnownDirs {
    /// The current working directory we launched from.
    cwd: Option<Box<Path>>,

    project_dirs: Option<ProjectDirs>,
}

pub trait OptionalPathExt {
    fn join<P>(&self, path: P) -> Option<Box<Path>>
    where
        P: AsRef<Path>;
}

impl<S: AsRef<Path>> OptionalPathExt for Option<S> {
    fn join<P>(&self, path: P) -> Option<Box<Path>>
    where
        P: AsRef<Path>,
    {
        self.as_ref()
            .map(|parent| parent.as_ref().join(path).into_boxed_path())
    }
}

const PROJECT_QUALIFIER: &str = "";
const PROJECT_ORG: &str = "lineage";
const PROJECT_NAME: &str = "lineage";

impl Default for KnownDirs {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir()
                .map(PathBuf::into_boxed_path)
                .ok(),
            project_dirs: ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORG, PROJECT_NAME),
        }
    }
}

impl KnownDirs {
    /// Directories searched for `lineage.toml`, lowest precedence first.
    pub fn config_dirs(&self) -> impl Iterator<Item = Box<Path>> + '_ {
        self.project_dirs
            .as_ref()
            .map(|dirs| Box::from(dirs.config_dir()))
            .into_iter()
            .chain(self.cwd.clone())
    }

    pub fn data_dir(&self) -> Option<Box<Path>> {
        self.project_dirs
            .as_ref()
            .map(|dirs| Box::from(dirs.data_local_dir()))
    }

    pub fn profile_dir(&self) -> Option<Box<Path>> {
        self.data_dir().join("profiles")
    }
}
